// Push monitor endpoints (`/ws/Monitor`).
//
// A monitor tells the device cloud to PUT matching events to an HTTP
// endpoint. The cloud deactivates a monitor after repeated delivery
// failures; "kicking" re-submits its credentials, which re-activates it.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::DeviceCloudClient;
use crate::error::Error;

/// The event stream a monitor subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorTopic {
    /// Data points uploaded by one device.
    DataPoint { device_id: String },
    /// Connection and inventory changes for every device on the account.
    DeviceCore,
}

impl MonitorTopic {
    /// The `monTopic` value the cloud expects.
    pub fn as_topic(&self) -> String {
        match self {
            Self::DataPoint { device_id } => format!("DataPoint/{device_id}"),
            Self::DeviceCore => "DeviceCore".into(),
        }
    }
}

/// One monitor as listed by the cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    #[serde(rename = "monId", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "monTopic", default)]
    pub topic: String,
    #[serde(rename = "monTransportUrl", default)]
    pub transport_url: Option<String>,
    #[serde(rename = "monStatus", default)]
    pub status: Option<String>,
    #[serde(rename = "monDescription", default)]
    pub description: Option<String>,
}

/// The `{resultSize, items}` listing envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorList {
    #[serde(rename = "resultSize", deserialize_with = "string_or_number")]
    pub result_size: String,
    #[serde(default)]
    pub items: Vec<Monitor>,
}

impl MonitorList {
    pub fn is_empty(&self) -> bool {
        self.result_size == "0" || self.items.is_empty()
    }
}

/// Everything needed to create a new HTTP push monitor.
#[derive(Debug, Clone)]
pub struct MonitorSpec {
    pub topic: MonitorTopic,
    pub endpoint: String,
    /// Basic-auth user the cloud presents when pushing to `endpoint`.
    pub push_username: String,
    pub push_password: SecretString,
    pub description: String,
}

impl DeviceCloudClient {
    /// List monitors for `topic` that push to `endpoint`.
    pub async fn list_monitors(
        &self,
        topic: &MonitorTopic,
        endpoint: &str,
    ) -> Result<MonitorList, Error> {
        let mut url = self.ws_url("Monitor")?;
        let condition = format!(
            "monTopic='{}' and monTransportUrl='{}'",
            topic.as_topic(),
            endpoint
        );
        url.query_pairs_mut().append_pair("condition", &condition);
        debug!("GET {url}");

        let reply = self.send(self.http_get(url)).await?;
        serde_json::from_value(reply.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: reply.to_string(),
        })
    }

    /// Create a new HTTP push monitor.
    pub async fn create_monitor(&self, spec: &MonitorSpec) -> Result<Value, Error> {
        let url = self.ws_url("Monitor")?;
        debug!(topic = %spec.topic.as_topic(), "POST {url}");

        let body = json!({
            "Monitor": {
                "monTopic": spec.topic.as_topic(),
                "monTransportType": "http",
                "monTransportUrl": spec.endpoint,
                "monTransportToken": transport_token(&spec.push_username, &spec.push_password),
                "monTransportMethod": "PUT",
                "monFormatType": "json",
                "monBatchSize": "1",
                "monBatchDuration": "0",
                "monCompression": "none",
                "monDescription": spec.description,
            }
        });
        self.send(self.http_post(url).json(&body)).await
    }

    /// Re-submit push credentials for an existing monitor, re-activating it.
    pub async fn kick_monitor(
        &self,
        monitor_id: &str,
        push_username: &str,
        push_password: &SecretString,
    ) -> Result<Value, Error> {
        let url = self.ws_url(&format!("Monitor/{monitor_id}"))?;
        debug!("PUT {url}");

        let body = json!({
            "Monitor": {
                "monTransportToken": transport_token(push_username, push_password),
            }
        });
        self.send(self.http_put(url).json(&body)).await
    }
}

fn transport_token(username: &str, password: &SecretString) -> String {
    format!("{username}:{}", password.expose_secret())
}

/// The cloud is inconsistent about quoting numeric fields.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn topic_strings() {
        let topic = MonitorTopic::DataPoint {
            device_id: "00000000-00000000-00409DFF-FF000001".into(),
        };
        assert_eq!(topic.as_topic(), "DataPoint/00000000-00000000-00409DFF-FF000001");
        assert_eq!(MonitorTopic::DeviceCore.as_topic(), "DeviceCore");
    }

    #[test]
    fn monitor_list_accepts_numeric_ids() {
        let list: MonitorList = serde_json::from_value(json!({
            "resultSize": 1,
            "items": [{"monId": 148214, "monTopic": "DeviceCore"}]
        }))
        .unwrap();
        assert!(!list.is_empty());
        assert_eq!(list.items[0].id, "148214");
    }

    #[test]
    fn empty_listing() {
        let list: MonitorList = serde_json::from_value(json!({"resultSize": "0"})).unwrap();
        assert!(list.is_empty());
    }
}
