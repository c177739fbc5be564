// ── Push monitor provisioning ──
//
// Make sure exactly one monitor pushes `topic` events to our endpoint:
// create it when missing, otherwise kick the existing one so the cloud
// re-activates it after earlier delivery failures.

use kitsync_api::{Monitor, MonitorList, MonitorSpec, MonitorTopic};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::client::MonitorClient;
use crate::config::MonitorCredentials;
use crate::error::CoreError;

/// Description attached to monitors we create.
pub const MONITOR_DESCRIPTION: &str = "kitsync push monitor";

/// What [`ensure_monitor`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MonitorOutcome {
    /// No monitor existed; the cloud's reply to the create request.
    Created { reply: Value },
    /// An existing monitor was re-activated.
    Kicked { monitor: Monitor, listing: MonitorList },
}

/// Hosts the device cloud refuses to push to.
fn is_local_endpoint(endpoint: &str) -> bool {
    endpoint.contains("localhost") || endpoint.contains("127.0.0.1")
}

/// Create or re-activate the monitor for `topic` pushing to `endpoint`.
///
/// Rejects endpoints the cloud can't reach before making any request.
pub async fn ensure_monitor<C: MonitorClient + ?Sized>(
    client: &C,
    topic: MonitorTopic,
    endpoint: &str,
    credentials: &MonitorCredentials,
) -> Result<MonitorOutcome, CoreError> {
    Url::parse(endpoint).map_err(|e| CoreError::Config {
        message: format!("invalid monitor endpoint '{endpoint}': {e}"),
    })?;
    if is_local_endpoint(endpoint) {
        warn!(endpoint, "rejecting monitor pointing at a local address");
        return Err(CoreError::Config {
            message: format!("the device cloud cannot push to a local address ({endpoint})"),
        });
    }

    let listing = client.list_monitors(&topic, endpoint).await?;

    let Some(existing) = listing.items.first().filter(|_| !listing.is_empty()).cloned() else {
        info!(topic = %topic.as_topic(), "creating push monitor");
        let spec = MonitorSpec {
            topic,
            endpoint: endpoint.to_owned(),
            push_username: credentials.username.clone(),
            push_password: credentials.password.clone(),
            description: MONITOR_DESCRIPTION.to_owned(),
        };
        let reply = client.create_monitor(&spec).await?;
        return Ok(MonitorOutcome::Created { reply });
    };

    if listing.items.len() > 1 {
        warn!(
            topic = %topic.as_topic(),
            count = listing.items.len(),
            "found several monitors for one topic and endpoint; kicking the first"
        );
    }

    info!(topic = %topic.as_topic(), monitor = %existing.id, "kicking existing push monitor");
    client
        .kick_monitor(&existing.id, &credentials.username, &credentials.password)
        .await?;

    Ok(MonitorOutcome::Kicked {
        monitor: existing,
        listing,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct FakeMonitors {
        existing: Vec<Monitor>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeMonitors {
        fn with_ids(ids: &[&str]) -> Self {
            Self {
                existing: ids
                    .iter()
                    .map(|id| Monitor {
                        id: (*id).to_owned(),
                        topic: "DeviceCore".into(),
                        transport_url: None,
                        status: Some("INACTIVE".into()),
                        description: None,
                    })
                    .collect(),
                calls: Mutex::default(),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MonitorClient for FakeMonitors {
        async fn list_monitors(
            &self,
            topic: &MonitorTopic,
            _endpoint: &str,
        ) -> Result<MonitorList, CoreError> {
            self.calls.lock().unwrap().push(format!("list {}", topic.as_topic()));
            Ok(MonitorList {
                result_size: self.existing.len().to_string(),
                items: self.existing.clone(),
            })
        }

        async fn create_monitor(&self, spec: &MonitorSpec) -> Result<Value, CoreError> {
            self.calls.lock().unwrap().push(format!(
                "create {} as {}:{}",
                spec.topic.as_topic(),
                spec.push_username,
                spec.push_password.expose_secret()
            ));
            Ok(json!({"location": "Monitor/77"}))
        }

        async fn kick_monitor(
            &self,
            monitor_id: &str,
            username: &str,
            _password: &SecretString,
        ) -> Result<Value, CoreError> {
            self.calls.lock().unwrap().push(format!("kick {monitor_id} as {username}"));
            Ok(Value::Null)
        }
    }

    fn credentials() -> MonitorCredentials {
        MonitorCredentials {
            username: "pusher".into(),
            password: SecretString::from("s3cret".to_string()),
        }
    }

    #[tokio::test]
    async fn creates_when_none_exist() {
        let fake = FakeMonitors::default();
        let topic = MonitorTopic::DataPoint {
            device_id: "00000000-00000000-00409DFF-FF5E1F2A".into(),
        };
        let outcome = ensure_monitor(&fake, topic, "https://kit.example.com/push", &credentials())
            .await
            .unwrap();

        assert!(matches!(outcome, MonitorOutcome::Created { .. }));
        assert_eq!(
            fake.calls(),
            vec![
                "list DataPoint/00000000-00000000-00409DFF-FF5E1F2A".to_owned(),
                "create DataPoint/00000000-00000000-00409DFF-FF5E1F2A as pusher:s3cret".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn kicks_the_first_existing_monitor() {
        let fake = FakeMonitors::with_ids(&["12", "13"]);
        let outcome = ensure_monitor(
            &fake,
            MonitorTopic::DeviceCore,
            "https://kit.example.com/push",
            &credentials(),
        )
        .await
        .unwrap();

        match outcome {
            MonitorOutcome::Kicked { monitor, listing } => {
                assert_eq!(monitor.id, "12");
                assert_eq!(listing.items.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fake.calls().last().map(String::as_str), Some("kick 12 as pusher"));
    }

    #[tokio::test]
    async fn local_endpoints_are_rejected_before_any_request() {
        let fake = FakeMonitors::default();
        for endpoint in ["http://localhost:8000/push", "http://127.0.0.1/push", "not a url"] {
            let err = ensure_monitor(&fake, MonitorTopic::DeviceCore, endpoint, &credentials())
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::Config { .. }));
        }
        assert!(fake.calls().is_empty());
    }
}
