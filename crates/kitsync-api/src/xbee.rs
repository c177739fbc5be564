// Radio node inventory (`/ws/XbeeCore`).
//
// The cloud keeps a cached list of the radios each gateway has seen.
// With `cache=false` it asks the gateway to run node discovery instead,
// and `clear=true` empties the gateway's own node table first.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::DeviceCloudClient;
use crate::error::Error;
use crate::monitor::string_or_number;

/// One radio node known to the cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbeeNode {
    /// Gateway the radio is attached to.
    #[serde(rename = "devConnectwareId", default)]
    pub device_id: String,
    /// 64-bit extended address, e.g. `00:13:A2:00:40:A1:B2:C3`.
    #[serde(rename = "xpExtAddr")]
    pub ext_addr: String,
    #[serde(rename = "xpNodeId", default)]
    pub node_id: Option<String>,
    #[serde(rename = "xpNetAddr", default)]
    pub net_addr: Option<String>,
    /// `0` coordinator, `1` router, `2` end device.
    #[serde(rename = "xpNodeType", default)]
    pub node_type: Option<String>,
}

/// The `{resultSize, items}` listing envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbeeList {
    #[serde(rename = "resultSize", deserialize_with = "string_or_number", default)]
    pub result_size: String,
    #[serde(default)]
    pub items: Vec<XbeeNode>,
}

/// Which radios to list and how fresh the answer must be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XbeeQuery {
    /// Restrict to radios behind one gateway.
    pub device_id: Option<String>,
    /// Restrict to these extended addresses.
    pub ext_addrs: Vec<String>,
    /// Answer from the cloud's cached inventory.
    pub cache: bool,
    /// Clear the gateway's node table before discovery.
    pub clear: bool,
}

impl Default for XbeeQuery {
    fn default() -> Self {
        Self {
            device_id: None,
            ext_addrs: Vec::new(),
            cache: true,
            clear: false,
        }
    }
}

impl XbeeQuery {
    /// Radios behind one gateway.
    pub fn for_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Self::default()
        }
    }

    /// Cached radios with the given extended addresses, on any gateway.
    pub fn for_addrs(ext_addrs: Vec<String>) -> Self {
        Self {
            ext_addrs,
            ..Self::default()
        }
    }

    /// The `condition` query value, if the query filters at all.
    ///
    /// Single quotes are doubled so an address cannot close the literal.
    pub fn condition(&self) -> Option<String> {
        let mut clauses = Vec::new();
        if let Some(device_id) = &self.device_id {
            clauses.push(format!("devConnectwareId='{}'", quote(device_id)));
        }
        if !self.ext_addrs.is_empty() {
            let addrs: Vec<String> = self
                .ext_addrs
                .iter()
                .map(|addr| format!("xpExtAddr='{}'", quote(addr)))
                .collect();
            clauses.push(if addrs.len() == 1 {
                addrs.concat()
            } else {
                format!("({})", addrs.join(" or "))
            });
        }
        (!clauses.is_empty()).then(|| clauses.join(" and "))
    }
}

fn quote(raw: &str) -> String {
    raw.replace('\'', "''")
}

impl DeviceCloudClient {
    /// List radio nodes, optionally running discovery on the gateway.
    pub async fn list_xbees(&self, query: &XbeeQuery) -> Result<XbeeList, Error> {
        let mut url = self.ws_url("XbeeCore")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(condition) = query.condition() {
                pairs.append_pair("condition", &condition);
            }
            pairs.append_pair("cache", if query.cache { "true" } else { "false" });
            if query.clear {
                pairs.append_pair("clear", "true");
            }
        }
        debug!(cache = query.cache, clear = query.clear, "GET {url}");

        let reply = self.send(self.http_get(url)).await?;
        serde_json::from_value(reply.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: reply.to_string(),
        })
    }
}
