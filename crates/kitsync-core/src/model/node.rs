// ── Radio nodes ──

use serde::Serialize;
use strum::Display;

use super::{DeviceId, RadioAddress};

/// Role a radio plays in its mesh network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Coordinator,
    Router,
    EndDevice,
    Unknown,
}

impl NodeRole {
    /// Decode the cloud's numeric node type.
    pub fn from_node_type(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("0") => Self::Coordinator,
            Some("1") => Self::Router,
            Some("2") => Self::EndDevice,
            _ => Self::Unknown,
        }
    }
}

/// A radio attached to a gateway, as reported by node discovery.
///
/// `address` is the value every radio-scoped operation takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioNode {
    pub address: RadioAddress,
    pub device: DeviceId,
    pub node_id: Option<String>,
    pub role: NodeRole,
}

impl From<kitsync_api::XbeeNode> for RadioNode {
    fn from(node: kitsync_api::XbeeNode) -> Self {
        Self {
            address: RadioAddress::new(node.ext_addr),
            device: DeviceId::new(node.device_id),
            node_id: node.node_id.filter(|id| !id.trim().is_empty()),
            role: NodeRole::from_node_type(node.node_type.as_deref()),
        }
    }
}

/// How fresh a node listing must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Discovery {
    /// The cloud's cached inventory.
    #[default]
    Cached,
    /// Ask the gateway to discover its radios now. `clear` empties the
    /// gateway's node table first.
    Fresh { clear: bool },
}
