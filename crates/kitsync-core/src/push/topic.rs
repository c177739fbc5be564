// Topic parsing and routing-key extraction.
//
// Pushed topics look like `/{account}/{Kind}/{subtopic...}`. Only the kind
// and the URL-decoded remainder matter; the first segment is discarded.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::model::DeviceId;

/// Four groups of eight uppercase hex digits, optionally hyphen-separated,
/// anywhere after leading non-whitespace filler.
static DEVICE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S*(?P<dev_id>(?:-?[0-9A-F]{8}){4})").expect("valid device id pattern")
});

/// Primary topic of a push event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum TopicKind {
    /// Data point uploads; the device id is embedded in the subtopic.
    DataPoint,
    /// Device inventory/connection changes; the device id is in the body.
    DeviceCore,
    /// Anything else. Never routable.
    Other(String),
}

impl TopicKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "DataPoint" => Self::DataPoint,
            "DeviceCore" => Self::DeviceCore,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::DataPoint => "DataPoint",
            Self::DeviceCore => "DeviceCore",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TopicKind> for String {
    fn from(kind: TopicKind) -> Self {
        kind.as_str().to_owned()
    }
}

/// Why an event could not be mapped to a device.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Unroutable {
    #[error("topic '{topic}' has no kind and subtopic")]
    BadTopic { topic: String },

    #[error("no device id found in {kind} subtopic '{subtopic}'")]
    NoDeviceInSubtopic { kind: TopicKind, subtopic: String },

    #[error("no device id found in {kind} body")]
    NoDeviceInBody { kind: TopicKind },

    #[error("no handler for push topic kind '{kind}'")]
    UnknownKind { kind: TopicKind },
}

/// Split a full topic into its kind and URL-decoded subtopic.
///
/// One leading `/` is optional. The subtopic keeps any further separators.
pub fn route(topic: &str) -> Result<(TopicKind, String), Unroutable> {
    let trimmed = topic.strip_prefix('/').unwrap_or(topic);
    let mut parts = trimmed.splitn(3, '/');
    let _account = parts.next();
    match (parts.next(), parts.next()) {
        (Some(kind), Some(subtopic)) if !kind.is_empty() => {
            let decoded = urlencoding::decode_binary(subtopic.as_bytes());
            Ok((
                TopicKind::parse(kind),
                String::from_utf8_lossy(&decoded).into_owned(),
            ))
        }
        _ => Err(Unroutable::BadTopic {
            topic: topic.to_owned(),
        }),
    }
}

/// Find the device a routed event belongs to.
pub fn routing_key(
    kind: &TopicKind,
    subtopic: &str,
    body: &serde_json::Value,
) -> Result<DeviceId, Unroutable> {
    match kind {
        TopicKind::DataPoint => DEVICE_ID_PATTERN
            .captures(subtopic)
            .map(|caps| DeviceId::new(&caps["dev_id"]))
            .ok_or_else(|| Unroutable::NoDeviceInSubtopic {
                kind: kind.clone(),
                subtopic: subtopic.to_owned(),
            }),
        TopicKind::DeviceCore => body
            .get("DeviceCore")
            .and_then(|core| core.get("devConnectwareId"))
            .and_then(serde_json::Value::as_str)
            .map(DeviceId::new)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Unroutable::NoDeviceInBody { kind: kind.clone() }),
        TopicKind::Other(_) => Err(Unroutable::UnknownKind { kind: kind.clone() }),
    }
}
