// ── Device identity ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// A device-cloud device identifier, e.g. `00000000-00000000-00409DFF-FF5E1F2A`.
///
/// Identifiers are compared case-insensitively, so the inner string is
/// stored trimmed and uppercased. Hex-shaped push routing keys and
/// registry lookups both go through this normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Extended address of a radio node behind a gateway,
/// e.g. `00:13:a2:00:40:a1:b2:c3!`.
///
/// Kept verbatim: the gateway firmware matches addresses as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RadioAddress(String);

impl RadioAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RadioAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RadioAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RadioAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
