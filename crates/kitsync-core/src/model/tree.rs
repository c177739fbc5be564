// ── Configuration trees ──
//
// group name → (setting key → value). BTreeMap keeps output stable for
// table rendering and test assertions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SettingValue;
use crate::error::CoreError;

/// Key → value map for one settings group.
pub type Settings = BTreeMap<String, SettingValue>;

/// Nested group → key → value configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(BTreeMap<String, Settings>);

/// The minimal set of group/key writes that brings a device into
/// compliance. Same shape as a [`ConfigTree`]; empty means compliant.
pub type ConfigDelta = ConfigTree;

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict conversion from a decoded JSON document.
    ///
    /// Rejects anything that is not `{group: {key: scalar}}`. Used for
    /// caller-supplied trees, so failures are input errors.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, CoreError> {
        let groups = value
            .as_object()
            .ok_or_else(|| CoreError::invalid("settings", "must be an object of groups"))?;

        let mut tree = Self::new();
        for (group, settings) in groups {
            let settings = settings
                .as_object()
                .ok_or_else(|| CoreError::invalid(group, "group must be an object of settings"))?;
            let entry = tree.0.entry(group.clone()).or_default();
            for (key, raw) in settings {
                let value = SettingValue::from_json(raw).ok_or_else(|| {
                    CoreError::invalid(format!("{group}.{key}"), "setting must be a scalar")
                })?;
                entry.insert(key.clone(), value);
            }
        }
        Ok(tree)
    }

    /// Lenient conversion from a device settings reply.
    ///
    /// Devices report empty settings as `null` and sometimes nest
    /// structured entries we don't manage. Nulls become empty strings;
    /// nested objects and arrays are skipped. Non-object groups are ignored.
    pub fn from_reply(value: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut tree = Self::new();
        for (group, settings) in value {
            let Some(settings) = settings.as_object() else {
                tracing::debug!(group, "skipping non-object settings group");
                continue;
            };
            let entry = tree.0.entry(group.clone()).or_default();
            for (key, raw) in settings {
                let value = match raw {
                    serde_json::Value::Null => Some(SettingValue::Text(String::new())),
                    other => SettingValue::from_json(other),
                };
                if let Some(value) = value {
                    entry.insert(key.clone(), value);
                }
            }
        }
        tree
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.to_json_map())
    }

    /// `{group: {key: value}}` as a JSON object map.
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.0
            .iter()
            .map(|(group, settings)| {
                let inner = settings
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                (group.clone(), serde_json::Value::Object(inner))
            })
            .collect()
    }

    pub fn insert(
        &mut self,
        group: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<SettingValue>,
    ) {
        self.0
            .entry(group.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Insert a whole group, replacing any existing one.
    pub fn insert_group(&mut self, group: impl Into<String>, settings: Settings) {
        self.0.insert(group.into(), settings);
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&SettingValue> {
        self.0.get(group).and_then(|g| g.get(key))
    }

    pub fn group(&self, name: &str) -> Option<&Settings> {
        self.0.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &Settings)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of key/value entries across all groups.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }
}

impl FromIterator<(String, Settings)> for ConfigTree {
    fn from_iter<I: IntoIterator<Item = (String, Settings)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
