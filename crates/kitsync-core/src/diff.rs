// ── Configuration diffing ──
//
// The target tree decides which groups and keys are managed. Keys the
// device has that the target doesn't mention are left alone, and nothing
// is ever proposed for deletion: the settings protocol only overwrites.

use std::collections::BTreeSet;

use crate::model::{ConfigDelta, ConfigTree, Settings};
use crate::stock::stock_config;

/// Key-set relations between one group of the device and the target.
struct GroupDiff<'a> {
    current: &'a Settings,
    target: &'a Settings,
}

impl<'a> GroupDiff<'a> {
    fn new(current: &'a Settings, target: &'a Settings) -> Self {
        Self { current, target }
    }

    /// Managed keys the device is missing.
    fn missing(&self) -> impl Iterator<Item = &'a String> + '_ {
        self.target
            .keys()
            .filter(|key| !self.current.contains_key(*key))
    }

    /// Managed keys whose value differs on the device.
    fn changed(&self) -> impl Iterator<Item = &'a String> + '_ {
        self.target
            .iter()
            .filter(|(key, value)| self.current.get(*key).is_some_and(|c| c != *value))
            .map(|(key, _)| key)
    }

    /// Target values for every key that needs writing.
    fn proposals(&self) -> Settings {
        let keys: BTreeSet<&String> = self.changed().chain(self.missing()).collect();
        keys.into_iter()
            .filter_map(|key| self.target.get(key).map(|v| (key.clone(), v.clone())))
            .collect()
    }
}

/// Minimal set of writes that brings `current` in line with `target`.
///
/// - A group missing from `current` is copied whole, unless the target
///   group is empty. An empty group carries no writes, so it is left out
///   rather than proposed as `{}`.
/// - Otherwise keys that are missing or differ are proposed with the
///   target value; equal keys are omitted.
/// - Groups and keys only present in `current` never appear.
///
/// Values compare structurally, so `"1"` and `1` differ.
pub fn diff(current: &ConfigTree, target: &ConfigTree) -> ConfigDelta {
    let mut delta = ConfigDelta::new();

    for (name, wanted) in target.groups() {
        match current.group(name) {
            None if wanted.is_empty() => {}
            None => delta.insert_group(name.clone(), wanted.clone()),
            Some(have) => {
                let proposals = GroupDiff::new(have, wanted).proposals();
                if !proposals.is_empty() {
                    delta.insert_group(name.clone(), proposals);
                }
            }
        }
    }

    delta
}

/// [`diff`] against the built-in stock kit configuration.
pub fn diff_against_stock(current: &ConfigTree) -> ConfigDelta {
    diff(current, stock_config())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::SettingValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree(value: &serde_json::Value) -> ConfigTree {
        ConfigTree::from_json(value).unwrap()
    }

    #[test]
    fn missing_key_is_proposed() {
        let current = tree(&json!({"radio": {"dio0_config": "1"}}));
        let target = tree(&json!({"radio": {"dio0_config": "1", "dio1_config": "2"}}));
        assert_eq!(
            diff(&current, &target),
            tree(&json!({"radio": {"dio1_config": "2"}}))
        );
    }

    #[test]
    fn identical_trees_are_compliant() {
        let x = tree(&json!({
            "radio": {"a": "1", "b": 2, "c": true},
            "serial": {"baud": "9600"}
        }));
        assert!(diff(&x, &x).is_empty());
        assert!(diff_against_stock(stock_config()).is_empty());
    }

    #[test]
    fn changed_values_take_target_value() {
        let current = tree(&json!({"radio": {"dio6_config": "4", "sample_rate": "10000"}}));
        let target = tree(&json!({"radio": {"dio6_config": "5", "sample_rate": "10000"}}));
        assert_eq!(
            diff(&current, &target),
            tree(&json!({"radio": {"dio6_config": "5"}}))
        );
    }

    #[test]
    fn missing_group_is_copied_whole() {
        let current = tree(&json!({"serial": {"baud": "9600"}}));
        let target = tree(&json!({"radio": {"a": "1", "b": "2"}}));
        assert_eq!(diff(&current, &target), target);
    }

    #[test]
    fn delta_groups_come_from_target_only() {
        let current = tree(&json!({"radio": {"a": "0"}, "extra": {"x": "1"}}));
        let target = tree(&json!({"radio": {"a": "1"}, "other": {"y": "2"}}));
        let delta = diff(&current, &target);
        for (group, _) in delta.groups() {
            assert!(target.group(group).is_some(), "{group} not in target");
        }
        assert!(delta.group("extra").is_none());
    }

    #[test]
    fn unmanaged_device_keys_are_left_alone() {
        let current = tree(&json!({"radio": {"a": "1", "node_id": "kitchen"}}));
        let target = tree(&json!({"radio": {"a": "1"}}));
        assert!(diff(&current, &target).is_empty());
    }

    #[test]
    fn comparison_is_type_strict() {
        let current = tree(&json!({"radio": {"join_verification": 1}}));
        let target = tree(&json!({"radio": {"join_verification": "1"}}));
        assert_eq!(
            diff(&current, &target).get("radio", "join_verification"),
            Some(&SettingValue::from("1"))
        );
    }

    #[test]
    fn empty_target_groups_are_not_proposed() {
        let target = tree(&json!({"radio": {}}));
        assert!(diff(&ConfigTree::new(), &target).is_empty());

        let target = tree(&json!({"radio": {}, "serial": {"baud": "9600"}}));
        let delta = diff(&ConfigTree::new(), &target);
        assert_eq!(delta, tree(&json!({"serial": {"baud": "9600"}})));
        assert!(delta.group("radio").is_none());
    }

    #[test]
    fn stock_diff_from_blank_radio() {
        let current = tree(&json!({"radio": {}}));
        let delta = diff_against_stock(&current);
        assert_eq!(delta, *stock_config());
    }
}
