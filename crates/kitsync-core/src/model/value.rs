// ── Scalar values ──
//
// Directive values and settings arrive as JSON scalars of any type. Each
// target encoding gets an explicit conversion instead of ad hoc checks at
// the call site.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A JSON-scalar-compatible value.
///
/// Equality is structural: `Text("1")` and `Int(1)` are different values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SettingValue {
    /// Convert a JSON value, returning `None` for null, arrays, and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Null
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Interpret the value as an output level.
    ///
    /// Booleans pass through. Text accepts the usual truthy/falsy words
    /// (`true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`, plus the `y`, `n`,
    /// `t`, `f` abbreviations), then `high`/`low`, all case-insensitive.
    /// Numbers are rejected.
    pub fn to_level(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => parse_truthy(s).or_else(|| {
                let s = s.trim();
                if s.eq_ignore_ascii_case("high") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("low") {
                    Some(false)
                } else {
                    None
                }
            }),
            Self::Int(_) | Self::Float(_) => None,
        }
    }

    /// Interpret the value as a signed integer.
    ///
    /// Floats truncate toward zero, booleans become 0/1, and text must be a
    /// plain base-10 integer (surrounding whitespace allowed).
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Float(f) => {
                let t = f.trunc();
                // i64::MAX is not exactly representable; compare against 2^63.
                (t.is_finite() && t >= -9_223_372_036_854_775_808.0 && t < 9_223_372_036_854_775_808.0)
                    .then_some(t as i64)
            }
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Plain string rendering, used for literal-class settings and serial data.
    ///
    /// Text passes through untouched. Other scalars use `Display`:
    /// booleans render lowercase (`true`), and whole floats drop the
    /// fraction (`2.0` renders `2`). Send text when a device expects a
    /// different spelling such as `True`.
    pub fn to_literal(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for SettingValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for SettingValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

fn parse_truthy(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn levels_from_words() {
        assert_eq!(SettingValue::from("High").to_level(), Some(true));
        assert_eq!(SettingValue::from("LOW").to_level(), Some(false));
        assert_eq!(SettingValue::from("on").to_level(), Some(true));
        assert_eq!(SettingValue::from("0").to_level(), Some(false));
        assert_eq!(SettingValue::from(true).to_level(), Some(true));
        assert_eq!(SettingValue::from("maybe").to_level(), None);
        assert_eq!(SettingValue::from(1_i64).to_level(), None);
    }

    #[test]
    fn integers_from_mixed_types() {
        assert_eq!(SettingValue::from("256").to_integer(), Some(256));
        assert_eq!(SettingValue::from(" -3 ").to_integer(), Some(-3));
        assert_eq!(SettingValue::from(2.9).to_integer(), Some(2));
        assert_eq!(SettingValue::from(true).to_integer(), Some(1));
        assert_eq!(SettingValue::from("0x100").to_integer(), None);
        assert_eq!(SettingValue::from(f64::NAN).to_integer(), None);
        assert_eq!(SettingValue::from(1e300).to_integer(), None);
    }

    #[test]
    fn untagged_deserialization_keeps_native_types() {
        let values: Vec<SettingValue> =
            serde_json::from_str(r#"[true, 7, 1.5, "7"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                SettingValue::Bool(true),
                SettingValue::Int(7),
                SettingValue::Float(1.5),
                SettingValue::Text("7".into()),
            ]
        );
        assert_ne!(values[1], values[3]);
    }

    #[test]
    fn literals_use_display_spelling() {
        assert_eq!(SettingValue::from(true).to_literal(), "true");
        assert_eq!(SettingValue::from(2.0).to_literal(), "2");
        assert_eq!(SettingValue::from(1.5).to_literal(), "1.5");
        assert_eq!(SettingValue::from("True").to_literal(), "True");
    }

    #[test]
    fn non_scalar_json_is_rejected() {
        assert!(SettingValue::from_json(&serde_json::json!(null)).is_none());
        assert!(SettingValue::from_json(&serde_json::json!([1])).is_none());
    }
}
