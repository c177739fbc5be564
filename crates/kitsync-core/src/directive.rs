// ── Directive classification ──
//
// A write request is a flat map of loosely-named directives. Names arrive
// with separators and mixed case (`dio/0`, `Dio-0`, `m0`), so they are
// normalized before classification.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::error::CoreError;
use crate::model::SettingValue;

/// Directive name → value, in request order. Order matters: serial chunks
/// are concatenated in the order they appear.
pub type Directives = IndexMap<String, SettingValue>;

static DIO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^DIO(?P<pin>[0-9]+)").expect("valid DIO pattern")
});

/// What a directive asks the device to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DirectiveKind {
    /// Drive digital output `pin` high or low.
    DigitalPin { pin: u32 },
    /// Write a two-character setting code.
    RawSetting { key: String },
    /// Append to the serial payload.
    SerialChunk,
    /// Nothing matched. Encoding rejects these.
    Unrecognized,
}

/// One classified (name, value) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directive {
    /// The name as supplied by the caller.
    pub name: String,
    pub kind: DirectiveKind,
    pub value: SettingValue,
}

impl Directive {
    pub fn is_recognized(&self) -> bool {
        self.kind != DirectiveKind::Unrecognized
    }
}

/// Strip everything that isn't an ASCII letter or digit, then uppercase.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Classify a single directive. Total: every input yields a kind.
///
/// Precedence: `DIO<digits>` prefix, then any two-character code, then a
/// `SERIAL` prefix. Pin numbers too large for `u32` are unrecognized.
pub fn classify(name: &str, value: SettingValue) -> Directive {
    let normalized = normalize_name(name);

    let kind = if let Some(caps) = DIO_PATTERN.captures(&normalized) {
        caps["pin"]
            .parse()
            .map_or(DirectiveKind::Unrecognized, |pin| DirectiveKind::DigitalPin { pin })
    } else if normalized.len() == 2 {
        DirectiveKind::RawSetting { key: normalized }
    } else if normalized.starts_with("SERIAL") {
        DirectiveKind::SerialChunk
    } else {
        DirectiveKind::Unrecognized
    };

    Directive {
        name: name.to_owned(),
        kind,
        value,
    }
}

/// Classify a whole request, failing on the first unrecognized name.
pub fn classify_all(directives: &Directives) -> Result<Vec<Directive>, CoreError> {
    directives
        .iter()
        .map(|(name, value)| {
            let directive = classify(name, value.clone());
            if directive.is_recognized() {
                Ok(directive)
            } else {
                Err(CoreError::invalid(name, "unknown directive name"))
            }
        })
        .collect()
}
