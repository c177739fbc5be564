// ── I/O command encoding ──
//
// Collapses classified directives into protocol-ready commands. A single
// request yields at most one output-mask command, one settings command,
// and one serial command. Everything is validated before the plan is
// returned, so a failed encode never leaves a half-sent request behind.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use indexmap::IndexMap;
use serde::Serialize;
use serde::ser::SerializeStruct;
use strum::Display;

use crate::directive::{Directive, DirectiveKind, Directives, classify_all};
use crate::error::CoreError;
use crate::model::{ConfigTree, RadioAddress, SettingValue, Settings};

/// Settings group that two-character I/O codes are written under.
pub const SETTINGS_GROUP: &str = "InputOutput";

/// Output masks are 64 bits wide.
pub const PIN_LIMIT: u32 = u64::BITS;

// ── Value classes ────────────────────────────────────────────────────

/// How a two-character setting's value is rendered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ValueClass {
    /// `0x`-prefixed hexadecimal integer.
    Hex,
    /// Base-10 integer.
    Decimal,
    /// Plain string, passed through.
    Literal,
}

impl ValueClass {
    /// Look up the class for a normalized two-character code.
    pub fn of(key: &str) -> Self {
        match key {
            "M0" | "M1" | "IC" | "PR" | "PD" | "DS" => Self::Hex,
            k if matches!(k, "LT" | "RP" | "IR" | "IF") || k.starts_with(['T', 'Q']) => {
                Self::Decimal
            }
            _ => Self::Literal,
        }
    }

    /// Render `value` for this class. `None` if an integer was required
    /// and the value isn't one.
    pub fn format(self, value: &SettingValue) -> Option<String> {
        match self {
            Self::Hex => value.to_integer().map(hex_string),
            Self::Decimal => value.to_integer().map(|i| i.to_string()),
            Self::Literal => Some(value.to_literal()),
        }
    }
}

/// `0x`-prefixed lowercase hex; negatives get a leading `-`.
pub fn hex_string(value: i64) -> String {
    if value < 0 {
        format!("-{:#x}", value.unsigned_abs())
    } else {
        format!("{value:#x}")
    }
}

fn parse_hex_mask(raw: &str) -> Option<u64> {
    let digits = raw
        .trim()
        .strip_prefix("0x")
        .or_else(|| raw.trim().strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

// ── Bit command ──────────────────────────────────────────────────────

/// Enable/level mask pair for digital outputs.
///
/// A level bit is only ever set together with its enable bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitCommand {
    enable_mask: u64,
    level_mask: u64,
}

impl BitCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `pin` and OR its level into the level mask.
    ///
    /// Repeating a pin can raise its level but never lower it.
    pub fn set(&mut self, pin: u32, high: bool) -> Result<(), CoreError> {
        if pin >= PIN_LIMIT {
            return Err(CoreError::invalid(
                format!("DIO{pin}"),
                format!("pin index must be below {PIN_LIMIT}"),
            ));
        }
        let bit = 1_u64 << pin;
        self.enable_mask |= bit;
        if high {
            self.level_mask |= bit;
        }
        Ok(())
    }

    /// Rebuild from raw masks. Level bits outside the enable mask are rejected.
    pub fn from_masks(enable_mask: u64, level_mask: u64) -> Result<Self, CoreError> {
        if level_mask & !enable_mask != 0 {
            return Err(CoreError::invalid(
                "level",
                format!("level mask {level_mask:#x} sets pins outside enable mask {enable_mask:#x}"),
            ));
        }
        Ok(Self {
            enable_mask,
            level_mask,
        })
    }

    /// Rebuild from the `0x…` strings sent on the wire.
    pub fn from_hex(enable: &str, level: &str) -> Result<Self, CoreError> {
        let enable_mask =
            parse_hex_mask(enable).ok_or_else(|| CoreError::invalid("enable", "not a hex mask"))?;
        let level_mask =
            parse_hex_mask(level).ok_or_else(|| CoreError::invalid("level", "not a hex mask"))?;
        Self::from_masks(enable_mask, level_mask)
    }

    pub fn enable_mask(&self) -> u64 {
        self.enable_mask
    }

    pub fn level_mask(&self) -> u64 {
        self.level_mask
    }

    pub fn enable_hex(&self) -> String {
        format!("{:#x}", self.enable_mask)
    }

    pub fn level_hex(&self) -> String {
        format!("{:#x}", self.level_mask)
    }

    pub fn is_empty(&self) -> bool {
        self.enable_mask == 0
    }

    /// Every enabled pin with its level, lowest pin first.
    pub fn pins(&self) -> Vec<(u32, bool)> {
        (0..PIN_LIMIT)
            .filter(|pin| self.enable_mask & (1 << pin) != 0)
            .map(|pin| (pin, self.level_mask & (1 << pin) != 0))
            .collect()
    }
}

impl Serialize for BitCommand {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BitCommand", 2)?;
        state.serialize_field("enable", &self.enable_hex())?;
        state.serialize_field("level", &self.level_hex())?;
        state.end()
    }
}

// ── Settings group ───────────────────────────────────────────────────

/// Formatted two-character settings, all under one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingGroup {
    pub name: String,
    pub settings: IndexMap<String, String>,
}

impl SettingGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// The group as a one-group tree, values as text.
    pub fn to_tree(&self) -> ConfigTree {
        let settings: Settings = self
            .settings
            .iter()
            .map(|(k, v)| (k.clone(), SettingValue::Text(v.clone())))
            .collect();
        std::iter::once((self.name.clone(), settings)).collect()
    }
}

// ── Serial payload ───────────────────────────────────────────────────

/// Base64-encoded serial data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SerialPayload(String);

impl SerialPayload {
    pub fn encode(data: impl AsRef<[u8]>) -> Self {
        Self(BASE64.encode(data))
    }

    /// Wrap data the caller has already encoded, checking that it decodes.
    pub fn from_encoded(encoded: impl Into<String>) -> Result<Self, CoreError> {
        let encoded = encoded.into();
        BASE64
            .decode(encoded.trim())
            .map_err(|e| CoreError::invalid("data", format!("not valid base64: {e}")))?;
        Ok(Self(encoded.trim().to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<Vec<u8>, CoreError> {
        BASE64
            .decode(&self.0)
            .map_err(|e| CoreError::Internal(format!("serial payload is not base64: {e}")))
    }
}

/// Build a serial payload from caller data.
pub fn encode_serial(data: &str, already_encoded: bool) -> Result<SerialPayload, CoreError> {
    if already_encoded {
        SerialPayload::from_encoded(data)
    } else {
        Ok(SerialPayload::encode(data))
    }
}

// ── Gateway node commands ────────────────────────────────────────────

/// A command for one radio node, relayed by the gateway application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum NodeCommand {
    SetDigitalOutput {
        addr: RadioAddress,
        name: String,
        high: bool,
    },
    SendSerial {
        addr: RadioAddress,
        data: SerialPayload,
    },
}

impl NodeCommand {
    pub(crate) fn to_gateway(&self) -> kitsync_api::GatewayCommand {
        match self {
            Self::SetDigitalOutput { addr, name, high } => {
                kitsync_api::GatewayCommand::SetDigitalOutput {
                    addr: addr.to_string(),
                    name: name.clone(),
                    high: *high,
                }
            }
            Self::SendSerial { addr, data } => kitsync_api::GatewayCommand::SendSerial {
                addr: addr.to_string(),
                data: data.as_str().to_owned(),
            },
        }
    }
}

/// Node address → (output name → level).
pub type NodeOutputs = IndexMap<String, IndexMap<String, SettingValue>>;

/// Encode per-node output levels into gateway commands.
///
/// Output names are passed through untouched; the gateway application
/// resolves them. An empty request is rejected.
pub fn encode_node_outputs(outputs: &NodeOutputs) -> Result<Vec<NodeCommand>, CoreError> {
    let mut commands = Vec::new();
    for (addr, levels) in outputs {
        for (name, value) in levels {
            let high = value.to_level().ok_or_else(|| {
                CoreError::invalid(
                    format!("{addr}/{name}"),
                    "expected a boolean, 'high' or 'low'",
                )
            })?;
            commands.push(NodeCommand::SetDigitalOutput {
                addr: RadioAddress::from(addr.as_str()),
                name: name.clone(),
                high,
            });
        }
    }

    if commands.is_empty() {
        return Err(CoreError::invalid("outputs", "no output values given"));
    }
    Ok(commands)
}

// ── Plan ─────────────────────────────────────────────────────────────

/// One protocol command, ready for a [`DeviceClient`](crate::DeviceClient).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum IoCommand {
    SetOutput(BitCommand),
    SetSettings(SettingGroup),
    SendSerial(SerialPayload),
    Gateway(Vec<NodeCommand>),
}

impl IoCommand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SetOutput(_) => "set_output",
            Self::SetSettings(_) => "set_settings",
            Self::SendSerial(_) => "send_serial",
            Self::Gateway(_) => "gateway",
        }
    }
}

/// Everything one write request turns into.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IoPlan {
    pub bits: Option<BitCommand>,
    pub settings: Option<SettingGroup>,
    pub serial: Option<SerialPayload>,
}

impl IoPlan {
    pub fn is_empty(&self) -> bool {
        self.bits.is_none() && self.settings.is_none() && self.serial.is_none()
    }

    /// Commands in send order: outputs, then settings, then serial.
    pub fn commands(&self) -> Vec<IoCommand> {
        let mut commands = Vec::with_capacity(3);
        if let Some(bits) = self.bits {
            commands.push(IoCommand::SetOutput(bits));
        }
        if let Some(group) = &self.settings {
            commands.push(IoCommand::SetSettings(group.clone()));
        }
        if let Some(serial) = &self.serial {
            commands.push(IoCommand::SendSerial(serial.clone()));
        }
        commands
    }
}

/// Classify and encode a write request.
///
/// Fails on the first directive that can't be classified or coerced.
pub fn encode(directives: &Directives) -> Result<IoPlan, CoreError> {
    encode_classified(&classify_all(directives)?)
}

/// Encode directives that have already been classified.
pub fn encode_classified(directives: &[Directive]) -> Result<IoPlan, CoreError> {
    let mut bits = BitCommand::new();
    let mut group = SettingGroup::new(SETTINGS_GROUP);
    let mut serial: Option<String> = None;

    for directive in directives {
        match &directive.kind {
            DirectiveKind::DigitalPin { pin } => {
                let high = directive.value.to_level().ok_or_else(|| {
                    CoreError::invalid(&directive.name, "expected a boolean, 'high' or 'low'")
                })?;
                bits.set(*pin, high)
                    .map_err(|_| CoreError::invalid(&directive.name, "pin index out of range"))?;
            }
            DirectiveKind::RawSetting { key } => {
                let class = ValueClass::of(key);
                let formatted = class.format(&directive.value).ok_or_else(|| {
                    CoreError::invalid(
                        &directive.name,
                        format!("{key} takes a {class} integer, got '{}'", directive.value),
                    )
                })?;
                group.settings.insert(key.clone(), formatted);
            }
            DirectiveKind::SerialChunk => {
                serial
                    .get_or_insert_with(String::new)
                    .push_str(&directive.value.to_literal());
            }
            DirectiveKind::Unrecognized => {
                return Err(CoreError::invalid(&directive.name, "unknown directive name"));
            }
        }
    }

    Ok(IoPlan {
        bits: (!bits.is_empty()).then_some(bits),
        settings: (!group.is_empty()).then_some(group),
        serial: serial.map(SerialPayload::encode),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn directives(pairs: &[(&str, SettingValue)]) -> Directives {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn pins_accumulate_into_masks() {
        let plan = encode(&directives(&[
            ("DIO0", true.into()),
            ("DIO2", false.into()),
        ]))
        .unwrap();
        let bits = plan.bits.unwrap();
        assert_eq!(bits.enable_mask(), 0b101);
        assert_eq!(bits.level_mask(), 0b001);
        assert_eq!(bits.enable_hex(), "0x5");
        assert_eq!(bits.level_hex(), "0x1");
        assert!(plan.settings.is_none());
        assert!(plan.serial.is_none());
    }

    #[test]
    fn level_bits_stay_inside_enable_mask() {
        let cases: &[&[(u32, bool)]] = &[
            &[],
            &[(0, false)],
            &[(63, true), (0, false)],
            &[(5, true), (5, false), (7, true)],
            &[(1, false), (2, false), (3, true), (40, true)],
        ];
        for pins in cases {
            let mut bits = BitCommand::new();
            for (pin, high) in *pins {
                bits.set(*pin, *high).unwrap();
            }
            assert_eq!(bits.level_mask() & !bits.enable_mask(), 0);
        }
    }

    #[test]
    fn masks_decode_to_the_pins_that_were_set() {
        let mut bits = BitCommand::new();
        bits.set(0, true).unwrap();
        bits.set(4, false).unwrap();
        bits.set(12, true).unwrap();

        let decoded = BitCommand::from_hex(&bits.enable_hex(), &bits.level_hex()).unwrap();
        assert_eq!(decoded.pins(), vec![(0, true), (4, false), (12, true)]);
    }

    #[test]
    fn stray_level_bits_are_rejected() {
        assert!(BitCommand::from_masks(0b01, 0b10).is_err());
        assert!(BitCommand::from_hex("5", "0x1").is_err());
    }

    #[test]
    fn out_of_range_pins_are_invalid() {
        let err = encode(&directives(&[("DIO64", true.into())])).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDirective { ref name, .. } if name == "DIO64"));
    }

    #[test]
    fn pin_levels_accept_words() {
        let plan = encode(&directives(&[
            ("dio1", "HIGH".into()),
            ("dio3", "off".into()),
            ("dio4", "yes".into()),
        ]))
        .unwrap();
        assert_eq!(plan.bits.unwrap().pins(), vec![(1, true), (3, false), (4, true)]);
    }

    #[test]
    fn numeric_pin_levels_are_invalid() {
        assert!(encode(&directives(&[("DIO0", 1_i64.into())])).is_err());
        assert!(encode(&directives(&[("DIO0", "sideways".into())])).is_err());
    }

    #[test]
    fn hex_class_settings() {
        let plan = encode(&directives(&[("M0", "256".into())])).unwrap();
        let group = plan.settings.as_ref().unwrap();
        assert_eq!(group.name, "InputOutput");
        assert_eq!(group.settings.get("M0").map(String::as_str), Some("0x100"));
        assert_eq!(plan.commands().len(), 1);
    }

    #[test]
    fn value_classes() {
        assert_eq!(ValueClass::of("PD"), ValueClass::Hex);
        assert_eq!(ValueClass::of("IR"), ValueClass::Decimal);
        assert_eq!(ValueClass::of("T3"), ValueClass::Decimal);
        assert_eq!(ValueClass::of("QZ"), ValueClass::Decimal);
        assert_eq!(ValueClass::of("NI"), ValueClass::Literal);

        assert_eq!(ValueClass::Hex.format(&(-1_i64).into()), Some("-0x1".into()));
        assert_eq!(ValueClass::Decimal.format(&2.7.into()), Some("2".into()));
        assert_eq!(ValueClass::Literal.format(&true.into()), Some("true".into()));
        assert_eq!(ValueClass::Decimal.format(&"ten".into()), None);
        assert_eq!(ValueClass::Literal.to_string(), "literal");
    }

    #[test]
    fn non_integer_for_integer_class_is_invalid() {
        let err = encode(&directives(&[("lt", "soon".into())])).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn serial_chunks_join_in_request_order() {
        let plan = encode(&directives(&[
            ("serial_b", "Hel".into()),
            ("DIO1", true.into()),
            ("serial_a", "lo!".into()),
        ]))
        .unwrap();
        let serial = plan.serial.clone().unwrap();
        assert_eq!(serial.as_str(), "SGVsbG8h");
        assert_eq!(serial.decode().unwrap(), b"Hello!");

        let labels: Vec<_> = plan.commands().iter().map(IoCommand::label).collect();
        assert_eq!(labels, vec!["set_output", "send_serial"]);
    }

    #[test]
    fn one_bad_directive_emits_nothing() {
        let err = encode(&directives(&[
            ("dio0", "high".into()),
            ("zanzibar", "x".into()),
        ]))
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDirective { ref name, .. } if name == "zanzibar"));
    }

    #[test]
    fn empty_request_is_an_empty_plan() {
        let plan = encode(&Directives::new()).unwrap();
        assert!(plan.is_empty());
        assert!(plan.commands().is_empty());
    }

    #[test]
    fn pre_encoded_serial_is_validated() {
        assert_eq!(encode_serial("SGVsbG8h", true).unwrap().as_str(), "SGVsbG8h");
        assert_eq!(encode_serial("Hello!", false).unwrap().as_str(), "SGVsbG8h");
        assert!(encode_serial("not base64!", true).is_err());
    }

    #[test]
    fn node_outputs() {
        let mut levels = IndexMap::new();
        levels.insert("DIO0".to_owned(), SettingValue::Bool(true));
        levels.insert("DIO1".to_owned(), SettingValue::from("low"));
        let mut outputs = NodeOutputs::new();
        outputs.insert("00:13:A2:00:40:9F:6F:CB".into(), levels);

        let commands = encode_node_outputs(&outputs).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[1],
            NodeCommand::SetDigitalOutput {
                addr: "00:13:A2:00:40:9F:6F:CB".into(),
                name: "DIO1".into(),
                high: false,
            }
        );
        assert!(encode_node_outputs(&NodeOutputs::new()).is_err());
    }

    #[test]
    fn plan_serializes_hex_masks() {
        let plan = encode(&directives(&[("DIO0", true.into())])).unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["bits"], serde_json::json!({"enable": "0x1", "level": "0x1"}));
    }
}
