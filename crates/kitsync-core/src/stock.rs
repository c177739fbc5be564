// ── Stock kit configuration ──
//
// The canonical radio configuration every kit node is reconciled against,
// and the pin-name → AT-code table used when talking about radio pins.

use std::sync::LazyLock;

use crate::model::{ConfigTree, Settings, SettingValue};

/// Settings group holding the radio pin configuration.
pub const RADIO_GROUP: &str = "radio";

// Pin function codes understood by the radio firmware.
const COMMISSIONING_BUTTON: &str = "1";
const ASSOCIATION_LED: &str = "1";
const ANALOG_INPUT: &str = "2";
const DIGITAL_INPUT: &str = "3";
const DIGITAL_OUT_LOW: &str = "4";
const DIGITAL_OUT_HIGH: &str = "5";

/// Pins whose changes are reported: DIO4, DIO6, DIO7, DIO10, DIO11, DIO12.
const CHANGE_DETECT_PINS: [u32; 6] = [4, 6, 7, 10, 11, 12];

static STOCK_CONFIG: LazyLock<ConfigTree> = LazyLock::new(|| {
    let detect = CHANGE_DETECT_PINS.iter().fold(0_i64, |mask, pin| mask | (1 << pin));

    let radio: Settings = [
        ("dio0_config", COMMISSIONING_BUTTON.to_owned()),
        // Potentiometer, accelerometer X and Y
        ("dio1_config", ANALOG_INPUT.to_owned()),
        ("dio2_config", ANALOG_INPUT.to_owned()),
        ("dio3_config", ANALOG_INPUT.to_owned()),
        // User button
        ("dio4_config", DIGITAL_INPUT.to_owned()),
        ("dio5_config", ASSOCIATION_LED.to_owned()),
        // Vibration motor, buzzer toggle
        ("dio6_config", DIGITAL_OUT_HIGH.to_owned()),
        ("dio7_config", DIGITAL_OUT_LOW.to_owned()),
        // DIO8 and DIO9 are not available on ZigBee radios.
        // Gauge LEDs, buzzer frequency, user LED
        ("dio10_config", DIGITAL_OUT_LOW.to_owned()),
        ("dio11_config", DIGITAL_OUT_HIGH.to_owned()),
        ("dio12_config", DIGITAL_OUT_LOW.to_owned()),
        ("dio_detect", crate::encode::hex_string(detect)),
        // Pull-ups on everything
        ("pullup_enable", "0x3dff".to_owned()),
        // Search for a new coordinator when the old one disappears
        ("join_verification", "1".to_owned()),
        // Sample every 10 seconds
        ("sample_rate", "10000".to_owned()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), SettingValue::Text(v)))
    .collect();

    std::iter::once((RADIO_GROUP.to_owned(), radio)).collect()
});

/// The stock kit configuration.
pub fn stock_config() -> &'static ConfigTree {
    &STOCK_CONFIG
}

/// AT command that configures a named pin (`DIO0` → `D0`, `DIO10` → `P0`).
///
/// Covers DIO0 through DIO19. The name is matched case-insensitively.
pub fn at_code_for_pin(name: &str) -> Option<String> {
    let pin: u32 = name
        .get(..3)
        .filter(|prefix| prefix.eq_ignore_ascii_case("DIO"))
        .and_then(|_| name.get(3..))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))?
        .parse()
        .ok()?;

    match pin {
        0..=9 => Some(format!("D{pin}")),
        10..=19 => Some(format!("P{}", pin - 10)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_radio_group() {
        let stock = stock_config();
        assert_eq!(stock.group(RADIO_GROUP).map(Settings::len), Some(15));
        assert_eq!(
            stock.get(RADIO_GROUP, "dio_detect"),
            Some(&SettingValue::from("0x1cd0"))
        );
        assert_eq!(
            stock.get(RADIO_GROUP, "dio6_config"),
            Some(&SettingValue::from("5"))
        );
        assert!(stock.get(RADIO_GROUP, "dio8_config").is_none());
    }

    #[test]
    fn pin_at_codes() {
        assert_eq!(at_code_for_pin("DIO0").as_deref(), Some("D0"));
        assert_eq!(at_code_for_pin("dio9").as_deref(), Some("D9"));
        assert_eq!(at_code_for_pin("DIO10").as_deref(), Some("P0"));
        assert_eq!(at_code_for_pin("DIO19").as_deref(), Some("P9"));
        assert_eq!(at_code_for_pin("DIO20"), None);
        assert_eq!(at_code_for_pin("DIO"), None);
        assert_eq!(at_code_for_pin("D10"), None);
    }
}
