// SCI request construction and reply inspection.
//
// Requests are small XML documents posted to `/ws/sci`; replies are
// requested as JSON. Every request targets exactly one device. Element
// and attribute values are escaped, the surrounding shape is fixed.

use std::fmt::Write;

use serde_json::{Map, Value};

use crate::error::Error;

/// Where an RCI request is executed on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SciTarget {
    /// The gateway's own settings tree.
    Gateway,
    /// A radio node attached to the gateway, by 64-bit address.
    Radio(String),
}

impl SciTarget {
    pub fn radio(addr: impl Into<String>) -> Self {
        Self::Radio(addr.into())
    }

    /// Path from the SCI reply root to the `query_setting` element.
    fn settings_path(&self) -> &'static [&'static str] {
        match self {
            Self::Gateway => &[
                "sci_reply",
                "send_message",
                "device",
                "rci_reply",
                "query_setting",
            ],
            Self::Radio(_) => &[
                "sci_reply",
                "send_message",
                "device",
                "rci_reply",
                "do_command",
                "query_setting",
            ],
        }
    }
}

/// A command addressed to one radio node behind a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    /// Drive a named digital output high or low.
    SetDigitalOutput {
        addr: String,
        name: String,
        high: bool,
    },
    /// Send base64-encoded data out of the node's serial port.
    SendSerial { addr: String, data: String },
}

/// A fully-built SCI request for a single device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SciRequest {
    device_id: String,
    cache: bool,
    rci: String,
}

impl SciRequest {
    /// Query the current settings of the gateway or one of its radios.
    ///
    /// With `cache` set the device cloud answers from its own copy of the
    /// settings instead of contacting the device.
    pub fn query_settings(device_id: &str, target: &SciTarget, cache: bool) -> Self {
        let rci = match target {
            SciTarget::Gateway => "<query_setting/>".to_owned(),
            SciTarget::Radio(addr) => format!(
                r#"<do_command target="zigbee"><query_setting addr="{}"/></do_command>"#,
                escape(addr)
            ),
        };
        Self {
            device_id: device_id.to_owned(),
            cache,
            rci,
        }
    }

    /// Write settings given as `{group: {key: scalar}}`.
    pub fn set_settings(
        device_id: &str,
        target: &SciTarget,
        groups: &Map<String, Value>,
    ) -> Result<Self, Error> {
        let body = settings_xml(groups)?;
        let rci = match target {
            SciTarget::Gateway => format!("<set_setting>{body}</set_setting>"),
            SciTarget::Radio(addr) => format!(
                r#"<do_command target="zigbee"><set_setting addr="{}">{body}</set_setting></do_command>"#,
                escape(addr)
            ),
        };
        Ok(Self {
            device_id: device_id.to_owned(),
            cache: false,
            rci,
        })
    }

    /// Change digital output levels. Masks are hexadecimal strings (`0x5`).
    pub fn set_output(device_id: &str, enable_mask: &str, level_mask: &str) -> Self {
        Self {
            device_id: device_id.to_owned(),
            cache: false,
            rci: format!(
                r#"<do_command target="io"><set_output enable="{}" level="{}"/></do_command>"#,
                escape(enable_mask),
                escape(level_mask)
            ),
        }
    }

    /// Send already base64-encoded data out of the device's serial port.
    pub fn send_serial(device_id: &str, data_base64: &str) -> Self {
        Self {
            device_id: device_id.to_owned(),
            cache: false,
            rci: format!(
                r#"<do_command target="io"><send_serial encoding="base64">{}</send_serial></do_command>"#,
                escape(data_base64)
            ),
        }
    }

    /// Batch of node commands executed by the gateway application.
    pub fn gateway_commands(device_id: &str, commands: &[GatewayCommand]) -> Result<Self, Error> {
        if commands.is_empty() {
            return Err(Error::InvalidPayload {
                message: "no gateway commands given".into(),
            });
        }

        let mut rci = String::from(r#"<do_command target="xbgw">"#);
        for command in commands {
            match command {
                GatewayCommand::SetDigitalOutput { addr, name, high } => {
                    let _ = write!(
                        rci,
                        r#"<set_digital_output addr="{}" name="{}">{}</set_digital_output>"#,
                        escape(addr),
                        escape(name),
                        if *high { "high" } else { "low" }
                    );
                }
                GatewayCommand::SendSerial { addr, data } => {
                    let _ = write!(
                        rci,
                        r#"<send_serial addr="{}" encoding="base64">{}</send_serial>"#,
                        escape(addr),
                        escape(data)
                    );
                }
            }
        }
        rci.push_str("</do_command>");

        Ok(Self {
            device_id: device_id.to_owned(),
            cache: false,
            rci,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Render the complete `sci_request` document.
    pub fn to_xml(&self) -> String {
        format!(
            r#"<sci_request version="1.0"><send_message cache="{}"><targets><device id="{}"/></targets><rci_request version="1.1">{}</rci_request></send_message></sci_request>"#,
            self.cache,
            escape(&self.device_id),
            self.rci
        )
    }
}

/// Pull the settings tree for `target` out of a `query_setting` reply.
pub fn settings_from_reply(reply: &Value, target: &SciTarget) -> Result<Map<String, Value>, Error> {
    let path = target.settings_path();
    match lookup_path(reply, path) {
        Some(Value::Object(map)) => Ok(map.clone()),
        // An empty `<query_setting/>` element comes back as an empty string.
        Some(Value::String(s)) if s.is_empty() => Ok(Map::new()),
        _ => Err(Error::MissingElement {
            path: path.join("."),
            reply: reply.clone(),
        }),
    }
}

/// Walk nested objects along `path`.
pub fn lookup_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(key))
}

/// `true` if any object at any depth has an `error` key.
pub fn contains_error_key(value: &Value) -> bool {
    match value {
        Value::Object(map) => map
            .iter()
            .any(|(key, child)| key == "error" || contains_error_key(child)),
        Value::Array(items) => items.iter().any(contains_error_key),
        _ => false,
    }
}

// ── XML helpers ─────────────────────────────────────────────────────

fn settings_xml(groups: &Map<String, Value>) -> Result<String, Error> {
    let mut out = String::new();
    for (group, settings) in groups {
        check_element_name(group)?;
        let Value::Object(settings) = settings else {
            return Err(Error::InvalidPayload {
                message: format!("settings group '{group}' is not an object"),
            });
        };
        let _ = write!(out, "<{group}>");
        for (key, value) in settings {
            check_element_name(key)?;
            let text = scalar_text(value).ok_or_else(|| Error::InvalidPayload {
                message: format!("setting '{group}.{key}' is not a scalar"),
            })?;
            let _ = write!(out, "<{key}>{}</{key}>", escape(&text));
        }
        let _ = write!(out, "</{group}>");
    }
    Ok(out)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn check_element_name(name: &str) -> Result<(), Error> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidPayload {
            message: format!("'{name}' is not a valid settings name"),
        })
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_gateway_settings_xml() {
        let req = SciRequest::query_settings("00000000-00000000-00409DFF-FF000001", &SciTarget::Gateway, true);
        assert_eq!(
            req.to_xml(),
            r#"<sci_request version="1.0"><send_message cache="true"><targets><device id="00000000-00000000-00409DFF-FF000001"/></targets><rci_request version="1.1"><query_setting/></rci_request></send_message></sci_request>"#
        );
    }

    #[test]
    fn set_radio_settings_escapes_values() {
        let groups = json!({"radio": {"node_id": "a<b", "sample_rate": 10000}});
        let req = SciRequest::set_settings(
            "dev",
            &SciTarget::radio("00:13:A2:00:40:9F:6F:CB!"),
            groups.as_object().unwrap(),
        )
        .unwrap();
        let xml = req.to_xml();
        assert!(xml.contains(r#"<set_setting addr="00:13:A2:00:40:9F:6F:CB!">"#));
        assert!(xml.contains("<node_id>a&lt;b</node_id>"));
        assert!(xml.contains("<sample_rate>10000</sample_rate>"));
    }

    #[test]
    fn set_settings_rejects_nested_values() {
        let groups = json!({"radio": {"bad": {"nested": 1}}});
        let err = SciRequest::set_settings("dev", &SciTarget::Gateway, groups.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { .. }));
    }

    #[test]
    fn set_settings_rejects_non_object_group() {
        let groups = json!({"radio": "nope"});
        let err = SciRequest::set_settings("dev", &SciTarget::Gateway, groups.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { .. }));
    }

    #[test]
    fn gateway_commands_render_levels() {
        let req = SciRequest::gateway_commands(
            "dev",
            &[
                GatewayCommand::SetDigitalOutput {
                    addr: "[00:13:A2:00:40:9F:6F:CB]!".into(),
                    name: "DIO0".into(),
                    high: true,
                },
                GatewayCommand::SendSerial {
                    addr: "[00:13:A2:00:40:9F:6F:CB]!".into(),
                    data: "SGVsbG8h".into(),
                },
            ],
        )
        .unwrap();
        let xml = req.to_xml();
        assert!(xml.contains(r#"name="DIO0">high</set_digital_output>"#));
        assert!(xml.contains(r#"encoding="base64">SGVsbG8h</send_serial>"#));
    }

    #[test]
    fn gateway_commands_require_at_least_one() {
        assert!(SciRequest::gateway_commands("dev", &[]).is_err());
    }

    #[test]
    fn detects_nested_error_key() {
        let reply = json!({"sci_reply": {"send_message": {"device": {"rci_reply": {
            "set_setting": {"radio": {"error": {"desc": "bad value"}}}
        }}}}});
        assert!(contains_error_key(&reply));
        assert!(!contains_error_key(&json!({"sci_reply": {"ok": [1, 2]}})));
        assert!(contains_error_key(&json!([{"a": 1}, {"error": null}])));
    }

    #[test]
    fn extracts_radio_settings() {
        let reply = json!({"sci_reply": {"send_message": {"device": {"rci_reply": {
            "do_command": {"query_setting": {"radio": {"dio0_config": "1"}}}
        }}}}});
        let settings = settings_from_reply(&reply, &SciTarget::radio("x")).unwrap();
        assert_eq!(settings["radio"]["dio0_config"], "1");
    }

    #[test]
    fn missing_settings_element_is_an_error() {
        let reply = json!({"sci_reply": {"send_message": {}}});
        let err = settings_from_reply(&reply, &SciTarget::Gateway).unwrap_err();
        assert!(matches!(err, Error::MissingElement { .. }));
    }
}
