//! Shared helpers for command handlers.

use std::path::Path;

use kitsync_core::{Ack, Directives, SettingValue};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Split a `NAME=VALUE` argument.
///
/// Values stay text; the engine coerces them per directive (levels,
/// integers, literals), so `DIO0=1` and `M0=256` both work.
pub fn parse_assignment(raw: &str) -> Result<(String, SettingValue), CliError> {
    let (name, value) = raw.split_once('=').ok_or_else(|| CliError::Validation {
        field: raw.into(),
        reason: "expected NAME=VALUE".into(),
    })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::Validation {
            field: raw.into(),
            reason: "name cannot be empty".into(),
        });
    }
    Ok((name.to_owned(), SettingValue::from(value)))
}

/// Collect `NAME=VALUE` arguments in the order given.
pub fn parse_directives(raw: &[String]) -> Result<Directives, CliError> {
    raw.iter().map(|arg| parse_assignment(arg)).collect()
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` style arguments.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: path.display().to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Print a device acknowledgement: the reply document, or `ok` for plain.
pub fn print_ack(ack: &Ack, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        &global.output,
        ack,
        |a| serde_json::to_string_pretty(&a.reply).unwrap_or_default(),
        |_| "ok".into(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_keep_order_and_text() {
        let args = vec!["DIO2=high".to_owned(), "M0=256".to_owned(), "serial=a=b".to_owned()];
        let directives = parse_directives(&args).unwrap_or_default();
        let names: Vec<_> = directives.keys().cloned().collect();
        assert_eq!(names, ["DIO2", "M0", "serial"]);
        assert_eq!(directives["serial"], SettingValue::from("a=b"));
    }

    #[test]
    fn missing_equals_is_rejected() {
        assert!(matches!(
            parse_assignment("DIO2"),
            Err(CliError::Validation { .. })
        ));
        assert!(parse_assignment("=on").is_err());
    }
}
