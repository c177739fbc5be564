//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one value per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use kitsync_core::{ConfigTree, LivenessVerdict};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// `active` in green, `inactive` in red.
pub fn paint_verdict(verdict: LivenessVerdict, color: bool) -> String {
    let label = verdict.to_string();
    match (color, verdict) {
        (false, _) => label,
        (true, LivenessVerdict::Active) => label.green().to_string(),
        (true, LivenessVerdict::Inactive) => label.red().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one value per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, serde_json::Error>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false)?,
        OutputFormat::JsonCompact => render_json(data, true)?,
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted string,
/// since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, serde_json::Error>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false)?,
        OutputFormat::JsonCompact => render_json(data, true)?,
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Settings trees ───────────────────────────────────────────────────

#[derive(Tabled)]
pub struct SettingRow {
    #[tabled(rename = "Group")]
    pub group: String,
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Flatten a tree into `(group, key, value)` rows.
pub fn setting_rows(tree: &ConfigTree) -> Vec<SettingRow> {
    tree.groups()
        .flat_map(|(group, settings)| {
            settings.iter().map(move |(key, value)| SettingRow {
                group: group.clone(),
                key: key.clone(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Render a settings tree: a group/key/value table, `group.key=value`
/// lines for plain, or the nested object for structured formats.
pub fn render_tree(format: &OutputFormat, tree: &ConfigTree) -> Result<String, serde_json::Error> {
    Ok(match format {
        OutputFormat::Table => {
            if tree.is_empty() {
                String::new()
            } else {
                render_table(&setting_rows(tree))
            }
        }
        OutputFormat::Plain => setting_rows(tree)
            .iter()
            .map(|row| format!("{}.{}={}", row.group, row.key, row.value))
            .collect::<Vec<_>>()
            .join("\n"),
        other => render_single(other, tree, |_| String::new(), |_| String::new())?,
    })
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, serde_json::Error> {
    if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    }
}

/// YAML output. Falls back to an inline error note rather than failing
/// the command after it already succeeded.
fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("# yaml serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tree_is_one_assignment_per_line() {
        let mut tree = ConfigTree::new();
        tree.insert("radio", "sample_rate", "10000");
        tree.insert("radio", "dio_detect", "0x1cd0");
        let out = render_tree(&OutputFormat::Plain, &tree).unwrap_or_default();
        assert_eq!(out, "radio.dio_detect=0x1cd0\nradio.sample_rate=10000");
    }

    #[test]
    fn verdicts_render_without_color() {
        assert_eq!(paint_verdict(LivenessVerdict::Inactive, false), "inactive");
    }
}
