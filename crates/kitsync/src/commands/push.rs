//! Push batch handlers (offline).
//!
//! Replays a captured callback body through the router with one logging
//! handler per `--device`, showing what a receiver would deliver and answer.

use serde::Serialize;
use tabled::Tabled;

use kitsync_core::push::{HandlerError, Named};
use kitsync_core::{
    DeviceId, DispatchReport, EventOutcome, HandlerRegistry, LivenessVerdict, PushEvent,
    TopicKind, dispatch_batch,
};

use crate::cli::{GlobalOpts, OutputFormat, PushArgs, PushCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&EventOutcome> for OutcomeRow {
    fn from(outcome: &EventOutcome) -> Self {
        match outcome {
            EventOutcome::Delivered {
                kind,
                device_id,
                handlers,
                faults,
            } => Self {
                outcome: "delivered".into(),
                kind: kind.to_string(),
                device: device_id.to_string(),
                detail: if faults.is_empty() {
                    format!("{handlers} handler(s)")
                } else {
                    format!("{handlers} handler(s), {} fault(s)", faults.len())
                },
            },
            EventOutcome::NoHandlers { kind, device_id } => Self {
                outcome: "no handlers".into(),
                kind: kind.to_string(),
                device: device_id.to_string(),
                detail: String::new(),
            },
            EventOutcome::Unroutable { topic, error } => Self {
                outcome: "unroutable".into(),
                kind: String::new(),
                device: String::new(),
                detail: format!("{topic}: {error}"),
            },
        }
    }
}

/// What the receiver would answer, alongside the per-event outcomes.
#[derive(Serialize)]
struct DispatchSummary<'a> {
    verdict: LivenessVerdict,
    status: u16,
    delivered: usize,
    outcomes: &'a [EventOutcome],
}

fn log_event(device_id: &DeviceId, event: &PushEvent) -> Result<(), HandlerError> {
    tracing::info!(device = %device_id, topic = %event.topic, "push event received");
    tracing::trace!(body = %event.body, "push event body");
    Ok(())
}

fn logging_registry(devices: &[String]) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for device in devices {
        let device_id = DeviceId::new(device);
        registry
            .register(
                TopicKind::DataPoint,
                device_id.clone(),
                Named::new("log", log_event),
            )
            .register(TopicKind::DeviceCore, device_id, Named::new("log", log_event));
    }
    registry
}

fn print_report(report: &DispatchReport, global: &GlobalOpts) -> Result<(), CliError> {
    let verdict = report.verdict();
    let summary = DispatchSummary {
        verdict,
        status: verdict.status_code(),
        delivered: report.delivered(),
        outcomes: &report.outcomes,
    };

    let out = match global.output {
        OutputFormat::Table => {
            let rows: Vec<OutcomeRow> = report.outcomes.iter().map(OutcomeRow::from).collect();
            let color = output::should_color(&global.color);
            format!(
                "{}\nVerdict: {} (HTTP {})",
                output::render_table(&rows),
                output::paint_verdict(verdict, color),
                verdict.status_code()
            )
        }
        OutputFormat::Plain => verdict.status_code().to_string(),
        _ => output::render_single(&global.output, &summary, |_| String::new(), |_| String::new())?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn handle(args: PushArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        PushCommand::Dispatch {
            path,
            devices,
            strict,
        } => {
            let body = util::read_json_file(&path)?;
            let registry = logging_registry(&devices);
            let report = dispatch_batch(&body, &registry)?;
            print_report(&report, global)?;

            let verdict = report.verdict();
            if strict && !verdict.is_active() {
                return Err(CliError::Inactive {
                    status: verdict.status_code(),
                });
            }
            Ok(())
        }

        PushCommand::Route { topic } => {
            let event = PushEvent::new(topic, serde_json::Value::Null);
            let (kind, subtopic) = event.route().map_err(|e| CliError::Validation {
                field: "topic".into(),
                reason: e.to_string(),
            })?;
            let device = match event.device_id() {
                Ok(id) => id.to_string(),
                Err(e) => format!("({e})"),
            };
            let out = match global.output {
                OutputFormat::Plain => device,
                _ => format!("Kind:      {kind}\nSubtopic:  {subtopic}\nDevice:    {device}"),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn logging_registry_listens_on_both_kinds() {
        let registry = logging_registry(&["00000000-00000000-00409dff-ff5e1f2a".to_owned()]);
        assert_eq!(registry.len(), 2);

        let body = json!({"Document": {"Msg": {
            "topic": "1234/DeviceCore/17",
            "DeviceCore": {"devConnectwareId": "00000000-00000000-00409DFF-FF5E1F2A"}
        }}});
        let report = dispatch_batch(&body, &registry).unwrap_or_default();
        assert_eq!(report.verdict(), LivenessVerdict::Active);
    }
}
