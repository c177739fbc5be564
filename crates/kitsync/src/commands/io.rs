//! I/O command handlers: directive writes, gateway node outputs, serial.

use indexmap::IndexMap;
use tabled::Tabled;

use kitsync_core::{DeviceId, IoCommand, NodeOutputs, RadioAddress, Reconciler};

use crate::cli::{GlobalOpts, IoArgs, IoCommand as IoSubcommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct CommandRow {
    #[tabled(rename = "Command")]
    command: String,
    #[tabled(rename = "Payload")]
    payload: String,
    #[tabled(rename = "Reply")]
    reply: String,
}

fn payload_of(command: &IoCommand) -> String {
    serde_json::to_value(command)
        .ok()
        .and_then(|v| v.get("payload").map(ToString::to_string))
        .unwrap_or_default()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: IoArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        IoSubcommand::Write {
            device,
            directives,
            dry_run,
        } => {
            let directives = util::parse_directives(&directives)?;

            if dry_run {
                let plan = kitsync_core::encode(&directives)?;
                let commands = plan.commands();
                let out = output::render_list(
                    &global.output,
                    &commands,
                    |c| CommandRow {
                        command: c.label().into(),
                        payload: payload_of(c),
                        reply: "(dry run)".into(),
                    },
                    |c| c.label().into(),
                )?;
                output::print_output(&out, global.quiet);
                return Ok(());
            }

            let (_, _, client) = config::connect(global)?;
            let reconciler = Reconciler::new(client);
            let report = reconciler
                .write_io(&DeviceId::new(&device), &directives)
                .await?;

            if report.sent.is_empty() {
                if !global.quiet {
                    eprintln!("Nothing to send");
                }
                return Ok(());
            }

            let commands = report.plan.commands();
            let rows: Vec<CommandRow> = commands
                .iter()
                .zip(&report.sent)
                .map(|(command, sent)| CommandRow {
                    command: sent.command.into(),
                    payload: payload_of(command),
                    reply: sent.reply.to_string(),
                })
                .collect();

            let out = match global.output {
                crate::cli::OutputFormat::Table => output::render_table(&rows),
                _ => output::render_single(
                    &global.output,
                    &report,
                    |_| String::new(),
                    |r| {
                        r.sent
                            .iter()
                            .map(|s| s.command)
                            .collect::<Vec<_>>()
                            .join("\n")
                    },
                )?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        IoSubcommand::Outputs {
            device,
            node,
            levels,
        } => {
            let mut per_node = IndexMap::new();
            for raw in &levels {
                let (pin, level) = util::parse_assignment(raw)?;
                per_node.insert(pin, level);
            }
            let mut outputs = NodeOutputs::new();
            outputs.insert(node, per_node);

            let (_, _, client) = config::connect(global)?;
            let ack = Reconciler::new(client)
                .set_node_outputs(&DeviceId::new(&device), &outputs)
                .await?;
            util::print_ack(&ack, global)
        }

        IoSubcommand::Serial {
            device,
            data,
            node,
            encoded,
        } => {
            let device = DeviceId::new(&device);
            let (_, _, client) = config::connect(global)?;
            let reconciler = Reconciler::new(client);

            let ack = match node {
                Some(node) => {
                    reconciler
                        .send_node_serial(&device, &RadioAddress::new(node), &data, encoded)
                        .await?
                }
                None => reconciler.send_serial(&device, &data, encoded).await?,
            };
            util::print_ack(&ack, global)
        }
    }
}
