//! Settings command handlers.

use kitsync_core::{ConfigTree, DeviceId, RadioAddress, Reconciler, SyncOutcome};

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

/// Print a sync result: the written delta, or a compliance note.
pub fn print_sync_outcome(outcome: &SyncOutcome, global: &GlobalOpts) -> Result<(), CliError> {
    let out = match (outcome, &global.output) {
        (SyncOutcome::Compliant, crate::cli::OutputFormat::Table) => {
            "Already compliant; nothing written".to_owned()
        }
        (SyncOutcome::Applied { delta, .. }, crate::cli::OutputFormat::Table) => {
            output::render_tree(&global.output, delta)?
        }
        (_, format) => output::render_single(
            format,
            outcome,
            |_| String::new(),
            |o| match o {
                SyncOutcome::Compliant => "compliant".into(),
                SyncOutcome::Applied { delta, .. } => format!("applied {}", delta.len()),
            },
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(args: SettingsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SettingsCommand::Get {
            device,
            radio,
            cache,
        } => {
            let (_, _, client) = config::connect(global)?;
            let reconciler = Reconciler::new(client.with_cache(cache));
            let radio = radio.map(RadioAddress::new);
            let tree = reconciler
                .fetch_settings(&DeviceId::new(&device), radio.as_ref())
                .await?;
            let out = output::render_tree(&global.output, &tree)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SettingsCommand::Set {
            device,
            radio,
            from_file,
        } => {
            let settings = util::read_json_file(&from_file)?;
            // Validate before prompting or connecting
            let tree = ConfigTree::from_json(&settings)?;
            if !util::confirm(
                &format!("Write {} setting(s) to {device}?", tree.len()),
                global.yes,
            )? {
                return Ok(());
            }

            let (_, _, client) = config::connect(global)?;
            let radio = radio.map(RadioAddress::new);
            let ack = Reconciler::new(client)
                .apply_settings(&DeviceId::new(&device), radio.as_ref(), &tree)
                .await?;
            util::print_ack(&ack, global)
        }

        SettingsCommand::Sync {
            device,
            radio,
            from_file,
        } => {
            let target = ConfigTree::from_json(&util::read_json_file(&from_file)?)?;
            let (_, _, client) = config::connect(global)?;
            let radio = radio.map(RadioAddress::new);
            let outcome = Reconciler::new(client)
                .sync_to(&DeviceId::new(&device), radio.as_ref(), &target)
                .await?;
            print_sync_outcome(&outcome, global)
        }
    }
}
