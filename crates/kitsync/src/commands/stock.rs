//! Stock kit configuration handlers.

use kitsync_core::stock::at_code_for_pin;
use kitsync_core::{
    ConfigTree, DeviceId, RadioAddress, Reconciler, diff_against_stock, stock_config,
};

use crate::cli::{GlobalOpts, StockArgs, StockCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::{settings, util};

fn print_delta(delta: &ConfigTree, global: &GlobalOpts) -> Result<(), CliError> {
    if delta.is_empty() && matches!(global.output, crate::cli::OutputFormat::Table) {
        output::print_output("Radio matches the stock configuration", global.quiet);
        return Ok(());
    }
    let out = output::render_tree(&global.output, delta)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(args: StockArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        StockCommand::Show => {
            let out = output::render_tree(&global.output, stock_config())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        StockCommand::Diff { device, radio } => {
            let (_, _, client) = config::connect(global)?;
            let report = Reconciler::new(client)
                .stock_report(&DeviceId::new(&device), &RadioAddress::new(radio))
                .await?;

            match global.output {
                crate::cli::OutputFormat::Table | crate::cli::OutputFormat::Plain => {
                    print_delta(&report.delta, global)
                }
                _ => {
                    let out = output::render_single(
                        &global.output,
                        &report,
                        |_| String::new(),
                        |_| String::new(),
                    )?;
                    output::print_output(&out, global.quiet);
                    Ok(())
                }
            }
        }

        StockCommand::Apply { device, radio } => {
            if !util::confirm(
                &format!("Apply the stock configuration to radio {radio} on {device}?"),
                global.yes,
            )? {
                return Ok(());
            }
            let (_, _, client) = config::connect(global)?;
            let outcome = Reconciler::new(client)
                .apply_stock(&DeviceId::new(&device), &RadioAddress::new(radio))
                .await?;
            settings::print_sync_outcome(&outcome, global)
        }

        StockCommand::DiffFile { path } => {
            let current = ConfigTree::from_json(&util::read_json_file(&path)?)?;
            print_delta(&diff_against_stock(&current), global)
        }

        StockCommand::Pin { name } => {
            let code = at_code_for_pin(&name).ok_or_else(|| CliError::Validation {
                field: "pin".into(),
                reason: format!("'{name}' is not one of DIO0..DIO19"),
            })?;
            output::print_output(&code, global.quiet);
            Ok(())
        }
    }
}
