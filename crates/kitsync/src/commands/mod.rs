//! Command dispatch: bridges CLI args -> engine operations -> output formatting.

pub mod config_cmd;
pub mod io;
pub mod monitor;
pub mod nodes;
pub mod push;
pub mod settings;
pub mod stock;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to its handler. Handlers connect to the cloud only
/// when they need to, so offline commands work without a profile.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Io(args) => io::handle(args, global).await,
        Command::Nodes(args) => nodes::handle(args, global).await,
        Command::Settings(args) => settings::handle(args, global).await,
        Command::Stock(args) => stock::handle(args, global).await,
        Command::Push(args) => push::handle(args, global),
        Command::Monitor(args) => monitor::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Err(CliError::Internal(
            "completions are generated before dispatch".into(),
        )),
    }
}
