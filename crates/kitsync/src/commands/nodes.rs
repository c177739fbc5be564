//! Radio node discovery handlers.

use tabled::Tabled;

use kitsync_core::{DeviceId, Discovery, RadioAddress, RadioNode, Reconciler};

use crate::cli::{GlobalOpts, NodesArgs, NodesCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Node ID")]
    node_id: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Gateway")]
    device: String,
}

impl From<&RadioNode> for NodeRow {
    fn from(n: &RadioNode) -> Self {
        Self {
            address: n.address.to_string(),
            node_id: n.node_id.clone().unwrap_or_default(),
            role: n.role.to_string(),
            device: n.device.to_string(),
        }
    }
}

fn discovery_for(no_cache: bool, clear: bool) -> Discovery {
    if no_cache || clear {
        Discovery::Fresh { clear }
    } else {
        Discovery::Cached
    }
}

fn print_nodes(nodes: &[RadioNode], global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(
        &global.output,
        nodes,
        |n| NodeRow::from(n),
        |n| n.address.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(args: NodesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        NodesCommand::List {
            device,
            no_cache,
            clear,
        } => {
            let (_, _, client) = config::connect(global)?;
            let nodes = Reconciler::new(client)
                .list_nodes(&DeviceId::new(&device), discovery_for(no_cache, clear))
                .await?;
            print_nodes(&nodes, global)
        }

        NodesCommand::Find { addrs } => {
            let addrs: Vec<RadioAddress> = addrs.into_iter().map(RadioAddress::new).collect();
            let (_, _, client) = config::connect(global)?;
            let nodes = Reconciler::new(client).find_nodes(&addrs).await?;
            print_nodes(&nodes, global)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_implies_fresh_discovery() {
        assert_eq!(discovery_for(false, false), Discovery::Cached);
        assert_eq!(discovery_for(true, false), Discovery::Fresh { clear: false });
        assert_eq!(discovery_for(false, true), Discovery::Fresh { clear: true });
    }
}
