//! Push monitor handlers.

use tabled::Tabled;

use kitsync_core::{Monitor, MonitorClient, MonitorOutcome, MonitorTopic, Reconciler};

use crate::cli::{GlobalOpts, MonitorArgs, MonitorCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct MonitorRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Topic")]
    topic: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
}

impl From<&Monitor> for MonitorRow {
    fn from(m: &Monitor) -> Self {
        Self {
            id: m.id.clone(),
            topic: m.topic.clone(),
            status: m.status.clone().unwrap_or_default(),
            endpoint: m.transport_url.clone().unwrap_or_default(),
        }
    }
}

fn topic_for(device: Option<String>) -> MonitorTopic {
    match device {
        Some(device_id) => MonitorTopic::DataPoint { device_id },
        None => MonitorTopic::DeviceCore,
    }
}

pub async fn handle(args: MonitorArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        MonitorCommand::Ensure { endpoint, device } => {
            let (profile, cloud, client) = config::connect(global)?;
            let credentials = cloud
                .monitor
                .as_ref()
                .ok_or(CliError::NoMonitorCredentials { profile })?;

            let outcome = Reconciler::new(client)
                .ensure_monitor(topic_for(device), &endpoint, credentials)
                .await?;

            let out = output::render_single(
                &global.output,
                &outcome,
                |o| match o {
                    MonitorOutcome::Created { .. } => format!("Created monitor for {endpoint}"),
                    MonitorOutcome::Kicked { monitor, listing } => format!(
                        "Re-activated monitor {} ({} found for {endpoint})",
                        monitor.id,
                        listing.items.len()
                    ),
                },
                |o| match o {
                    MonitorOutcome::Created { .. } => "created".into(),
                    MonitorOutcome::Kicked { monitor, .. } => monitor.id.clone(),
                },
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MonitorCommand::List { endpoint, device } => {
            let (_, _, client) = config::connect(global)?;
            let listing = client.list_monitors(&topic_for(device), &endpoint).await?;
            let out = output::render_list(
                &global.output,
                &listing.items,
                |m| MonitorRow::from(m),
                |m| m.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
