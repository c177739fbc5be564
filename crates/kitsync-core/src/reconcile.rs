// ── Reconciler ──
//
// Drives a `DeviceClient` through node discovery and the write,
// settings, and stock-sync flows. All input is encoded and validated before the first request, so
// a rejected request never reaches the device.

use kitsync_api::MonitorTopic;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{Ack, DeviceClient, MonitorClient};
use crate::config::MonitorCredentials;
use crate::diff::{diff, diff_against_stock};
use crate::directive::Directives;
use crate::encode::{
    IoCommand, IoPlan, NodeCommand, NodeOutputs, encode, encode_node_outputs, encode_serial,
};
use crate::error::CoreError;
use crate::model::{ConfigDelta, ConfigTree, DeviceId, Discovery, RadioAddress, RadioNode};
use crate::monitor::{MonitorOutcome, ensure_monitor};

/// A command that was sent, with the device's reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentCommand {
    pub command: &'static str,
    pub reply: Value,
}

/// Result of a directive write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IoReport {
    pub plan: IoPlan,
    pub sent: Vec<SentCommand>,
}

/// Live settings of a radio next to what stock would change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockReport {
    pub current: ConfigTree,
    pub delta: ConfigDelta,
}

impl StockReport {
    pub fn is_compliant(&self) -> bool {
        self.delta.is_empty()
    }
}

/// Result of a sync against a target configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Nothing to write.
    Compliant,
    /// `delta` was written; `reply` is the device's answer.
    Applied { delta: ConfigDelta, reply: Value },
}

/// Reconciliation facade over a device client.
pub struct Reconciler<C> {
    client: C,
}

impl<C> Reconciler<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: DeviceClient> Reconciler<C> {
    // ── Nodes ────────────────────────────────────────────────────────

    /// Radios behind a gateway. Their addresses feed every radio-scoped
    /// operation below.
    pub async fn list_nodes(
        &self,
        device: &DeviceId,
        discovery: Discovery,
    ) -> Result<Vec<RadioNode>, CoreError> {
        if device.is_empty() {
            return Err(CoreError::invalid("device", "no device ID given"));
        }
        if matches!(discovery, Discovery::Fresh { .. }) {
            info!(device = %device, ?discovery, "running node discovery");
        }
        self.client.list_nodes(device, discovery).await
    }

    /// Look radios up by extended address across the account.
    pub async fn find_nodes(&self, addrs: &[RadioAddress]) -> Result<Vec<RadioNode>, CoreError> {
        if addrs.is_empty() {
            return Err(CoreError::invalid("addrs", "no radio addresses given"));
        }
        self.client.find_nodes(addrs).await
    }

    // ── I/O ──────────────────────────────────────────────────────────

    /// Encode a write request without sending it.
    pub fn plan(&self, directives: &Directives) -> Result<IoPlan, CoreError> {
        encode(directives)
    }

    /// Encode and send a directive write. An empty request sends nothing.
    pub async fn write_io(
        &self,
        device: &DeviceId,
        directives: &Directives,
    ) -> Result<IoReport, CoreError> {
        let plan = encode(directives)?;
        let mut sent = Vec::new();

        for command in plan.commands() {
            debug!(device = %device, command = command.label(), "sending I/O command");
            let ack = self.client.send_command(device, &command).await?;
            sent.push(SentCommand {
                command: command.label(),
                reply: ack.reply,
            });
        }

        Ok(IoReport { plan, sent })
    }

    /// Set digital outputs on radios behind a gateway.
    pub async fn set_node_outputs(
        &self,
        device: &DeviceId,
        outputs: &NodeOutputs,
    ) -> Result<Ack, CoreError> {
        let commands = encode_node_outputs(outputs)?;
        self.client
            .send_command(device, &IoCommand::Gateway(commands))
            .await
    }

    /// Send data out of the device's own serial port.
    pub async fn send_serial(
        &self,
        device: &DeviceId,
        data: &str,
        already_encoded: bool,
    ) -> Result<Ack, CoreError> {
        let payload = encode_serial(data, already_encoded)?;
        self.client
            .send_command(device, &IoCommand::SendSerial(payload))
            .await
    }

    /// Send data out of a gateway-attached radio's serial port.
    pub async fn send_node_serial(
        &self,
        device: &DeviceId,
        node: &RadioAddress,
        data: &str,
        already_encoded: bool,
    ) -> Result<Ack, CoreError> {
        let command = NodeCommand::SendSerial {
            addr: node.clone(),
            data: encode_serial(data, already_encoded)?,
        };
        self.client
            .send_command(device, &IoCommand::Gateway(vec![command]))
            .await
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub async fn fetch_settings(
        &self,
        device: &DeviceId,
        radio: Option<&RadioAddress>,
    ) -> Result<ConfigTree, CoreError> {
        self.client.fetch_settings(device, radio).await
    }

    /// Write a settings tree. Empty trees are rejected.
    pub async fn apply_settings(
        &self,
        device: &DeviceId,
        radio: Option<&RadioAddress>,
        settings: &ConfigTree,
    ) -> Result<Ack, CoreError> {
        if settings.is_empty() {
            return Err(CoreError::invalid("settings", "no settings given"));
        }
        info!(device = %device, entries = settings.len(), "applying settings");
        self.client.apply_settings(device, radio, settings).await
    }

    /// Validate a caller-supplied JSON tree, then write it.
    pub async fn apply_settings_json(
        &self,
        device: &DeviceId,
        radio: Option<&RadioAddress>,
        settings: &Value,
    ) -> Result<Ack, CoreError> {
        let tree = ConfigTree::from_json(settings)?;
        self.apply_settings(device, radio, &tree).await
    }

    // ── Sync ─────────────────────────────────────────────────────────

    /// Bring a device in line with `target`, writing only the delta.
    pub async fn sync_to(
        &self,
        device: &DeviceId,
        radio: Option<&RadioAddress>,
        target: &ConfigTree,
    ) -> Result<SyncOutcome, CoreError> {
        let current = self.client.fetch_settings(device, radio).await?;
        self.apply_delta(device, radio, diff(&current, target)).await
    }

    /// Current radio settings and the stock delta, without writing.
    pub async fn stock_report(
        &self,
        device: &DeviceId,
        radio: &RadioAddress,
    ) -> Result<StockReport, CoreError> {
        let current = self.client.fetch_settings(device, Some(radio)).await?;
        let delta = diff_against_stock(&current);
        Ok(StockReport { current, delta })
    }

    /// Bring a radio in line with the stock kit configuration.
    pub async fn apply_stock(
        &self,
        device: &DeviceId,
        radio: &RadioAddress,
    ) -> Result<SyncOutcome, CoreError> {
        let current = self.client.fetch_settings(device, Some(radio)).await?;
        self.apply_delta(device, Some(radio), diff_against_stock(&current))
            .await
    }

    async fn apply_delta(
        &self,
        device: &DeviceId,
        radio: Option<&RadioAddress>,
        delta: ConfigDelta,
    ) -> Result<SyncOutcome, CoreError> {
        if delta.is_empty() {
            debug!(device = %device, "already compliant");
            return Ok(SyncOutcome::Compliant);
        }

        info!(device = %device, entries = delta.len(), "applying configuration delta");
        let ack = self.client.apply_settings(device, radio, &delta).await?;
        Ok(SyncOutcome::Applied {
            delta,
            reply: ack.reply,
        })
    }
}

impl<C: MonitorClient> Reconciler<C> {
    /// Create or re-activate the push monitor for `topic`.
    pub async fn ensure_monitor(
        &self,
        topic: MonitorTopic,
        endpoint: &str,
        credentials: &MonitorCredentials,
    ) -> Result<MonitorOutcome, CoreError> {
        ensure_monitor(&self.client, topic, endpoint, credentials).await
    }
}
