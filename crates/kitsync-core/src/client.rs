// ── Device cloud seam ──
//
// The engine only talks to devices through these traits. `CloudClient`
// is the production implementation over `kitsync_api`; tests substitute
// in-memory fakes.

use async_trait::async_trait;
use kitsync_api::{
    DeviceCloudClient, MonitorList, MonitorSpec, MonitorTopic, SciTarget, XbeeQuery,
};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::CloudConfig;
use crate::encode::{IoCommand, NodeCommand};
use crate::error::CoreError;
use crate::model::{ConfigTree, DeviceId, Discovery, RadioAddress, RadioNode};

/// Acknowledgement of an accepted request. Carries the device reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ack {
    pub reply: Value,
}

impl Ack {
    pub fn new(reply: Value) -> Self {
        Self { reply }
    }
}

/// Narrow interface to a device's settings and I/O.
///
/// `radio` selects a node behind the gateway; `None` addresses the device
/// itself.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    async fn fetch_settings(
        &self,
        device: &DeviceId,
        radio: Option<&RadioAddress>,
    ) -> Result<ConfigTree, CoreError>;

    async fn apply_settings(
        &self,
        device: &DeviceId,
        radio: Option<&RadioAddress>,
        settings: &ConfigTree,
    ) -> Result<Ack, CoreError>;

    async fn send_command(&self, device: &DeviceId, command: &IoCommand) -> Result<Ack, CoreError>;

    /// Radios attached to `device`.
    async fn list_nodes(
        &self,
        device: &DeviceId,
        discovery: Discovery,
    ) -> Result<Vec<RadioNode>, CoreError>;

    /// Cached radios with the given addresses, on any gateway.
    async fn find_nodes(&self, addrs: &[RadioAddress]) -> Result<Vec<RadioNode>, CoreError>;
}

/// Push monitor management.
#[async_trait]
pub trait MonitorClient: Send + Sync {
    async fn list_monitors(
        &self,
        topic: &MonitorTopic,
        endpoint: &str,
    ) -> Result<MonitorList, CoreError>;

    async fn create_monitor(&self, spec: &MonitorSpec) -> Result<Value, CoreError>;

    async fn kick_monitor(
        &self,
        monitor_id: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<Value, CoreError>;
}

// ── Production client ────────────────────────────────────────────────

/// [`DeviceClient`] and [`MonitorClient`] over the device cloud web services.
pub struct CloudClient {
    api: DeviceCloudClient,
    cache: bool,
}

impl CloudClient {
    /// Build a client from runtime configuration.
    pub fn connect(config: &CloudConfig) -> Result<Self, CoreError> {
        let api = DeviceCloudClient::new(
            config.url.clone(),
            config.username.clone(),
            config.password.clone(),
            &config.transport(),
        )?;
        debug!(url = %config.url, user = %config.username, "device cloud client ready");
        Ok(Self::from_api(api))
    }

    pub fn from_api(api: DeviceCloudClient) -> Self {
        Self { api, cache: false }
    }

    /// Answer settings queries from the cloud's cached copy instead of
    /// contacting the device.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn api(&self) -> &DeviceCloudClient {
        &self.api
    }
}

fn target_for(radio: Option<&RadioAddress>) -> SciTarget {
    radio.map_or(SciTarget::Gateway, |addr| SciTarget::radio(addr.as_str()))
}

#[async_trait]
impl DeviceClient for CloudClient {
    async fn fetch_settings(
        &self,
        device: &DeviceId,
        radio: Option<&RadioAddress>,
    ) -> Result<ConfigTree, CoreError> {
        let settings = self
            .api
            .get_settings(device.as_str(), &target_for(radio), self.cache)
            .await?;
        Ok(ConfigTree::from_reply(&settings))
    }

    async fn apply_settings(
        &self,
        device: &DeviceId,
        radio: Option<&RadioAddress>,
        settings: &ConfigTree,
    ) -> Result<Ack, CoreError> {
        let reply = self
            .api
            .set_settings(device.as_str(), &target_for(radio), &settings.to_json_map())
            .await?;
        Ok(Ack::new(reply))
    }

    async fn send_command(&self, device: &DeviceId, command: &IoCommand) -> Result<Ack, CoreError> {
        let device = device.as_str();
        let reply = match command {
            IoCommand::SetOutput(bits) => {
                self.api
                    .set_output(device, &bits.enable_hex(), &bits.level_hex())
                    .await?
            }
            IoCommand::SetSettings(group) => {
                self.api
                    .set_settings(device, &SciTarget::Gateway, &group.to_tree().to_json_map())
                    .await?
            }
            IoCommand::SendSerial(payload) => {
                self.api.send_serial_data(device, payload.as_str()).await?
            }
            IoCommand::Gateway(commands) => {
                let commands: Vec<_> = commands.iter().map(NodeCommand::to_gateway).collect();
                self.api.send_gateway_commands(device, &commands).await?
            }
        };
        Ok(Ack::new(reply))
    }

    async fn list_nodes(
        &self,
        device: &DeviceId,
        discovery: Discovery,
    ) -> Result<Vec<RadioNode>, CoreError> {
        let (cache, clear) = match discovery {
            Discovery::Cached => (true, false),
            Discovery::Fresh { clear } => (false, clear),
        };
        let query = XbeeQuery {
            cache,
            clear,
            ..XbeeQuery::for_device(device.as_str())
        };
        let list = self.api.list_xbees(&query).await?;
        Ok(list.items.into_iter().map(RadioNode::from).collect())
    }

    async fn find_nodes(&self, addrs: &[RadioAddress]) -> Result<Vec<RadioNode>, CoreError> {
        let query = XbeeQuery::for_addrs(addrs.iter().map(|a| a.as_str().to_owned()).collect());
        let list = self.api.list_xbees(&query).await?;
        Ok(list.items.into_iter().map(RadioNode::from).collect())
    }
}

#[async_trait]
impl MonitorClient for CloudClient {
    async fn list_monitors(
        &self,
        topic: &MonitorTopic,
        endpoint: &str,
    ) -> Result<MonitorList, CoreError> {
        Ok(self.api.list_monitors(topic, endpoint).await?)
    }

    async fn create_monitor(&self, spec: &MonitorSpec) -> Result<Value, CoreError> {
        Ok(self.api.create_monitor(spec).await?)
    }

    async fn kick_monitor(
        &self,
        monitor_id: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<Value, CoreError> {
        Ok(self.api.kick_monitor(monitor_id, username, password).await?)
    }
}
