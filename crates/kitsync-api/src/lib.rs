//! Async Rust client for the device-cloud web services.
//!
//! Two API surfaces are covered:
//!
//! - **SCI** (`/ws/sci`): server command interface requests forwarded to a
//!   gateway or one of its radios: settings queries and writes, digital
//!   output changes, and serial data sends. Built by [`SciRequest`] and sent
//!   with [`DeviceCloudClient::send_sci`].
//!
//! - **Monitors** (`/ws/Monitor`): push monitor provisioning: listing,
//!   creating, and re-activating ("kicking") HTTP push monitors.
//!
//! - **Radio inventory** (`/ws/XbeeCore`): the radio nodes behind each
//!   gateway, from the cloud's cache or a fresh discovery.
//!
//! The device cloud answers most device-side failures with HTTP 200 and an
//! `error` element buried in the reply; [`DeviceCloudClient`] surfaces those
//! as [`Error::DeviceReported`] so callers never have to inspect bodies.

pub mod client;
pub mod error;
pub mod monitor;
pub mod sci;
pub mod transport;
pub mod xbee;

pub use client::DeviceCloudClient;
pub use error::Error;
pub use monitor::{Monitor, MonitorList, MonitorSpec, MonitorTopic};
pub use sci::{
    GatewayCommand, SciRequest, SciTarget, contains_error_key, lookup_path, settings_from_reply,
};
pub use transport::{TlsMode, TransportConfig};
pub use xbee::{XbeeList, XbeeNode, XbeeQuery};
