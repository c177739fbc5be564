//! Device reconciliation engine between `kitsync-api` and its consumers.
//!
//! This crate owns the logic that turns loosely-typed user input and push
//! callbacks into protocol-ready payloads:
//!
//! - **Directive classification** ([`directive`]): normalises directive
//!   names and sorts them into digital pins, raw two-character settings, and
//!   serial chunks.
//!
//! - **I/O command encoding** ([`encode`]): collapses classified directives
//!   into at most three commands: a [`BitCommand`] enable/level mask pair, one
//!   [`SettingGroup`], and one base64 serial payload.
//!
//! - **Configuration diffing** ([`diff`]): computes the minimal
//!   [`ConfigDelta`] that brings a device's live settings in line with a
//!   canonical target such as the built-in [`stock`] kit configuration.
//!
//! - **Push routing** ([`push`]): splits push topics, extracts routing keys,
//!   fans events out to a [`HandlerRegistry`], and yields a
//!   [`LivenessVerdict`] for the monitor.
//!
//! - **[`Reconciler`]**: facade that drives a [`DeviceClient`] through
//!   node discovery, write, report, and stock-sync flows. Bad input is
//!   rejected before any device is contacted.

pub mod client;
pub mod config;
pub mod diff;
pub mod directive;
pub mod encode;
pub mod error;
pub mod model;
pub mod monitor;
pub mod push;
pub mod reconcile;
pub mod stock;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{Ack, CloudClient, DeviceClient, MonitorClient};
pub use config::{CloudConfig, MonitorCredentials, TlsVerification};
pub use diff::{diff, diff_against_stock};
pub use directive::{Directive, DirectiveKind, Directives, classify, classify_all};
pub use encode::{
    BitCommand, IoCommand, IoPlan, NodeCommand, NodeOutputs, SerialPayload, SettingGroup,
    ValueClass, encode,
};
pub use error::CoreError;
pub use model::{
    ConfigDelta, ConfigTree, DeviceId, Discovery, NodeRole, RadioAddress, RadioNode, SettingValue,
};
pub use monitor::{MonitorOutcome, ensure_monitor};
pub use push::{
    DispatchReport, EventOutcome, HandlerRegistry, LivenessVerdict, PushEvent, PushHandler,
    TopicKind, dispatch_batch,
};
pub use reconcile::{IoReport, Reconciler, SentCommand, StockReport, SyncOutcome};
pub use stock::stock_config;

// Monitor wire types callers need for `ensure_monitor`.
pub use kitsync_api::{Monitor, MonitorList, MonitorTopic};
