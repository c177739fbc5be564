//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use kitsync_config::ConfigError;
use kitsync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const DEVICE: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INACTIVE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the device cloud")]
    #[diagnostic(
        code(kitsync::connection_failed),
        help(
            "Check the cloud URL and your network connection.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(kitsync::auth_failed),
        help(
            "Verify your user name and password.\n\
             Run: kitsync config set-password"
        )
    )]
    AuthFailed,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(kitsync::no_credentials),
        help(
            "Configure credentials with: kitsync config init\n\
             Or set KITSYNC_USERNAME and KITSYNC_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    #[error("No push monitor credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(kitsync::no_monitor_credentials),
        help(
            "Set monitor_username in the profile, then run:\n\
             kitsync config set-password --monitor"
        )
    )]
    NoMonitorCredentials { profile: String },

    // ── Device cloud ─────────────────────────────────────────────────
    #[error("Device cloud request failed (HTTP {status}): {message}")]
    #[diagnostic(code(kitsync::http), help("Response body:\n{body}"))]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    #[error("Device rejected the request: {message}")]
    #[diagnostic(
        code(kitsync::device_error),
        help("Device reply:\n{body}")
    )]
    DeviceRejected { message: String, body: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(kitsync::timeout),
        help("Increase timeout with --timeout or check that the device is online.")
    )]
    Timeout { seconds: u64 },

    // ── Input ────────────────────────────────────────────────────────
    #[error("Invalid directive '{name}': {reason}")]
    #[diagnostic(
        code(kitsync::invalid_directive),
        help(
            "Recognized names: DIO<n>, serial, and AT settings such as M0, IC, LT.\n\
             Levels accept high/low, on/off, true/false, 1/0."
        )
    )]
    InvalidDirective { name: String, reason: String },

    #[error("Malformed push batch: {message}")]
    #[diagnostic(
        code(kitsync::malformed_push),
        help("Expected {{\"Document\": {{\"Msg\": ...}}}} with a topic on every message.")
    )]
    MalformedPush { message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(kitsync::validation))]
    Validation { field: String, reason: String },

    #[error("Push batch would be answered as inactive (HTTP {status})")]
    #[diagnostic(
        code(kitsync::inactive),
        help("No registered device received an event. Pass --device for each listener.")
    )]
    Inactive { status: u16 },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(kitsync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: kitsync config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(kitsync::no_config),
        help(
            "Create one with: kitsync config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(kitsync::config))]
    Config { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(kitsync::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(kitsync::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed
            | Self::NoCredentials { .. }
            | Self::NoMonitorCredentials { .. } => exit_code::AUTH,
            Self::Http { status: 404, .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::DeviceRejected { .. } => exit_code::DEVICE,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::InvalidDirective { .. }
            | Self::MalformedPush { .. }
            | Self::Validation { .. }
            | Self::Json(_) => exit_code::USAGE,
            Self::Inactive { .. } => exit_code::INACTIVE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidDirective { name, reason } => {
                CliError::InvalidDirective { name, reason }
            }

            CoreError::MalformedPush { message } => CliError::MalformedPush { message },

            CoreError::UpstreamFailure {
                status: Some(401 | 403),
                ..
            } => CliError::AuthFailed,

            CoreError::UpstreamFailure {
                message,
                status: Some(status),
                body,
            } => CliError::Http {
                status,
                message,
                body,
            },

            CoreError::UpstreamFailure {
                message,
                status: None,
                body,
            } => CliError::DeviceRejected { message, body },

            CoreError::UpstreamUnavailable { reason } => CliError::ConnectionFailed { reason },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
