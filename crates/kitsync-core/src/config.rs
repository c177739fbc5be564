// ── Runtime connection configuration ──
//
// These types describe *how* to reach the device cloud. They carry
// credential data and connection tuning, but never touch disk.
// The CLI constructs a `CloudConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default for the public cloud.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification.
    DangerAcceptInvalid,
}

/// Basic-auth credentials the cloud presents when pushing to our endpoint.
#[derive(Debug, Clone)]
pub struct MonitorCredentials {
    pub username: String,
    pub password: SecretString,
}

/// Configuration for talking to one device-cloud account.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// Cloud base URL (e.g., `https://devicecloud.digi.com`).
    pub url: Url,
    /// Account user name.
    pub username: String,
    /// Account password.
    pub password: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Push monitor credentials, needed only for monitor provisioning.
    pub monitor: Option<MonitorCredentials>,
}

impl CloudConfig {
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            monitor: None,
        }
    }

    pub(crate) fn transport(&self) -> kitsync_api::TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => kitsync_api::TlsMode::System,
            TlsVerification::CustomCa(path) => kitsync_api::TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => kitsync_api::TlsMode::DangerAcceptInvalid,
        };
        kitsync_api::TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
