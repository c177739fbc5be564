//! Shared configuration for kitsync front ends.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `kitsync_core::CloudConfig`. The CLI layers its own
//! flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kitsync_core::{CloudConfig, MonitorCredentials, TlsVerification};

/// Keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "kitsync";

/// Public device cloud, used when a profile names none.
pub const DEFAULT_CLOUD: &str = "https://devicecloud.digi.com";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device cloud accounts.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named device cloud account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Cloud base URL.
    #[serde(default = "default_cloud")]
    pub cloud: String,

    /// Account user name.
    pub username: Option<String>,

    /// Account password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable holding the account password.
    pub password_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Basic-auth user the cloud presents when pushing to us.
    pub monitor_username: Option<String>,

    /// Push password (plaintext, prefer keyring).
    pub monitor_password: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            cloud: default_cloud(),
            username: None,
            password: None,
            password_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            monitor_username: None,
            monitor_password: None,
        }
    }
}

fn default_cloud() -> String {
    DEFAULT_CLOUD.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "kitsync", "kitsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("kitsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, layered over defaults and under
/// `KITSYNC_`-prefixed environment variables (`KITSYNC_DEFAULTS__TIMEOUT=60`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("KITSYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Keyring ─────────────────────────────────────────────────────────

/// Which secret of a profile is stored in the keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Password,
    MonitorPassword,
}

impl SecretKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::MonitorPassword => "monitor-password",
        }
    }
}

fn keyring_user(profile_name: &str, kind: SecretKind) -> String {
    format!("{profile_name}/{}", kind.suffix())
}

fn keyring_lookup(profile_name: &str, kind: SecretKind) -> Option<SecretString> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name, kind))
        .ok()?
        .get_password()
        .ok()
        .map(SecretString::from)
}

/// Store a secret in the system keyring.
pub fn store_secret(profile_name: &str, kind: SecretKind, secret: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name, kind))
        .and_then(|entry| entry.set_password(secret))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the account user name: profile, then `KITSYNC_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var("KITSYNC_USERNAME").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Resolve the account password without CLI flags.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(val) = profile
        .password_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(SecretString::from(val));
    }

    // 2. Well-known env var
    if let Ok(pw) = std::env::var("KITSYNC_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if let Some(secret) = keyring_lookup(profile_name, SecretKind::Password) {
        return Ok(secret);
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve push monitor credentials. `None` when the profile has no
/// monitor user configured.
pub fn resolve_monitor_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<MonitorCredentials>, ConfigError> {
    let Some(username) = profile.monitor_username.clone() else {
        return Ok(None);
    };

    let password = std::env::var("KITSYNC_MONITOR_PASSWORD")
        .ok()
        .map(SecretString::from)
        .or_else(|| keyring_lookup(profile_name, SecretKind::MonitorPassword))
        .or_else(|| profile.monitor_password.clone().map(SecretString::from))
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    Ok(Some(MonitorCredentials { username, password }))
}

/// TLS mode for a profile: insecure wins, then a custom CA, else system roots.
pub fn tls_for(profile: &Profile) -> TlsVerification {
    if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Parse and validate a cloud base URL.
pub fn parse_cloud_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "cloud".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "cloud".into(),
            reason: format!("expected an http(s) URL, got '{raw}'"),
        });
    }
    Ok(url)
}

/// Build a `CloudConfig` from a profile, with no CLI flag overrides.
pub fn profile_to_cloud_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<CloudConfig, ConfigError> {
    let url = parse_cloud_url(&profile.cloud)?;
    let username = resolve_username(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;

    let mut config = CloudConfig::new(url, username, password);
    config.tls = tls_for(profile);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout));
    config.monitor = resolve_monitor_credentials(profile, profile_name)?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert_eq!(config.defaults.output, "table");
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn profiles_load_from_toml() {
        let (_dir, path) = write_config(
            r#"
default_profile = "lab"

[defaults]
output = "json"

[profiles.lab]
cloud = "https://devicecloud-uk.digi.com"
username = "kit-user"
password = "kit-pass"
timeout = 10
monitor_username = "pusher"
monitor_password = "push-pass"
"#,
        );
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("lab"));
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.timeout, 30);

        let lab = &config.profiles["lab"];
        assert_eq!(lab.cloud, "https://devicecloud-uk.digi.com");
        assert_eq!(lab.timeout, Some(10));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                username: Some("kit-user".into()),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"].cloud, DEFAULT_CLOUD);
        assert_eq!(loaded.profiles["default"].username.as_deref(), Some("kit-user"));
    }

    #[test]
    fn profile_translates_to_cloud_config() {
        let profile = Profile {
            username: Some("kit-user".into()),
            password: Some("kit-pass".into()),
            password_env: Some("KITSYNC_TEST_UNSET_PASSWORD_VAR".into()),
            timeout: Some(12),
            ca_cert: Some(PathBuf::from("/etc/kit/ca.pem")),
            ..Profile::default()
        };
        let config = profile_to_cloud_config(&profile, "kitsync-test-profile").unwrap();
        assert_eq!(config.url.as_str(), "https://devicecloud.digi.com/");
        assert_eq!(config.username, "kit-user");
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.tls, TlsVerification::CustomCa("/etc/kit/ca.pem".into()));
        assert!(config.monitor.is_none());
    }

    #[test]
    fn insecure_beats_custom_ca() {
        let profile = Profile {
            insecure: Some(true),
            ca_cert: Some(PathBuf::from("/etc/kit/ca.pem")),
            ..Profile::default()
        };
        assert_eq!(tls_for(&profile), TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn monitor_credentials_need_a_password() {
        let profile = Profile {
            monitor_username: Some("pusher".into()),
            monitor_password: Some("push-pass".into()),
            ..Profile::default()
        };
        let creds = resolve_monitor_credentials(&profile, "kitsync-test-profile")
            .unwrap()
            .unwrap();
        assert_eq!(creds.username, "pusher");
        assert_eq!(creds.password.expose_secret(), "push-pass");
    }

    #[test]
    fn bad_cloud_urls_are_rejected() {
        assert!(matches!(
            parse_cloud_url("devicecloud"),
            Err(ConfigError::Validation { .. })
        ));
        assert!(parse_cloud_url("ftp://devicecloud.digi.com").is_err());
    }
}
