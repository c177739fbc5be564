//! CLI configuration: thin wrapper around `kitsync_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--cloud, --username, etc.).

use std::time::Duration;

use secrecy::SecretString;

use kitsync_core::{CloudClient, CloudConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use kitsync_config::{
    Config, Defaults, Profile, SecretKind, config_path, load_config_or_default, save_config,
    store_secret,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Translate a `Profile` + global flags into a `CloudConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<CloudConfig, CliError> {
    let mut effective = profile.clone();
    if let Some(ref cloud) = global.cloud {
        effective.cloud.clone_from(cloud);
    }
    if let Some(ref username) = global.username {
        effective.username = Some(username.clone());
    }
    if global.insecure {
        effective.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        effective.timeout = Some(timeout);
    }

    // --password bypasses env and keyring lookup entirely
    let Some(ref password) = global.password else {
        return Ok(kitsync_config::profile_to_cloud_config(&effective, profile_name)?);
    };

    let url = kitsync_config::parse_cloud_url(&effective.cloud)?;
    let username = kitsync_config::resolve_username(&effective, profile_name)?;
    let mut config = CloudConfig::new(url, username, SecretString::from(password.clone()));
    config.tls = kitsync_config::tls_for(&effective);
    config.timeout = Duration::from_secs(effective.timeout.unwrap_or(30));
    config.monitor = kitsync_config::resolve_monitor_credentials(&effective, profile_name)?;
    Ok(config)
}

/// Build a `CloudConfig` from the config file, profile, and CLI overrides.
pub fn build_cloud_config(global: &GlobalOpts) -> Result<(String, CloudConfig), CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        let config = resolve_profile(profile, &profile_name, global)?;
        return Ok((profile_name, config));
    }

    // An explicitly requested profile must exist
    if global.profile.is_some() {
        let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
        available.sort();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        });
    }

    // No profile: build from flags and env vars alone
    if global.username.is_none() && std::env::var("KITSYNC_USERNAME").is_err() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }
    let config = resolve_profile(&Profile::default(), &profile_name, global)?;
    Ok((profile_name, config))
}

/// Connect a cloud client using the resolved configuration.
pub fn connect(global: &GlobalOpts) -> Result<(String, CloudConfig, CloudClient), CliError> {
    let (profile_name, config) = build_cloud_config(global)?;
    tracing::debug!(
        profile = %profile_name,
        url = %config.url,
        insecure = config.tls == TlsVerification::DangerAcceptInvalid,
        "connecting to device cloud"
    );
    let client = CloudClient::connect(&config)?;
    Ok((profile_name, config, client))
}
