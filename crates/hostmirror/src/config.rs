//! CLI configuration: thin wrapper around `hostmirror_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--config, --address, --api-key, --insecure, --domains).

use std::path::PathBuf;

use secrecy::SecretString;

use hostmirror_core::{PollerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use hostmirror_config::{Config, config_path, load_config_from, save_config};

/// Config file in effect: `--config` or the platform default.
pub fn active_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config file and apply flag overrides to it.
pub fn load(global: &GlobalOpts, domains: &[String]) -> Result<Config, CliError> {
    let mut cfg = load_config_from(&active_path(global))?;
    if let Some(ref address) = global.address {
        cfg.server.address = Some(address.clone());
    }
    if global.insecure {
        cfg.server.insecure = true;
    }
    if !domains.is_empty() {
        cfg.domains = domains.to_vec();
    }
    Ok(cfg)
}

/// Translate a loaded config into a `PollerConfig`.
///
/// `--api-key` wins over the credential chain.
pub fn poller_config(cfg: &Config, global: &GlobalOpts) -> Result<PollerConfig, CliError> {
    let mut poller = cfg.to_poller_config()?;
    if let Some(ref key) = global.api_key {
        poller.api_key = Some(SecretString::from(key.clone()));
    }
    if global.insecure {
        poller.tls = TlsVerification::DangerAcceptInvalid;
    }
    Ok(poller)
}

/// Fail with a helpful diagnostic when address or key are missing.
pub fn require_complete(poller: &PollerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    match poller.missing_field() {
        Some(field) => Err(CliError::MissingConfig {
            field: field.into(),
            path: active_path(global).display().to_string(),
        }),
        None => Ok(()),
    }
}
