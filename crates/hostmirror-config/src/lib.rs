//! Configuration for hostmirror.
//!
//! A TOML file merged with defaults and `HOSTMIRROR_` environment
//! variables, API-key resolution (env var, then keyring, then plaintext),
//! and translation to `hostmirror_core::PollerConfig`.

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
use tracing::warn;

use hostmirror_core::config::DEFAULT_POLL_INTERVAL_SECS;
use hostmirror_core::{Catalog, MIN_POLL_INTERVAL_SECS, PollerConfig, TlsVerification};

const KEYRING_SERVICE: &str = "hostmirror";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured")]
    NoCredentials,

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Raw domain ids to mirror. Empty means the catalog defaults.
    #[serde(default)]
    pub domains: Vec<String>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub poll: PollSettings,

    #[serde(default)]
    pub state: StateSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server base URL (e.g., "https://tower.local").
    pub address: Option<String>,

    /// API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: None,
            api_key: None,
            api_key_env: None,
            ca_cert: None,
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollSettings {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StateSettings {
    /// JSON snapshot of the state tree. Defaults to the platform data dir.
    pub path: Option<PathBuf>,

    /// Namespace the mirrored objects live under.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            path: None,
            namespace: default_namespace(),
        }
    }
}

impl StateSettings {
    pub fn snapshot_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_snapshot_path)
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_namespace() -> String {
    "hostmirror.0".into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "hostmirror", "hostmirror")
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("hostmirror");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn default_snapshot_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join("state.json"),
        |dirs| dirs.data_dir().join("state.json"),
    )
}

// ── Loading and saving ──────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` plus environment.
///
/// A missing file is not an error. Environment variables use a double
/// underscore between section and key, e.g. `HOSTMIRROR_SERVER__ADDRESS`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HOSTMIRROR_").split("__"))
        .extract()?;
    Ok(config)
}

/// Serialize to TOML and write to `path`, creating parent directories.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credentials ─────────────────────────────────────────────────────

fn keyring_entry(address: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, &format!("{address}/api-key"))?)
}

/// Resolve the API key: named env var, then system keyring, then plaintext.
pub fn resolve_api_key(server: &ServerConfig) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = server.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Some(ref address) = server.address {
        if let Some(secret) = keyring_entry(address).ok().and_then(|e| e.get_password().ok()) {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(ref key) = server.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials)
}

/// Store an API key for `address` in the system keyring.
pub fn store_api_key(address: &str, secret: &str) -> Result<(), ConfigError> {
    keyring_entry(address)?.set_password(secret)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Configured domain ids the catalog does not know.
    pub fn unknown_domains(&self, catalog: &Catalog) -> Vec<String> {
        self.domains
            .iter()
            .filter(|id| catalog.find_node(id).is_none())
            .cloned()
            .collect()
    }

    /// Build the poller configuration.
    ///
    /// Missing address or key are left empty for the poller to report.
    /// An interval below the minimum is raised to it.
    pub fn to_poller_config(&self) -> Result<PollerConfig, ConfigError> {
        let address = self
            .server
            .address
            .as_deref()
            .map(|raw| {
                url::Url::parse(raw).map_err(|e| ConfigError::Validation {
                    field: "server.address".into(),
                    reason: format!("invalid URL '{raw}': {e}"),
                })
            })
            .transpose()?;

        let api_key = match resolve_api_key(&self.server) {
            Ok(key) => Some(key),
            Err(ConfigError::NoCredentials) => None,
            Err(e) => return Err(e),
        };

        let tls = if self.server.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.server.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        if self.poll.interval_secs < MIN_POLL_INTERVAL_SECS {
            warn!(
                requested = self.poll.interval_secs,
                minimum = MIN_POLL_INTERVAL_SECS,
                "poll interval below minimum, clamping"
            );
        }
        for id in self.unknown_domains(Catalog::builtin()) {
            warn!(domain = %id, "configured domain is not in the catalog");
        }

        Ok(PollerConfig {
            address,
            api_key,
            tls,
            timeout: Duration::from_secs(self.server.timeout),
            interval: PollerConfig::clamp_interval(self.poll.interval_secs),
            domains: self.domains.clone(),
        })
    }
}
