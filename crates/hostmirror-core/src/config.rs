// ── Runtime poller configuration ──
//
// These types describe *where* to poll and *what* to mirror. They carry
// credential data and timing, but never touch disk. The CLI constructs a
// `PollerConfig` (usually via hostmirror-config) and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Lower bound applied to the poll interval.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

/// Default poll interval when none is configured.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for polling a single remote server.
///
/// `address` and `api_key` are optional here on purpose: a poller built
/// from an incomplete config logs the problem and idles instead of failing.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Server base URL (e.g., `https://tower.local`).
    pub address: Option<Url>,
    /// API key sent with every query.
    pub api_key: Option<SecretString>,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Raw domain ids as entered by the user.
    pub domains: Vec<String>,
}

impl PollerConfig {
    /// Name of the first required field that is missing, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.address.is_none() {
            Some("address")
        } else if self.api_key.is_none() {
            Some("api_key")
        } else {
            None
        }
    }

    /// Clamp a requested interval to [`MIN_POLL_INTERVAL_SECS`].
    pub fn clamp_interval(secs: u64) -> Duration {
        Duration::from_secs(secs.max(MIN_POLL_INTERVAL_SECS))
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            address: None,
            api_key: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            domains: Vec::new(),
        }
    }
}
