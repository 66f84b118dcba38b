// ── Core error types ──
//
// User-facing errors from hostmirror-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<hostmirror_api::Error>`
// impl translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Remote errors ────────────────────────────────────────────────
    #[error("Remote error: {message}")]
    Remote {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Missing required configuration: {field}")]
    MissingConfig { field: &'static str },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid domain catalog: {message}")]
    Catalog { message: String },

    // ── Persistence errors ───────────────────────────────────────────
    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Errors that end a poll cycle but never the poll loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::Timeout
                | Self::Remote { .. }
                | Self::MalformedResponse { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<hostmirror_api::Error> for CoreError {
    fn from(err: hostmirror_api::Error) -> Self {
        match err {
            hostmirror_api::Error::InvalidApiKey => CoreError::AuthenticationFailed {
                message: "API key rejected by server".into(),
            },
            hostmirror_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            hostmirror_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Remote {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            hostmirror_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            hostmirror_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            hostmirror_api::Error::Http { status, message } => CoreError::Remote {
                message,
                status: Some(status),
            },
            hostmirror_api::Error::Graphql { messages } => CoreError::Remote {
                message: messages.join("; "),
                status: None,
            },
            hostmirror_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
        }
    }
}
