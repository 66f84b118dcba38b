//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use hostmirror_config::ConfigError;
use hostmirror_core::{CoreError, StoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to server at {url}")]
    #[diagnostic(
        code(hostmirror::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Reason: {reason}\n\
             Self-signed certificate? Try --insecure (-k)."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(hostmirror::timeout),
        help("Raise server.timeout in the config or check server responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(hostmirror::auth_failed),
        help(
            "Verify the API key.\n\
             Store a new one with: hostmirror config set-key"
        )
    )]
    AuthFailed { message: String },

    // ── Remote ───────────────────────────────────────────────────────
    #[error("Server error: {message}")]
    #[diagnostic(code(hostmirror::remote))]
    Remote { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Missing required configuration: {field}")]
    #[diagnostic(
        code(hostmirror::missing_config),
        help(
            "Set it in {path}, pass it as a flag, or create a config with:\n\
             hostmirror config init --server https://tower.local"
        )
    )]
    MissingConfig { field: String, path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hostmirror::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(hostmirror::config))]
    Config(#[from] ConfigError),

    // ── State ────────────────────────────────────────────────────────
    #[error("State store error: {0}")]
    #[diagnostic(
        code(hostmirror::state),
        help("Check the state.path setting and file permissions.")
    )]
    Store(#[from] StoreError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(hostmirror::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::MissingConfig { .. }
            | Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Timeout => CliError::Timeout,
            CoreError::Remote { message, status } => CliError::Remote {
                message: match status {
                    Some(code) => format!("HTTP {code}: {message}"),
                    None => message,
                },
            },
            CoreError::MalformedResponse { message } => CliError::Remote {
                message: format!("malformed response: {message}"),
            },
            CoreError::MissingConfig { field } => CliError::MissingConfig {
                field: field.into(),
                path: hostmirror_config::config_path().display().to_string(),
            },
            CoreError::Config { message } | CoreError::Catalog { message } => {
                CliError::Validation {
                    field: "configuration".into(),
                    reason: message,
                }
            }
            CoreError::Store(e) => CliError::Store(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_exit_codes() {
        let auth: CliError = CoreError::AuthenticationFailed {
            message: "nope".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let missing: CliError = CoreError::MissingConfig { field: "address" }.into();
        assert_eq!(missing.exit_code(), exit_code::USAGE);

        let remote: CliError = CoreError::Remote {
            message: "bad gateway".into(),
            status: Some(502),
        }
        .into();
        assert_eq!(remote.exit_code(), exit_code::GENERAL);
        assert_eq!(remote.to_string(), "Server error: HTTP 502: bad gateway");
    }
}
