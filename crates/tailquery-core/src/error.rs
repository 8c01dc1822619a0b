// ── Core error types ──
//
// User-facing errors from tailquery-core. These are NOT API-specific:
// consumers never see reqwest errors or JSON parse failures directly.
// Every variant carries owned strings so the whole enum is `Clone`,
// which lets the fetch cache hand the same failure to every waiter.

use thiserror::Error;

use crate::cache::Abandoned;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Upstream fetch errors ────────────────────────────────────────
    #[error("Cannot reach the Tailscale API: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Tailscale API request timed out")]
    Timeout,

    #[error("Rate limited by the Tailscale API -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Host-facing errors ───────────────────────────────────────────
    #[error("Unknown table: {name}")]
    UnknownTable { name: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Abandoned> for CoreError {
    fn from(err: Abandoned) -> Self {
        CoreError::Internal(err.to_string())
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tailquery_api::Error> for CoreError {
    fn from(err: tailquery_api::Error) -> Self {
        match err {
            tailquery_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            tailquery_api::Error::InvalidApiKey => CoreError::AuthenticationFailed {
                message: "API key is not a valid header value".into(),
            },
            tailquery_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            tailquery_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            tailquery_api::Error::ClientBuild(message) => CoreError::Config { message },
            tailquery_api::Error::RateLimited { retry_after_secs } => {
                CoreError::RateLimited { retry_after_secs }
            }
            tailquery_api::Error::Api { message, status } => CoreError::Api {
                message,
                status: Some(status),
            },
            tailquery_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
