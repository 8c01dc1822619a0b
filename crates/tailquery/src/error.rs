//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use tailquery_config::ConfigError;
use tailquery_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const RATE_LIMITED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Upstream ─────────────────────────────────────────────────────
    #[error("Could not reach the Tailscale API")]
    #[diagnostic(
        code(tailquery::connection_failed),
        help("Check network access to the API.\nReason: {reason}")
    )]
    ConnectionFailed { reason: String },

    #[error("Tailscale API rejected the credentials")]
    #[diagnostic(
        code(tailquery::auth_failed),
        help(
            "{message}\n\
             Create an API key in the admin console and export TAILSCALE_API_KEY."
        )
    )]
    AuthFailed { message: String },

    #[error("Rate limited by the Tailscale API")]
    #[diagnostic(
        code(tailquery::rate_limited),
        help("Retry in {retry_after_secs}s. Results are cached, so repeated scans inside the window are free.")
    )]
    RateLimited { retry_after_secs: u64 },

    #[error("Tailscale API request timed out")]
    #[diagnostic(code(tailquery::timeout), help("Raise tailscale.http_timeout in the config file."))]
    Timeout,

    #[error("API error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    #[diagnostic(code(tailquery::api_error))]
    ApiError { message: String, status: Option<u16> },

    // ── Tables ───────────────────────────────────────────────────────
    #[error("Unknown table '{name}'")]
    #[diagnostic(
        code(tailquery::unknown_table),
        help("Run: tailquery tables")
    )]
    UnknownTable { name: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No Tailscale API key configured")]
    #[diagnostic(
        code(tailquery::no_credentials),
        help(
            "Set TAILSCALE_API_KEY, or api_key under [tailscale] in {path}."
        )
    )]
    NoCredentials { path: String },

    #[error("No extension socket given")]
    #[diagnostic(
        code(tailquery::missing_socket),
        help("Pass --socket PATH, or set TAILQUERY_SOCKET.")
    )]
    MissingSocket,

    #[error("Configuration file not found: {path}")]
    #[diagnostic(code(tailquery::no_config))]
    NoConfig { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tailquery::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(tailquery::config))]
    Config(ConfigError),

    // ── Internal / IO ────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(tailquery::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    #[diagnostic(code(tailquery::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::RateLimited { .. } => exit_code::RATE_LIMITED,
            Self::Timeout => exit_code::TIMEOUT,
            Self::UnknownTable { .. } | Self::NoConfig { .. } => exit_code::NOT_FOUND,
            Self::MissingSocket | Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Timeout => CliError::Timeout,
            CoreError::RateLimited { retry_after_secs } => {
                CliError::RateLimited { retry_after_secs }
            }
            CoreError::Api { message, status } => CliError::ApiError { message, status },
            CoreError::UnknownTable { name } => CliError::UnknownTable { name },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials => CliError::NoCredentials {
                path: tailquery_config::config_path().display().to_string(),
            },
            ConfigError::MissingSocket => CliError::MissingSocket,
            ConfigError::NotFound { path } => CliError::NoConfig {
                path: path.display().to_string(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
