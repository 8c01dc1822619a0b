//! Layered configuration for tailquery.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file,
//! `TAILSCALE_API_KEY` / `TAILSCALE_TAILNET`, `TAILQUERY_*` variables
//! (`__` separates nested keys), then command-line overrides. The result
//! is translated into a [`tailquery_core::ServiceConfig`] for the service.

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

use tailquery_core::{CacheSettings, ServiceConfig};

const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no extension socket configured")]
    MissingSocket,

    #[error("no Tailscale API key configured")]
    NoCredentials,

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Settings ────────────────────────────────────────────────────────

/// Fully merged process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Extension socket path. Required by `serve`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<PathBuf>,

    /// Seconds to wait for a response before failing the request. 0 waits forever.
    #[serde(default)]
    pub timeout: u64,

    /// Seconds between checks that the socket is still in place.
    #[serde(default = "default_interval")]
    pub interval: u64,

    #[serde(default)]
    pub tailscale: TailscaleSettings,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            socket: None,
            timeout: 0,
            interval: default_interval(),
            tailscale: TailscaleSettings::default(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TailscaleSettings {
    /// API key (plaintext; prefer `TAILSCALE_API_KEY`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Tailnet name. `-` selects the tailnet that owns the key.
    #[serde(default = "default_tailnet")]
    pub tailnet: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,
}

impl Default for TailscaleSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            tailnet: default_tailnet(),
            api_url: default_api_url(),
            http_timeout: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Seconds a fetched result is reused.
    #[serde(default = "default_ttl")]
    pub ttl: u64,

    /// Seconds between sweeps of expired entries. 0 disables the sweep.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

fn default_interval() -> u64 {
    5
}
fn default_tailnet() -> String {
    tailquery_api::client::DEFAULT_TAILNET.into()
}
fn default_api_url() -> String {
    tailquery_api::client::DEFAULT_BASE_URL.into()
}
fn default_http_timeout() -> u64 {
    30
}
fn default_ttl() -> u64 {
    tailquery_core::cache::DEFAULT_TTL.as_secs()
}
fn default_sweep_interval() -> u64 {
    tailquery_core::cache::DEFAULT_SWEEP_INTERVAL.as_secs()
}

/// Upper bound for `cache.ttl` and `cache.sweep_interval`, in seconds.
pub const MAX_CACHE_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

fn cache_window(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs > MAX_CACHE_WINDOW_SECS {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("{secs}s exceeds the {MAX_CACHE_WINDOW_SECS}s maximum"),
        });
    }
    Ok(Duration::from_secs(secs))
}

// ── Command-line overrides ──────────────────────────────────────────

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    pub tailscale: TailscaleOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TailscaleOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tailnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "tailquery").map_or_else(
        || PathBuf::from(".tailquery.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Assemble every configuration layer.
///
/// With `explicit_file` set, that file must exist; otherwise the platform
/// path is used if present.
pub fn figment(explicit_file: Option<&Path>, overrides: &Overrides) -> Result<Figment, ConfigError> {
    let file = match explicit_file {
        Some(path) if !path.exists() => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Some(path) => path.to_path_buf(),
        None => config_path(),
    };

    Ok(Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(file))
        .merge(
            Env::prefixed("TAILSCALE_")
                .only(&["api_key", "tailnet"])
                .map(|key| format!("tailscale.{}", key.as_str()).into()),
        )
        .merge(Env::prefixed("TAILQUERY_").split("__"))
        .merge(Serialized::defaults(overrides)))
}

/// Load and merge all layers.
pub fn load(explicit_file: Option<&Path>, overrides: &Overrides) -> Result<Settings, ConfigError> {
    Settings::from_figment(&figment(explicit_file, overrides)?)
}

impl Settings {
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        Ok(figment.extract()?)
    }

    /// Socket path, or [`ConfigError::MissingSocket`].
    pub fn require_socket(&self) -> Result<&Path, ConfigError> {
        self.socket.as_deref().ok_or(ConfigError::MissingSocket)
    }

    /// `None` when responses may take as long as they need.
    pub fn response_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }

    /// Translate into the service's runtime config, validating credentials,
    /// the API URL and the cache windows.
    pub fn service_config(&self) -> Result<ServiceConfig, ConfigError> {
        let key = self
            .tailscale
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::NoCredentials)?;

        let api_url: url::Url =
            self.tailscale
                .api_url
                .parse()
                .map_err(|e: url::ParseError| ConfigError::Validation {
                    field: "tailscale.api_url".into(),
                    reason: format!("{e}: {}", self.tailscale.api_url),
                })?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "tailscale.api_url".into(),
                reason: format!("expected an http(s) URL, got '{api_url}'"),
            });
        }

        let cache = CacheSettings {
            ttl: cache_window("cache.ttl", self.cache.ttl)?,
            sweep_interval: cache_window("cache.sweep_interval", self.cache.sweep_interval)?,
        };

        let mut config = ServiceConfig::new(
            api_url,
            self.tailscale.tailnet.clone(),
            SecretString::from(key.to_owned()),
        );
        config.timeout = Duration::from_secs(self.tailscale.http_timeout);
        config.cache = cache;
        Ok(config)
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if shown.tailscale.api_key.is_some() {
            shown.tailscale.api_key = Some(REDACTED.into());
        }
        shown
    }

    /// Render as TOML (with the key masked).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }
}
