// ── Runtime service configuration ──
//
// Describes *how* to reach the Tailscale API and how long to trust what
// it returned. Carries credential data but never touches disk: the
// binary builds a `ServiceConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::cache::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};

/// Freshness and housekeeping settings for the fetch cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// How long a fetched result (or error) is replayed.
    pub ttl: Duration,
    /// How often expired entries are swept. Zero disables the sweep.
    pub sweep_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Everything needed to build a [`TailnetService`](crate::TailnetService)
/// backed by the real API.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// API root (e.g. `https://api.tailscale.com`).
    pub api_url: Url,
    /// Tailnet name; `-` means the tailnet owning the key.
    pub tailnet: String,
    pub api_key: SecretString,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    pub cache: CacheSettings,
}

impl ServiceConfig {
    pub fn new(api_url: Url, tailnet: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            api_url,
            tailnet: tailnet.into(),
            api_key,
            timeout: Duration::from_secs(30),
            cache: CacheSettings::default(),
        }
    }
}
