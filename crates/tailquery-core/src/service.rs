// ── Tailnet service ──
//
// Owns the upstream client handle and the fetch cache for the lifetime
// of the process. Constructed explicitly and passed by reference (or
// cheap clone) to every table; there is no global state.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tailquery_api::{TailscaleClient, TransportConfig};

use crate::cache::{Memoizer, spawn_janitor};
use crate::config::{CacheSettings, ServiceConfig};
use crate::error::CoreError;
use crate::model::{Device, User};

// ── Resources ────────────────────────────────────────────────────

/// Logical upstream resource backing one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKey {
    Devices,
    Users,
}

/// A fetched resource list, shared by every table built from it.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Devices(Arc<[Device]>),
    Users(Arc<[User]>),
}

// ── Upstream ─────────────────────────────────────────────────────

/// The two read operations the tables need from the API.
///
/// Implemented for [`TailscaleClient`]; tests substitute their own.
pub trait Upstream: Send + Sync + 'static {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<Device>, CoreError>> + Send;
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, CoreError>> + Send;
}

impl Upstream for TailscaleClient {
    async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        let devices = TailscaleClient::list_devices(self).await?;
        Ok(devices.into_iter().map(Device::from).collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, CoreError> {
        let users = TailscaleClient::list_users(self).await?;
        Ok(users.into_iter().map(User::from).collect())
    }
}

// ── TailnetService ───────────────────────────────────────────────

/// Cached access to tailnet resources.
///
/// Cheaply cloneable via `Arc<ServiceInner>`. Every clone shares one cache,
/// so all tables derived from the same resource see the same snapshot
/// within a freshness window.
pub struct TailnetService<U = TailscaleClient> {
    inner: Arc<ServiceInner<U>>,
}

struct ServiceInner<U> {
    upstream: Arc<U>,
    cache: Memoizer<ResourceKey, Snapshot, CoreError>,
    settings: CacheSettings,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<U> Clone for TailnetService<U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl TailnetService<TailscaleClient> {
    /// Build a service backed by the real API. Does not contact it:
    /// the first table scan does.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig::default().with_timeout(config.timeout);
        let client = TailscaleClient::from_api_key(
            config.api_url.as_str(),
            &config.tailnet,
            &config.api_key,
            &transport,
        )?;
        debug!(tailnet = client.tailnet(), "built Tailscale API client");
        Ok(Self::with_upstream(client, config.cache))
    }
}

impl<U: Upstream> TailnetService<U> {
    pub fn with_upstream(upstream: U, settings: CacheSettings) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                upstream: Arc::new(upstream),
                cache: Memoizer::new(settings.ttl),
                settings,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn background housekeeping. Calling it again is a no-op.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() || self.inner.cancel.is_cancelled() {
            return;
        }

        let every = self.inner.settings.sweep_interval;
        if !every.is_zero() {
            handles.push(spawn_janitor(
                self.inner.cache.clone(),
                every,
                self.inner.cancel.clone(),
            ));
        }

        info!(
            ttl_secs = self.inner.settings.ttl.as_secs(),
            sweep_secs = every.as_secs(),
            "tailnet service started"
        );
    }

    /// Stop background tasks and wait for them to finish. Fetches already
    /// in flight are left to complete on their own.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("tailnet service stopped");
    }

    // ── Cached resources ─────────────────────────────────────────

    /// Current device snapshot, fetched at most once per window.
    pub async fn devices(&self) -> Result<Arc<[Device]>, CoreError> {
        match self.fetch(ResourceKey::Devices).await? {
            Snapshot::Devices(devices) => Ok(devices),
            Snapshot::Users(_) => Err(mismatch(ResourceKey::Devices)),
        }
    }

    /// Current user snapshot, fetched at most once per window.
    pub async fn users(&self) -> Result<Arc<[User]>, CoreError> {
        match self.fetch(ResourceKey::Users).await? {
            Snapshot::Users(users) => Ok(users),
            Snapshot::Devices(_) => Err(mismatch(ResourceKey::Users)),
        }
    }

    /// Number of resource keys the cache currently tracks.
    pub fn cached_resources(&self) -> usize {
        self.inner.cache.len()
    }

    async fn fetch(&self, key: ResourceKey) -> Result<Snapshot, CoreError> {
        let upstream = Arc::clone(&self.inner.upstream);

        self.inner
            .cache
            .call(key, move || async move {
                let result = match key {
                    ResourceKey::Devices => upstream
                        .list_devices()
                        .await
                        .map(|d| Snapshot::Devices(d.into())),
                    ResourceKey::Users => upstream
                        .list_users()
                        .await
                        .map(|u| Snapshot::Users(u.into())),
                };

                match &result {
                    Ok(snapshot) => debug!(resource = %key, count = snapshot.len(), "fetched"),
                    Err(e) => warn!(resource = %key, error = %e, "upstream fetch failed"),
                }
                result
            })
            .await
    }
}

impl Snapshot {
    pub fn len(&self) -> usize {
        match self {
            Self::Devices(d) => d.len(),
            Self::Users(u) => u.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn mismatch(key: ResourceKey) -> CoreError {
    CoreError::Internal(format!("cache entry for {key} holds a different resource"))
}
