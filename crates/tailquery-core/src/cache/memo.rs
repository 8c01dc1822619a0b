// ── Single-flight memoizer ──
//
// One slot per key. A slot is either a fetch in flight (waiters hold a
// `watch::Receiver` for its outcome) or a completed outcome with a
// deadline. Slot transitions happen under a DashMap shard lock that is
// never held across an `.await`.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Freshness window applied when none is configured.
pub const DEFAULT_TTL: Duration = Duration::from_secs(90);

/// How often the janitor sweeps expired entries when none is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Upper bound on a stored deadline; roughly thirty years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// The fetch task ended without producing an outcome (panic or runtime
/// shutdown). Error types stored in a [`Memoizer`] must be constructible
/// from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("upstream fetch was abandoned before it produced a result")]
pub struct Abandoned;

type Outcome<V, E> = Result<V, E>;

struct Memo<V, E> {
    outcome: Outcome<V, E>,
    expires_at: Instant,
}

enum Slot<V, E> {
    InFlight(watch::Receiver<Option<Outcome<V, E>>>),
    Ready(Memo<V, E>),
}

enum Lookup<V, E> {
    Hit(Outcome<V, E>),
    Join(watch::Receiver<Option<Outcome<V, E>>>),
    Start(
        watch::Sender<Option<Outcome<V, E>>>,
        watch::Receiver<Option<Outcome<V, E>>>,
    ),
}

/// Time-bounded, request-coalescing cache in front of expensive fetches.
///
/// - A missing or expired key runs its producer exactly once; the outcome
///   and a deadline of `now + ttl` are stored and returned.
/// - Callers arriving while that fetch runs wait for the same outcome.
/// - Until the deadline, the stored outcome is returned without running
///   the producer. **Errors are stored and replayed too**: a failed fetch
///   is reported to every caller for the rest of the window, and the next
///   attempt happens only after it expires. There is no retry.
///
/// The producer's future runs on its own task, so a caller that stops
/// waiting does not cancel the fetch; its outcome still lands in the cache.
///
/// Cheaply cloneable: clones share the same entries.
pub struct Memoizer<K, V, E> {
    entries: Arc<DashMap<K, Slot<V, E>>>,
    ttl: Duration,
}

impl<K, V, E> Clone for Memoizer<K, V, E>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}

impl<K, V, E> Memoizer<K, V, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + From<Abandoned> + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Return the memoized outcome for `key`, running `producer` only if
    /// no fresh outcome exists and no fetch is already in flight.
    pub async fn call<F, Fut>(&self, key: K, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        match self.lookup(&key) {
            Lookup::Hit(outcome) => {
                debug!(?key, ok = outcome.is_ok(), "cache hit");
                outcome
            }
            Lookup::Join(rx) => {
                debug!(?key, "joining in-flight fetch");
                wait_for_outcome(rx).await
            }
            Lookup::Start(tx, rx) => {
                debug!(?key, "cache miss, fetching");
                self.spawn_fetch(key, producer(), tx);
                wait_for_outcome(rx).await
            }
        }
    }

    /// Decide under the shard lock whether to hit, join, or start a fetch.
    /// Starting installs the in-flight marker before the lock is released.
    fn lookup(&self, key: &K) -> Lookup<V, E> {
        let now = Instant::now();

        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let current = match occupied.get() {
                    Slot::Ready(memo) if now < memo.expires_at => {
                        Some(Lookup::Hit(memo.outcome.clone()))
                    }
                    // A closed sender with no outcome means the fetch task vanished.
                    Slot::InFlight(rx) if rx.has_changed().is_ok() => {
                        Some(Lookup::Join(rx.clone()))
                    }
                    _ => None,
                };

                current.unwrap_or_else(|| {
                    let (tx, rx) = watch::channel(None);
                    occupied.insert(Slot::InFlight(rx.clone()));
                    Lookup::Start(tx, rx)
                })
            }
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                vacant.insert(Slot::InFlight(rx.clone()));
                Lookup::Start(tx, rx)
            }
        }
    }

    fn spawn_fetch<Fut>(&self, key: K, fetch: Fut, tx: watch::Sender<Option<Outcome<V, E>>>)
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let ttl = self.ttl;

        tokio::spawn(async move {
            // Inner task so a panicking producer becomes an error outcome.
            let outcome = match tokio::spawn(fetch).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(?key, error = %err, "upstream fetch task failed");
                    Err(E::from(Abandoned))
                }
            };

            if outcome.is_err() {
                debug!(?key, window_secs = ttl.as_secs(), "fetch failed, error memoized");
            }

            // Store before notifying so late arrivals see `Ready`.
            entries.insert(
                key,
                Slot::Ready(Memo {
                    outcome: outcome.clone(),
                    expires_at: deadline(ttl),
                }),
            );
            tx.send_replace(Some(outcome));
        });
    }

    /// Remove every completed entry whose deadline has passed. In-flight
    /// fetches are never touched. Returns how many entries were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.entries.retain(|_, slot| {
            let keep = match slot {
                Slot::Ready(memo) => now < memo.expires_at,
                Slot::InFlight(_) => true,
            };
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }

    /// Number of keys currently tracked (fresh, expired, or in flight).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `now + ttl`, saturating at a far-future instant instead of overflowing.
fn deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl).unwrap_or_else(|| now + FAR_FUTURE)
}

async fn wait_for_outcome<V, E>(mut rx: watch::Receiver<Option<Outcome<V, E>>>) -> Result<V, E>
where
    V: Clone,
    E: Clone + From<Abandoned>,
{
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => outcome.clone().unwrap_or_else(|| Err(E::from(Abandoned))),
        Err(_) => Err(E::from(Abandoned)),
    }
}
