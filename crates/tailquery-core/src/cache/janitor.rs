// ── Background sweep ──
//
// Periodically drops expired entries. Purely housekeeping: a late or
// missing sweep only affects memory, never what callers observe.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::memo::{Abandoned, Memoizer};

/// Spawn a task that calls [`Memoizer::purge_expired`] every `every`
/// until `cancel` fires. `every` must be non-zero.
pub fn spawn_janitor<K, V, E>(
    cache: Memoizer<K, V, E>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + From<Abandoned> + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let removed = cache.purge_expired();
                    if removed > 0 {
                        debug!(removed, remaining = cache.len(), "swept expired cache entries");
                    }
                }
            }
        }
    })
}
