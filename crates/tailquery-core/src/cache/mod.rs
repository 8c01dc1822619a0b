// ── Memoized fetch cache ──
//
// Keyed, time-bounded, single-flight memoization of upstream fetches,
// plus the background sweep that bounds memory.

mod janitor;
mod memo;

pub use janitor::spawn_janitor;
pub use memo::{Abandoned, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL, Memoizer};
