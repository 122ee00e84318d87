/// Core types for history snapshots and stored revisions.
use serde::{Deserialize, Serialize};

/// One entry of the in-memory history stack.
///
/// The state is never mutated after the snapshot is pushed, except when a
/// coalesced edit replaces the tip snapshot wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// Monotonic sequence number assigned by the `SnapshotHistory`.
    /// Changes whenever the observable state changes.
    pub seq: u64,
    /// The recorded state.
    pub state: T,
}

/// An autosaved state as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRevision<T> {
    /// Per-site revision number, strictly increasing.
    pub revision: u64,
    /// Wall-clock save time in milliseconds since the Unix epoch.
    pub saved_at_ms: i64,
    pub state: T,
}
