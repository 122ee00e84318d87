/// Bounded undo/redo history with optional autosave persistence.
///
/// Provides a `SnapshotHistory` that keeps a linear, FIFO-bounded stack of
/// immutable state snapshots with an index pointer, and a `PersistenceLayer`
/// that stores autosaved revisions in an embedded key-value store (redb).
pub mod config;
pub mod manager;
pub mod persistence;
pub mod snapshot;

pub use config::HistoryConfig;
pub use manager::SnapshotHistory;
pub use persistence::{validate_site_id, PersistenceLayer};
pub use snapshot::{Snapshot, StoredRevision};
