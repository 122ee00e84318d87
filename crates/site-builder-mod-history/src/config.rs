/// Configuration and utility functions for the history system.
use std::path::{Path, PathBuf};

/// Maximum number of snapshots retained per editing session, including
/// the snapshot of the current state.
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Time window in milliseconds for coalescing consecutive live edits
/// to the same target into a single undo step.
const DEFAULT_COALESCE_WINDOW_MS: u64 = 500;

/// Maximum number of autosaved revisions kept on disk per site.
const DEFAULT_MAX_REVISIONS: usize = 20;

/// Smallest history that still allows one undo step.
pub const MIN_HISTORY_LIMIT: usize = 2;

/// Configuration for the history system.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Max snapshots kept in memory. Oldest are evicted first.
    pub history_limit: usize,
    /// Coalescing window in milliseconds.
    pub coalesce_window_ms: u64,
    /// Max autosaved revisions per site.
    pub max_revisions: usize,
    /// Root directory for the persistence database.
    pub data_dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            coalesce_window_ms: DEFAULT_COALESCE_WINDOW_MS,
            max_revisions: DEFAULT_MAX_REVISIONS,
            data_dir: resolve_data_dir(),
        }
    }
}

impl HistoryConfig {
    /// Returns a copy with `history_limit` raised to the supported minimum.
    pub fn normalized(mut self) -> Self {
        self.history_limit = self.history_limit.max(MIN_HISTORY_LIMIT);
        self.max_revisions = self.max_revisions.max(1);
        self
    }
}

/// Resolves the data directory path.
///
/// Resolution order:
/// 1. `SITE_BUILDER_DATA_DIR` environment variable
/// 2. `site-builder/` under the platform data directory
/// 3. `.data/` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SITE_BUILDER_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("site-builder"))
        .unwrap_or_else(|| Path::new(".").join(".data"))
}
