/// Re-exports from site-builder-mod-history and config bridging.
/// Maps the user-facing BuilderConfig onto the history crate's HistoryConfig.
pub use site_builder_mod_history::config::resolve_data_dir;
pub use site_builder_mod_history::{
    validate_site_id, HistoryConfig, PersistenceLayer, Snapshot, SnapshotHistory, StoredRevision,
};

use site_builder_config::BuilderConfig;

/// Builds the history settings described by `config`.
///
/// An empty `data_dir` in the config falls back to `resolve_data_dir()`.
pub fn history_config(config: &BuilderConfig) -> HistoryConfig {
    HistoryConfig {
        history_limit: config.history_limit,
        coalesce_window_ms: config.coalesce_window_ms,
        max_revisions: config.max_autosave_revisions,
        data_dir: config.data_dir_override().unwrap_or_else(resolve_data_dir),
    }
    .normalized()
}
