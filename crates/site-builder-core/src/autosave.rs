/// Periodic autosave of the current block list.
///
/// The autosaver never touches the manager's state. It reads an immutable
/// snapshot, writes it as a new revision when the visible blocks changed
/// since the last write, and trims old revisions.
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::history::PersistenceLayer;
use crate::manager::BlockHistoryManager;

pub struct Autosaver {
    store: Arc<PersistenceLayer>,
    site_id: String,
    interval: Duration,
    max_revisions: usize,
    /// Manager revision written last (or restored from).
    last_saved: Option<u64>,
    last_save_at: Option<Instant>,
}

impl std::fmt::Debug for Autosaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autosaver")
            .field("site_id", &self.site_id)
            .field("interval", &self.interval)
            .field("max_revisions", &self.max_revisions)
            .field("last_saved", &self.last_saved)
            .finish()
    }
}

impl Autosaver {
    pub fn new(
        store: Arc<PersistenceLayer>,
        site_id: impl Into<String>,
        interval: Duration,
        max_revisions: usize,
    ) -> Self {
        Self {
            store,
            site_id: site_id.into(),
            interval,
            max_revisions: max_revisions.max(1),
            last_saved: None,
            last_save_at: None,
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Records that the manager's current state is already on disk,
    /// e.g. right after `BlockHistoryManager::restore_or_new`.
    pub fn mark_saved(&mut self, manager: &BlockHistoryManager) {
        self.last_saved = Some(manager.revision());
    }

    /// Whether the visible blocks differ from the last saved state.
    pub fn is_dirty(&self, manager: &BlockHistoryManager) -> bool {
        self.last_saved != Some(manager.revision())
    }

    /// Saves if the state is dirty and the interval has elapsed since the
    /// last save. Returns the written revision number.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the state stays dirty.
    pub fn maybe_save(&mut self, manager: &BlockHistoryManager, now: Instant) -> Result<Option<u64>> {
        let due = self
            .last_save_at
            .is_none_or(|at| now.saturating_duration_since(at) >= self.interval);
        if !due {
            return Ok(None);
        }
        self.save_if_dirty(manager, now)
    }

    /// Saves immediately if the state is dirty, ignoring the interval.
    ///
    /// Called on shutdown and after scripted sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn flush(&mut self, manager: &BlockHistoryManager) -> Result<Option<u64>> {
        self.save_if_dirty(manager, Instant::now())
    }

    fn save_if_dirty(&mut self, manager: &BlockHistoryManager, now: Instant) -> Result<Option<u64>> {
        if !self.is_dirty(manager) {
            return Ok(None);
        }

        let seq = manager.revision();
        let snapshot = manager.snapshot();
        let revision = self
            .store
            .write_revision(&self.site_id, &*snapshot)
            .with_context(|| format!("Failed to autosave site {}", self.site_id))?;

        self.last_saved = Some(seq);
        self.last_save_at = Some(now);

        match self.store.retain_latest(&self.site_id, self.max_revisions) {
            Ok(0) => {}
            Ok(evicted) => tracing::debug!(site_id = %self.site_id, evicted, "old revisions evicted"),
            Err(e) => tracing::warn!("Failed to trim autosaves for {}: {e:#}", self.site_id),
        }

        tracing::info!(
            site_id = %self.site_id,
            revision,
            blocks = snapshot.len(),
            "site autosaved"
        );
        Ok(Some(revision))
    }
}
