/// Disk persistence layer backed by redb.
///
/// Uses a single redb database file with two tables:
/// - `revisions`: serialized `StoredRevision` entries keyed by `"{site_id}#{revision:020}"`
/// - `meta`: per-site metadata keyed by `site_id`
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::snapshot::StoredRevision;

/// Revisions table: composite string key → bincode-serialized StoredRevision.
const REVISIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("revisions");

/// Metadata table: site_id → bincode-serialized SiteMeta.
const META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// Per-site metadata persisted alongside revisions.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SiteMeta {
    next_revision: u64,
}

/// Checks that `site_id` can be used as a revision key prefix.
///
/// Ids must be non-blank and must not contain the `#` separator or `$`,
/// which bounds a site's key range; otherwise one site's range would
/// cover another's revisions.
///
/// # Errors
///
/// Returns an error describing why the id is rejected.
pub fn validate_site_id(site_id: &str) -> Result<()> {
    anyhow::ensure!(!site_id.trim().is_empty(), "Site id must not be empty");
    anyhow::ensure!(
        !site_id.contains(['#', '$']),
        "Site id {site_id:?} must not contain '#' or '$'"
    );
    Ok(())
}

/// Formats a revisions table key from site_id and revision number.
///
/// The revision is zero-padded to 20 digits so lexicographic order in the
/// B-tree matches numeric order.
fn revision_key(site_id: &str, revision: u64) -> String {
    format!("{site_id}#{revision:020}")
}

/// Returns the exclusive range bounds for all revisions of a site.
///
/// `$` is one ASCII codepoint above the `#` separator.
fn site_range(site_id: &str) -> (String, String) {
    let start = format!("{site_id}#");
    let end = format!("{site_id}$");
    (start, end)
}

/// Collects the keys of the oldest `limit` revisions of a site.
fn oldest_keys(txn: &WriteTransaction, site_id: &str, limit: Option<usize>) -> Result<Vec<String>> {
    let table = txn
        .open_table(REVISIONS_TABLE)
        .context("Failed to open revisions table")?;
    let (start, end) = site_range(site_id);
    let range = table
        .range::<&str>(start.as_str()..end.as_str())
        .context("Failed to range query revisions table")?;

    let mut keys = Vec::new();
    for entry in range {
        if limit.is_some_and(|n| keys.len() >= n) {
            break;
        }
        let (key_guard, _) = entry.context("Failed to read revision entry")?;
        keys.push(key_guard.value().to_string());
    }
    Ok(keys)
}

/// Autosave store for site states backed by redb.
///
/// Thread-safe: redb supports concurrent readers and serialized writers.
/// Shared across editing sessions via `Arc<PersistenceLayer>`.
pub struct PersistenceLayer {
    db: Database,
}

impl std::fmt::Debug for PersistenceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceLayer").finish()
    }
}

impl PersistenceLayer {
    /// Opens or creates the revision database in the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened.
    pub fn open(data_dir: &Path) -> Result<Arc<Self>> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("history.redb");
        let db = Database::create(&db_path)
            .with_context(|| format!("Failed to open history database: {}", db_path.display()))?;

        let write_txn = db
            .begin_write()
            .context("Failed to begin initial write transaction")?;
        {
            let _ = write_txn
                .open_table(REVISIONS_TABLE)
                .context("Failed to create revisions table")?;
            let _ = write_txn
                .open_table(META_TABLE)
                .context("Failed to create meta table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initial transaction")?;

        Ok(Arc::new(Self { db }))
    }

    /// Stores `state` as the next revision of a site and returns its number.
    ///
    /// The revision write and the metadata bump share one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write transaction fails.
    pub fn write_revision<T: Serialize + ?Sized>(&self, site_id: &str, state: &T) -> Result<u64> {
        validate_site_id(site_id)?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let revision = {
            let mut meta_table = write_txn
                .open_table(META_TABLE)
                .context("Failed to open meta table")?;
            let next = match meta_table.get(site_id).context("Failed to read metadata")? {
                Some(guard) => {
                    let meta: SiteMeta = bincode::deserialize(guard.value())
                        .context("Failed to deserialize site metadata")?;
                    meta.next_revision
                }
                None => 0,
            };
            let meta_bytes = bincode::serialize(&SiteMeta {
                next_revision: next + 1,
            })
            .context("Failed to serialize site metadata")?;
            meta_table
                .insert(site_id, meta_bytes.as_slice())
                .context("Failed to insert metadata")?;
            next
        };

        {
            let stored = StoredRevision {
                revision,
                saved_at_ms: chrono::Utc::now().timestamp_millis(),
                state,
            };
            let bytes = bincode::serialize(&stored).context("Failed to serialize revision")?;
            let mut table = write_txn
                .open_table(REVISIONS_TABLE)
                .context("Failed to open revisions table")?;
            table
                .insert(revision_key(site_id, revision).as_str(), bytes.as_slice())
                .context("Failed to insert revision")?;
        }

        write_txn
            .commit()
            .context("Failed to commit write transaction")?;
        Ok(revision)
    }

    /// Reads the most recent revision of a site, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction or deserialization fails.
    pub fn latest_revision<T: DeserializeOwned>(
        &self,
        site_id: &str,
    ) -> Result<Option<StoredRevision<T>>> {
        validate_site_id(site_id)?;
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(REVISIONS_TABLE)
            .context("Failed to open revisions table")?;

        let (start, end) = site_range(site_id);
        let last = table
            .range::<&str>(start.as_str()..end.as_str())
            .context("Failed to range query revisions table")?
            .next_back();

        match last {
            Some(entry) => {
                let (_, value_guard) = entry.context("Failed to read revision entry")?;
                let stored: StoredRevision<T> = bincode::deserialize(value_guard.value())
                    .context("Failed to deserialize revision")?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    /// Reads all revisions of a site, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction or deserialization fails.
    pub fn read_revisions<T: DeserializeOwned>(
        &self,
        site_id: &str,
    ) -> Result<Vec<StoredRevision<T>>> {
        validate_site_id(site_id)?;
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(REVISIONS_TABLE)
            .context("Failed to open revisions table")?;

        let (start, end) = site_range(site_id);
        let mut revisions = Vec::new();
        for entry in table
            .range::<&str>(start.as_str()..end.as_str())
            .context("Failed to range query revisions table")?
        {
            let (_, value_guard) = entry.context("Failed to read revision entry")?;
            let stored: StoredRevision<T> = bincode::deserialize(value_guard.value())
                .context("Failed to deserialize revision")?;
            revisions.push(stored);
        }
        Ok(revisions)
    }

    /// Counts the revisions stored for a site.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction fails.
    pub fn count_revisions(&self, site_id: &str) -> Result<usize> {
        validate_site_id(site_id)?;
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(REVISIONS_TABLE)
            .context("Failed to open revisions table")?;

        let (start, end) = site_range(site_id);
        let count = table
            .range::<&str>(start.as_str()..end.as_str())
            .context("Failed to range query for count")?
            .count();
        Ok(count)
    }

    /// Removes the `count` oldest revisions of a site.
    ///
    /// # Errors
    ///
    /// Returns an error if the write transaction fails.
    pub fn evict_oldest(&self, site_id: &str, count: usize) -> Result<usize> {
        validate_site_id(site_id)?;
        if count == 0 {
            return Ok(0);
        }

        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        let keys = oldest_keys(&write_txn, site_id, Some(count))?;
        {
            let mut table = write_txn
                .open_table(REVISIONS_TABLE)
                .context("Failed to open revisions table")?;
            for key in &keys {
                table
                    .remove(key.as_str())
                    .context("Failed to remove evicted revision")?;
            }
        }
        write_txn.commit().context("Failed to commit eviction")?;
        Ok(keys.len())
    }

    /// Evicts old revisions so at most `keep` remain for a site.
    ///
    /// # Errors
    ///
    /// Returns an error if counting or eviction fails.
    pub fn retain_latest(&self, site_id: &str, keep: usize) -> Result<usize> {
        let count = self.count_revisions(site_id)?;
        self.evict_oldest(site_id, count.saturating_sub(keep))
    }

    /// Removes all revisions and metadata for a site.
    ///
    /// # Errors
    ///
    /// Returns an error if the write transaction fails.
    pub fn delete_site(&self, site_id: &str) -> Result<()> {
        validate_site_id(site_id)?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        let keys = oldest_keys(&write_txn, site_id, None)?;
        {
            let mut table = write_txn
                .open_table(REVISIONS_TABLE)
                .context("Failed to open revisions table")?;
            for key in &keys {
                table
                    .remove(key.as_str())
                    .context("Failed to remove revision")?;
            }
        }
        {
            let mut meta_table = write_txn
                .open_table(META_TABLE)
                .context("Failed to open meta table")?;
            let _ = meta_table.remove(site_id);
        }
        write_txn.commit().context("Failed to commit deletion")?;
        Ok(())
    }

    /// Lists all site IDs that have stored metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction fails.
    pub fn list_sites(&self) -> Result<Vec<String>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(META_TABLE)
            .context("Failed to open meta table")?;

        let mut site_ids = Vec::new();
        for entry in table.iter().context("Failed to iterate meta table")? {
            let (key_guard, _) = entry.context("Failed to read meta entry")?;
            site_ids.push(key_guard.value().to_string());
        }
        Ok(site_ids)
    }
}
