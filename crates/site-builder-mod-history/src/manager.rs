/// Linear undo/redo history over immutable state snapshots.
///
/// The history is a FIFO-bounded stack of snapshots plus an index pointing
/// at the current one. Undo and redo only move the index; a new push
/// truncates everything after the index, so the history never branches.
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::HistoryConfig;
use crate::snapshot::Snapshot;

/// Tracks the run of live edits that may still be merged into the tip.
#[derive(Debug, Clone)]
struct CoalesceRun {
    key: String,
    last_edit: Instant,
}

/// Manages the undo/redo history for a single editing session.
///
/// `T` is the full state recorded at each step. Callers with large states
/// should use a cheaply clonable, immutable type such as `Arc<[Item]>`.
pub struct SnapshotHistory<T> {
    /// Snapshots ordered oldest first. Never empty.
    entries: VecDeque<Snapshot<T>>,
    /// Position of the current snapshot in `entries`.
    index: usize,
    /// Next sequence number to assign.
    next_seq: u64,
    /// Active coalescing run, if the last step was a live edit.
    coalesce: Option<CoalesceRun>,
    config: HistoryConfig,
}

impl<T> std::fmt::Debug for SnapshotHistory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotHistory")
            .field("len", &self.entries.len())
            .field("index", &self.index)
            .field("next_seq", &self.next_seq)
            .field("limit", &self.config.history_limit)
            .field("coalescing", &self.coalesce.is_some())
            .finish()
    }
}

impl<T> SnapshotHistory<T> {
    /// Creates a history whose only snapshot is `initial`.
    pub fn new(initial: T, config: HistoryConfig) -> Self {
        let mut entries = VecDeque::with_capacity(config.history_limit.min(64));
        entries.push_back(Snapshot {
            seq: 0,
            state: initial,
        });
        Self {
            entries,
            index: 0,
            next_seq: 1,
            coalesce: None,
            config: config.normalized(),
        }
    }

    /// The state at the current history position.
    pub fn current(&self) -> &T {
        &self.entries[self.index].state
    }

    /// Sequence number of the current snapshot.
    pub fn current_seq(&self) -> u64 {
        self.entries[self.index].seq
    }

    /// Records a new state as one undo step.
    ///
    /// Discards any redo states and evicts the oldest snapshot when the
    /// history limit is exceeded.
    pub fn push(&mut self, state: T) {
        self.coalesce = None;
        self.entries.truncate(self.index + 1);
        self.entries.push_back(Snapshot {
            seq: self.next_seq,
            state,
        });
        self.next_seq += 1;

        while self.entries.len() > self.config.history_limit {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;

        tracing::debug!(
            seq = self.current_seq(),
            len = self.entries.len(),
            "history step recorded"
        );
    }

    /// Records a live edit, merging it into the tip snapshot when the
    /// previous step was a live edit with the same `key` inside the
    /// coalescing window.
    ///
    /// The initial snapshot is never overwritten, so the first live edit of
    /// a session always stays undoable. A run that ends back at the previous
    /// snapshot's state drops its step instead of keeping an empty one.
    pub fn push_coalesced(&mut self, key: &str, state: T)
    where
        T: PartialEq,
    {
        let now = Instant::now();
        let window = Duration::from_millis(self.config.coalesce_window_ms);

        let mergeable = self.index > 0
            && self.index + 1 == self.entries.len()
            && self
                .coalesce
                .as_ref()
                .is_some_and(|run| run.key == key && now.duration_since(run.last_edit) < window);

        if mergeable && self.entries[self.index - 1].state == state {
            self.entries.pop_back();
            self.index -= 1;
            self.coalesce = None;
            tracing::trace!(key, seq = self.current_seq(), "live edit run reverted, step dropped");
            return;
        }

        if mergeable {
            let tip = &mut self.entries[self.index];
            tip.state = state;
            tip.seq = self.next_seq;
            self.next_seq += 1;
            if let Some(run) = self.coalesce.as_mut() {
                run.last_edit = now;
            }
            tracing::trace!(key, seq = tip.seq, "live edit coalesced into tip");
            return;
        }

        self.push(state);
        self.coalesce = Some(CoalesceRun {
            key: key.to_string(),
            last_edit: now,
        });
    }

    /// Ends the current coalescing run so the next live edit starts a new step.
    pub fn break_coalescing(&mut self) {
        self.coalesce = None;
    }

    /// Steps back one snapshot. Returns `false` at the start of history.
    pub fn undo(&mut self) -> bool {
        self.coalesce = None;
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        tracing::debug!(index = self.index, "undo");
        true
    }

    /// Steps forward one snapshot. Returns `false` at the end of history.
    pub fn redo(&mut self) -> bool {
        self.coalesce = None;
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        tracing::debug!(index = self.index, "redo");
        true
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Number of retained snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: the current state is always retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the current snapshot.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Iterates over all retained snapshots, oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot<T>> {
        self.entries.iter()
    }
}
