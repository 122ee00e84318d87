/// The block history manager: canonical block list plus undo/redo.
///
/// Every mutation builds a new block list from the current snapshot and
/// pushes it as one history step. Snapshots are shared `Arc<[ContentBlock]>`
/// slices and are never written after they are pushed, so a reader holding
/// one (autosave, renderer) always sees a consistent list.
use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;

use crate::action::{BlockEdit, BlockRef};
use crate::block::{BlockId, BlockPatch, BlockType, ContentBlock};
use crate::content::{ContentDefaults, StockContent};
use crate::error::{BuilderError, Result};
use crate::history::{HistoryConfig, PersistenceLayer, SnapshotHistory};

/// An immutable snapshot of the block list.
pub type BlockList = Arc<[ContentBlock]>;

/// Owns the block list, the selection and the edit history of one site.
pub struct BlockHistoryManager {
    history: SnapshotHistory<BlockList>,
    /// Always `None` or the id of a block in the current snapshot.
    selected: Option<BlockId>,
    defaults: Box<dyn ContentDefaults>,
}

impl std::fmt::Debug for BlockHistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockHistoryManager")
            .field("blocks", &self.blocks().len())
            .field("selected", &self.selected)
            .field("history", &self.history)
            .finish()
    }
}

impl BlockHistoryManager {
    /// Creates a manager with an empty canvas and stock default content.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            history: SnapshotHistory::new(Arc::from(Vec::new()), config),
            selected: None,
            defaults: Box::new(StockContent),
        }
    }

    /// Creates a manager whose starting state is `blocks`.
    ///
    /// Blocks are ordered by their `order` field (ties keep list order) and
    /// renumbered. The starting state is not undoable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContent` for duplicate ids or content that fails validation.
    pub fn with_blocks(mut blocks: Vec<ContentBlock>, config: HistoryConfig) -> Result<Self> {
        let mut seen = HashSet::new();
        for block in &blocks {
            block.content.validate()?;
            if !seen.insert(block.id().clone()) {
                return Err(BuilderError::InvalidContent(format!(
                    "duplicate block id: {}",
                    block.id()
                )));
            }
        }
        blocks.sort_by_key(|b| b.order);
        renumber(&mut blocks);

        Ok(Self {
            history: SnapshotHistory::new(blocks.into(), config),
            selected: None,
            defaults: Box::new(StockContent),
        })
    }

    /// Starts a session from the latest autosaved revision of `site_id`,
    /// or from an empty canvas when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store can't be read or the saved blocks are invalid.
    pub fn restore_or_new(
        site_id: &str,
        store: &PersistenceLayer,
        config: HistoryConfig,
    ) -> anyhow::Result<Self> {
        let stored = store
            .latest_revision::<Vec<ContentBlock>>(site_id)
            .with_context(|| format!("Failed to load autosave for site {site_id}"))?;

        match stored {
            Some(rev) => {
                tracing::info!(
                    site_id,
                    revision = rev.revision,
                    blocks = rev.state.len(),
                    "restored autosaved site"
                );
                Self::with_blocks(rev.state, config)
                    .with_context(|| format!("Autosaved blocks for site {site_id} are invalid"))
            }
            None => Ok(Self::new(config)),
        }
    }

    /// Replaces the default-content generator used by `add_block`.
    pub fn with_content_defaults(mut self, defaults: impl ContentDefaults + 'static) -> Self {
        self.defaults = Box::new(defaults);
        self
    }

    // ── Read accessors ─────────────────────────────────────────────────

    /// The current blocks in rendering order.
    pub fn blocks(&self) -> &[ContentBlock] {
        self.history.current()
    }

    /// A shared handle to the current block list.
    pub fn snapshot(&self) -> BlockList {
        Arc::clone(self.history.current())
    }

    pub fn block(&self, id: &BlockId) -> Option<&ContentBlock> {
        self.blocks().iter().find(|b| b.id() == id)
    }

    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks().iter().position(|b| b.id() == id)
    }

    pub fn selected_block_id(&self) -> Option<&BlockId> {
        self.selected.as_ref()
    }

    pub fn selected_block(&self) -> Option<&ContentBlock> {
        self.selected.as_ref().and_then(|id| self.block(id))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of retained snapshots, including the current one.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Position of the current snapshot in the history.
    pub fn history_index(&self) -> usize {
        self.history.index()
    }

    /// Identifies the current block list. Changes whenever the visible
    /// blocks change, including through undo and redo.
    pub fn revision(&self) -> u64 {
        self.history.current_seq()
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Inserts a block of the named type with default content.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBlockType` if `block_type` names no known kind.
    pub fn add_block(&mut self, block_type: &str, at_index: usize) -> Result<BlockId> {
        let block_type: BlockType = block_type.parse()?;
        self.insert_block(block_type, at_index)
    }

    /// Inserts a block of `block_type` at `at_index` (clamped to the list length).
    ///
    /// # Errors
    ///
    /// Fails only if the default-content generator returns content of the
    /// wrong type or content that doesn't validate.
    pub fn insert_block(&mut self, block_type: BlockType, at_index: usize) -> Result<BlockId> {
        let mut draft = self.draft();
        let id = self.place_new(&mut draft, block_type, at_index)?;
        self.commit(draft);
        tracing::debug!(%id, %block_type, at_index, "block added");
        Ok(id)
    }

    /// Merges `patch` into a block as one undo step.
    ///
    /// A patch that leaves the block unchanged records no step.
    ///
    /// # Errors
    ///
    /// Returns `BlockNotFound`, or a content error if the patch is invalid.
    pub fn update_block(&mut self, id: &BlockId, patch: BlockPatch) -> Result<()> {
        if let Some(draft) = self.patched(id, patch)? {
            self.commit(draft);
            tracing::debug!(%id, "block updated");
        }
        Ok(())
    }

    /// Like `update_block`, but consecutive live edits to the same block
    /// inside the coalescing window share one undo step.
    ///
    /// # Errors
    ///
    /// Same as `update_block`.
    pub fn update_block_live(&mut self, id: &BlockId, patch: BlockPatch) -> Result<()> {
        if let Some(draft) = self.patched(id, patch)? {
            self.history.push_coalesced(id.as_str(), draft.into());
            self.reconcile_selection();
        }
        Ok(())
    }

    /// Ends the current run of live edits.
    pub fn break_coalescing(&mut self) {
        self.history.break_coalescing();
    }

    /// Moves a block to `to_index` (clamped to the last position).
    ///
    /// # Errors
    ///
    /// Returns `BlockNotFound` if no block has `id`.
    pub fn move_block(&mut self, id: &BlockId, to_index: usize) -> Result<()> {
        let mut draft = self.draft();
        if apply_move(&mut draft, id, to_index)? {
            self.commit(draft);
            tracing::debug!(%id, to_index, "block moved");
        }
        Ok(())
    }

    /// Removes a block. Returns `false` (and records nothing) if it doesn't exist.
    pub fn delete_block(&mut self, id: &BlockId) -> bool {
        let mut draft = self.draft();
        if !apply_delete(&mut draft, id) {
            return false;
        }
        self.commit(draft);
        tracing::debug!(%id, "block deleted");
        true
    }

    /// Sets or clears the selection. Not an undoable step.
    ///
    /// # Errors
    ///
    /// Returns `BlockNotFound` if `id` names no current block.
    pub fn select_block(&mut self, id: Option<&BlockId>) -> Result<()> {
        if let Some(id) = id {
            if self.block(id).is_none() {
                return Err(BuilderError::BlockNotFound(id.to_string()));
            }
        }
        self.selected = id.cloned();
        Ok(())
    }

    /// Restores the previous snapshot. Returns `false` at the start of history.
    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo();
        if moved {
            self.reconcile_selection();
        }
        moved
    }

    /// Restores the next snapshot. Returns `false` at the end of history.
    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo();
        if moved {
            self.reconcile_selection();
        }
        moved
    }

    /// Applies `edits` in order as a single undo step.
    ///
    /// Either every edit applies or none does. Deletes of missing blocks are
    /// skipped as with `delete_block`. Returns the ids of added blocks.
    ///
    /// # Errors
    ///
    /// Returns the first failing edit's error; the manager is left unchanged.
    pub fn apply_batch(&mut self, edits: Vec<BlockEdit>) -> Result<Vec<BlockId>> {
        let mut draft = self.draft();
        let mut added = Vec::new();
        let mut changed = false;

        for edit in edits {
            match edit {
                BlockEdit::Add {
                    block_type,
                    at_index,
                } => {
                    added.push(self.place_new(&mut draft, block_type, at_index)?);
                    changed = true;
                }
                BlockEdit::Update { target, patch } => {
                    let id = target.resolve(&draft)?;
                    changed |= apply_update(&mut draft, &id, patch)?;
                }
                BlockEdit::Move { target, to_index } => {
                    let id = target.resolve(&draft)?;
                    changed |= apply_move(&mut draft, &id, to_index)?;
                }
                BlockEdit::Delete { target } => {
                    if let Some(i) = target.position_in(&draft) {
                        let id = draft[i].id().clone();
                        changed |= apply_delete(&mut draft, &id);
                    }
                }
            }
        }

        if changed {
            self.commit(draft);
            tracing::debug!(added = added.len(), "batch applied");
        }
        Ok(added)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn draft(&self) -> Vec<ContentBlock> {
        self.history.current().to_vec()
    }

    fn commit(&mut self, draft: Vec<ContentBlock>) {
        self.history.push(draft.into());
        self.reconcile_selection();
    }

    fn patched(&self, id: &BlockId, patch: BlockPatch) -> Result<Option<Vec<ContentBlock>>> {
        let mut draft = self.draft();
        let changed = apply_update(&mut draft, id, patch)?;
        Ok(changed.then_some(draft))
    }

    fn place_new(
        &self,
        draft: &mut Vec<ContentBlock>,
        block_type: BlockType,
        at_index: usize,
    ) -> Result<BlockId> {
        let content = self.defaults.default_content(block_type);
        if content.block_type() != block_type {
            return Err(BuilderError::ContentTypeMismatch {
                expected: block_type,
                found: content.block_type(),
            });
        }
        content.validate()?;

        let block = ContentBlock::new(content);
        let id = block.id().clone();
        draft.insert(at_index.min(draft.len()), block);
        renumber(draft);
        Ok(id)
    }

    fn reconcile_selection(&mut self) {
        if self
            .selected
            .as_ref()
            .is_some_and(|id| self.block(id).is_none())
        {
            self.selected = None;
        }
    }
}

/// Rewrites `order` so it equals each block's index.
fn renumber(blocks: &mut [ContentBlock]) {
    for (i, block) in blocks.iter_mut().enumerate() {
        block.order = i as u32;
    }
}

fn find(blocks: &[ContentBlock], id: &BlockId) -> Result<usize> {
    BlockRef::from(id)
        .position_in(blocks)
        .ok_or_else(|| BuilderError::BlockNotFound(id.to_string()))
}

fn apply_update(blocks: &mut [ContentBlock], id: &BlockId, patch: BlockPatch) -> Result<bool> {
    let i = find(blocks, id)?;
    let mut updated = blocks[i].clone();
    updated.apply(patch)?;
    if updated == blocks[i] {
        return Ok(false);
    }
    blocks[i] = updated;
    Ok(true)
}

fn apply_move(blocks: &mut Vec<ContentBlock>, id: &BlockId, to_index: usize) -> Result<bool> {
    let from = find(blocks, id)?;
    let to = to_index.min(blocks.len() - 1);
    if from == to {
        return Ok(false);
    }
    let block = blocks.remove(from);
    blocks.insert(to, block);
    renumber(blocks);
    Ok(true)
}

fn apply_delete(blocks: &mut Vec<ContentBlock>, id: &BlockId) -> bool {
    let Ok(i) = find(blocks, id) else {
        return false;
    };
    blocks.remove(i);
    renumber(blocks);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Breakpoint;
    use crate::content::{BlockContent, HeaderContent};
    use std::path::PathBuf;

    fn config(limit: usize, window_ms: u64) -> HistoryConfig {
        HistoryConfig {
            history_limit: limit,
            coalesce_window_ms: window_ms,
            max_revisions: 5,
            data_dir: PathBuf::from("."),
        }
    }

    fn manager() -> BlockHistoryManager {
        BlockHistoryManager::new(config(50, 60_000))
    }

    fn ids(mgr: &BlockHistoryManager) -> Vec<BlockId> {
        mgr.blocks().iter().map(|b| b.id().clone()).collect()
    }

    fn orders(mgr: &BlockHistoryManager) -> Vec<u32> {
        mgr.blocks().iter().map(|b| b.order).collect()
    }

    fn header(title: &str) -> BlockPatch {
        BlockPatch::content(BlockContent::Header(HeaderContent {
            title: title.to_string(),
            ..Default::default()
        }))
    }

    fn title_of(block: &ContentBlock) -> &str {
        match &block.content {
            BlockContent::Header(h) => &h.title,
            other => panic!("not a header: {other:?}"),
        }
    }

    // --- add ---

    #[test]
    fn test_add_block_inserts_with_defaults() {
        let mut mgr = manager();
        let id = mgr.add_block("HEADER", 0).expect("add");
        let block = mgr.block(&id).expect("exists");
        assert_eq!(block.block_type(), BlockType::Header);
        assert_eq!(block.order, 0);
        assert!(mgr.can_undo());
    }

    #[test]
    fn test_add_block_invalid_type() {
        let mut mgr = manager();
        let err = mgr.add_block("carousel", 0).unwrap_err();
        assert_eq!(err, BuilderError::InvalidBlockType("carousel".to_string()));
        assert!(mgr.blocks().is_empty());
        assert_eq!(mgr.history_len(), 1);
    }

    #[test]
    fn test_add_block_clamps_index() {
        let mut mgr = manager();
        let a = mgr.add_block("header", 0).expect("add");
        let b = mgr.add_block("menu", 99).expect("add");
        let c = mgr.add_block("hours", 0).expect("add");
        assert_eq!(ids(&mgr), vec![c, a, b]);
        assert_eq!(orders(&mgr), vec![0, 1, 2]);
    }

    #[test]
    fn test_custom_content_defaults() {
        struct Branded;
        impl ContentDefaults for Branded {
            fn default_content(&self, block_type: BlockType) -> BlockContent {
                match block_type {
                    BlockType::Header => BlockContent::Header(HeaderContent {
                        title: "Trattoria".to_string(),
                        ..Default::default()
                    }),
                    other => StockContent.default_content(other),
                }
            }
        }

        let mut mgr = manager().with_content_defaults(Branded);
        let id = mgr.add_block("header", 0).expect("add");
        assert_eq!(title_of(mgr.block(&id).expect("exists")), "Trattoria");
    }

    #[test]
    fn test_mismatched_defaults_rejected() {
        struct Wrong;
        impl ContentDefaults for Wrong {
            fn default_content(&self, _: BlockType) -> BlockContent {
                StockContent.default_content(BlockType::Menu)
            }
        }

        let mut mgr = manager().with_content_defaults(Wrong);
        assert!(matches!(
            mgr.add_block("gallery", 0),
            Err(BuilderError::ContentTypeMismatch { .. })
        ));
        assert!(!mgr.can_undo());
    }

    // --- update ---

    #[test]
    fn test_update_block_merges_and_records_step() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        mgr.update_block(&id, header("Bistro Luna")).expect("update");

        assert_eq!(title_of(mgr.block(&id).expect("exists")), "Bistro Luna");
        assert_eq!(mgr.history_len(), 3);
    }

    #[test]
    fn test_update_missing_block() {
        let mut mgr = manager();
        let err = mgr
            .update_block(&BlockId::from("ghost"), header("x"))
            .unwrap_err();
        assert_eq!(err, BuilderError::BlockNotFound("ghost".to_string()));
    }

    #[test]
    fn test_update_with_wrong_type_leaves_state() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        let before = mgr.snapshot();
        let err = mgr
            .update_block(
                &id,
                BlockPatch::content(StockContent.default_content(BlockType::Hours)),
            )
            .unwrap_err();
        assert!(matches!(err, BuilderError::ContentTypeMismatch { .. }));
        assert_eq!(&*mgr.snapshot(), &*before);
        assert_eq!(mgr.history_len(), 2);
    }

    #[test]
    fn test_noop_update_records_nothing() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        mgr.update_block(&id, BlockPatch::default()).expect("update");
        mgr.update_block(&id, BlockPatch::visibility(true)).expect("update");
        assert_eq!(mgr.history_len(), 2);
    }

    #[test]
    fn test_update_selected_block_visible_through_selection() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        mgr.select_block(Some(&id)).expect("select");
        mgr.update_block(&id, header("Updated")).expect("update");
        assert_eq!(title_of(mgr.selected_block().expect("selected")), "Updated");
    }

    #[test]
    fn test_hidden_block_is_retained() {
        let mut mgr = manager();
        let id = mgr.add_block("gallery", 0).expect("add");
        mgr.update_block(&id, BlockPatch::visibility(false))
            .expect("hide");
        assert_eq!(mgr.blocks().len(), 1);
        assert!(!mgr.blocks()[0].is_visible);
    }

    // --- live edits ---

    #[test]
    fn test_live_edits_coalesce() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        for title in ["B", "Bi", "Bis", "Bist"] {
            mgr.update_block_live(&id, header(title)).expect("live");
        }
        assert_eq!(mgr.history_len(), 3);
        assert!(mgr.undo());
        assert_eq!(title_of(&mgr.blocks()[0]), "Your Restaurant");
    }

    #[test]
    fn test_live_edit_typed_then_erased_leaves_no_step() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        let original = mgr.blocks()[0].content.clone();
        let revision = mgr.revision();

        mgr.update_block_live(&id, header("Your Restaurantx")).expect("live");
        mgr.update_block_live(&id, BlockPatch::content(original.clone()))
            .expect("live");

        assert_eq!(mgr.history_len(), 2);
        assert_eq!(mgr.revision(), revision);
        assert_eq!(mgr.blocks()[0].content, original);
        assert!(mgr.undo());
        assert!(mgr.blocks().is_empty());
    }

    #[test]
    fn test_live_edits_split_by_break() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        mgr.update_block_live(&id, header("One")).expect("live");
        mgr.break_coalescing();
        mgr.update_block_live(&id, header("Two")).expect("live");
        assert_eq!(mgr.history_len(), 4);
    }

    #[test]
    fn test_live_edits_do_not_swallow_add() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        mgr.update_block_live(&id, header("One")).expect("live");
        mgr.update_block_live(&id, header("Two")).expect("live");
        // Undoing the coalesced run must not remove the block itself.
        assert!(mgr.undo());
        assert_eq!(mgr.blocks().len(), 1);
        assert!(mgr.undo());
        assert!(mgr.blocks().is_empty());
    }

    // --- move ---

    #[test]
    fn test_move_block_renumbers() {
        let mut mgr = manager();
        let a = mgr.add_block("header", 0).expect("add");
        let b = mgr.add_block("menu", 1).expect("add");
        let c = mgr.add_block("hours", 2).expect("add");

        mgr.move_block(&a, 2).expect("move");
        assert_eq!(ids(&mgr), vec![b.clone(), c.clone(), a.clone()]);
        assert_eq!(orders(&mgr), vec![0, 1, 2]);

        mgr.move_block(&a, 0).expect("move");
        assert_eq!(ids(&mgr), vec![a, b, c]);
    }

    #[test]
    fn test_move_clamps_index() {
        let mut mgr = manager();
        let a = mgr.add_block("header", 0).expect("add");
        let b = mgr.add_block("menu", 1).expect("add");
        mgr.move_block(&a, 50).expect("move");
        assert_eq!(ids(&mgr), vec![b, a]);
    }

    #[test]
    fn test_move_missing_block() {
        let mut mgr = manager();
        assert!(matches!(
            mgr.move_block(&BlockId::from("ghost"), 0),
            Err(BuilderError::BlockNotFound(_))
        ));
    }

    #[test]
    fn test_move_to_same_position_records_nothing() {
        let mut mgr = manager();
        let a = mgr.add_block("header", 0).expect("add");
        mgr.add_block("menu", 1).expect("add");
        mgr.move_block(&a, 0).expect("move");
        assert_eq!(mgr.history_len(), 3);
    }

    // --- delete & selection ---

    #[test]
    fn test_delete_block_clears_selection() {
        let mut mgr = manager();
        let id = mgr.add_block("contact", 0).expect("add");
        mgr.select_block(Some(&id)).expect("select");
        assert!(mgr.delete_block(&id));
        assert!(mgr.selected_block_id().is_none());
        assert!(mgr.blocks().is_empty());
    }

    #[test]
    fn test_delete_keeps_other_selection() {
        let mut mgr = manager();
        let a = mgr.add_block("header", 0).expect("add");
        let b = mgr.add_block("menu", 1).expect("add");
        mgr.select_block(Some(&b)).expect("select");
        mgr.delete_block(&a);
        assert_eq!(mgr.selected_block_id(), Some(&b));
        assert_eq!(mgr.blocks()[0].order, 0);
    }

    #[test]
    fn test_delete_missing_changes_nothing() {
        let mut mgr = manager();
        mgr.add_block("header", 0).expect("add");
        let len = mgr.history_len();
        let index = mgr.history_index();
        let before = mgr.snapshot();

        assert!(!mgr.delete_block(&BlockId::from("ghost")));
        assert_eq!(mgr.history_len(), len);
        assert_eq!(mgr.history_index(), index);
        assert_eq!(&*mgr.snapshot(), &*before);
    }

    #[test]
    fn test_select_missing_block() {
        let mut mgr = manager();
        assert!(mgr.select_block(Some(&BlockId::from("ghost"))).is_err());
        assert!(mgr.selected_block_id().is_none());
    }

    #[test]
    fn test_selection_is_not_undoable() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        let len = mgr.history_len();
        mgr.select_block(Some(&id)).expect("select");
        assert_eq!(mgr.history_len(), len);
        mgr.select_block(None).expect("clear");
        assert!(mgr.selected_block().is_none());
    }

    #[test]
    fn test_undo_of_add_clears_dangling_selection() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        mgr.select_block(Some(&id)).expect("select");
        mgr.undo();
        assert!(mgr.selected_block_id().is_none());
    }

    // --- undo / redo ---

    #[test]
    fn test_undo_redo_round_trip() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        let before = mgr.snapshot();
        mgr.update_block(&id, header("After"))
            .expect("update");
        let after = mgr.snapshot();

        assert!(mgr.undo());
        assert_eq!(&*mgr.snapshot(), &*before);
        assert!(mgr.redo());
        assert_eq!(&*mgr.snapshot(), &*after);
    }

    #[test]
    fn test_new_edit_after_undo_discards_redo() {
        let mut mgr = manager();
        mgr.add_block("header", 0).expect("add");
        mgr.add_block("menu", 1).expect("add");
        mgr.undo();
        assert!(mgr.can_redo());

        mgr.add_block("hours", 0).expect("add");
        assert!(!mgr.can_redo());
        let before = mgr.snapshot();
        assert!(!mgr.redo());
        assert_eq!(&*mgr.snapshot(), &*before);
    }

    #[test]
    fn test_held_snapshot_unchanged_by_later_edits() {
        let mut mgr = manager();
        let id = mgr.add_block("header", 0).expect("add");
        let held = mgr.snapshot();
        mgr.update_block(&id, header("Changed"))
            .expect("update");
        mgr.update_block(&id, BlockPatch::default().with_style(Breakpoint::Mobile, "color", "red"))
            .expect("update");
        assert_eq!(title_of(&held[0]), "Your Restaurant");
        assert!(held[0].mobile_styles.is_empty());
    }

    #[test]
    fn test_revision_tracks_visible_state() {
        let mut mgr = manager();
        let r0 = mgr.revision();
        mgr.add_block("header", 0).expect("add");
        let r1 = mgr.revision();
        assert_ne!(r0, r1);
        mgr.undo();
        assert_eq!(mgr.revision(), r0);
    }

    // --- batch ---

    #[test]
    fn test_batch_is_one_step() {
        let mut mgr = manager();
        let added = mgr
            .apply_batch(vec![
                BlockEdit::Add {
                    block_type: BlockType::Header,
                    at_index: 0,
                },
                BlockEdit::Add {
                    block_type: BlockType::Menu,
                    at_index: 1,
                },
                BlockEdit::Update {
                    target: BlockRef::Position { position: 0 },
                    patch: header("Batch"),
                },
            ])
            .expect("batch");

        assert_eq!(added.len(), 2);
        assert_eq!(mgr.history_len(), 2);
        assert_eq!(title_of(&mgr.blocks()[0]), "Batch");
        assert!(mgr.undo());
        assert!(mgr.blocks().is_empty());
    }

    #[test]
    fn test_batch_failure_is_atomic() {
        let mut mgr = manager();
        mgr.add_block("header", 0).expect("add");
        let before = mgr.snapshot();
        let len = mgr.history_len();

        let err = mgr
            .apply_batch(vec![
                BlockEdit::Add {
                    block_type: BlockType::Menu,
                    at_index: 1,
                },
                BlockEdit::Move {
                    target: BlockId::from("ghost").into(),
                    to_index: 0,
                },
            ])
            .unwrap_err();

        assert!(matches!(err, BuilderError::BlockNotFound(_)));
        assert_eq!(&*mgr.snapshot(), &*before);
        assert_eq!(mgr.history_len(), len);
    }

    #[test]
    fn test_empty_batch_records_nothing() {
        let mut mgr = manager();
        assert!(mgr.apply_batch(Vec::new()).expect("batch").is_empty());
        assert!(!mgr.can_undo());
    }

    // --- construction ---

    #[test]
    fn test_with_blocks_sorts_and_renumbers() {
        let mut a = ContentBlock::new(StockContent.default_content(BlockType::Header));
        a.order = 7;
        let mut b = ContentBlock::new(StockContent.default_content(BlockType::Menu));
        b.order = 2;
        let (a_id, b_id) = (a.id().clone(), b.id().clone());

        let mgr = BlockHistoryManager::with_blocks(vec![a, b], config(50, 0)).expect("build");
        assert_eq!(ids(&mgr), vec![b_id, a_id]);
        assert_eq!(orders(&mgr), vec![0, 1]);
        assert!(!mgr.can_undo());
    }

    #[test]
    fn test_with_blocks_rejects_duplicate_ids() {
        let content = StockContent.default_content(BlockType::Header);
        let a = ContentBlock::with_id(BlockId::from("same"), content.clone());
        let b = ContentBlock::with_id(BlockId::from("same"), content);
        assert!(matches!(
            BlockHistoryManager::with_blocks(vec![a, b], config(50, 0)),
            Err(BuilderError::InvalidContent(_))
        ));
    }
}
