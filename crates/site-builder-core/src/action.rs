/// Serializable edit vocabulary and dispatch onto the manager.
///
/// UI event handlers and replay scripts describe what the user did as a
/// `BuilderAction`; `BlockHistoryManager::dispatch` routes it to the
/// matching operation.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::block::{BlockId, BlockPatch, BlockType, ContentBlock};
use crate::error::{BuilderError, Result};
use crate::manager::BlockHistoryManager;

/// Names a block either by id or by its current position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockRef {
    Position { position: usize },
    Id(BlockId),
}

impl BlockRef {
    /// Index of the referenced block in `blocks`, if present.
    pub fn position_in(&self, blocks: &[ContentBlock]) -> Option<usize> {
        match self {
            BlockRef::Position { position } => (*position < blocks.len()).then_some(*position),
            BlockRef::Id(id) => blocks.iter().position(|b| b.id() == id),
        }
    }

    /// Resolves to the id of the referenced block.
    pub fn resolve(&self, blocks: &[ContentBlock]) -> Result<BlockId> {
        self.position_in(blocks)
            .map(|i| blocks[i].id().clone())
            .ok_or_else(|| BuilderError::BlockNotFound(self.to_string()))
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockRef::Position { position } => write!(f, "position {position}"),
            BlockRef::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<BlockId> for BlockRef {
    fn from(id: BlockId) -> Self {
        BlockRef::Id(id)
    }
}

impl From<&BlockId> for BlockRef {
    fn from(id: &BlockId) -> Self {
        BlockRef::Id(id.clone())
    }
}

/// One step of an atomic batch. Positions resolve against the list as it
/// stands when the step runs, including earlier steps of the same batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum BlockEdit {
    Add {
        block_type: BlockType,
        at_index: usize,
    },
    Update {
        target: BlockRef,
        patch: BlockPatch,
    },
    Move {
        target: BlockRef,
        to_index: usize,
    },
    Delete {
        target: BlockRef,
    },
}

/// A user action against the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BuilderAction {
    /// Drop a palette component onto the canvas.
    Add { block_type: String, at_index: usize },
    /// Property-panel submission.
    Update { target: BlockRef, patch: BlockPatch },
    /// Keystroke-level edit, coalesced with neighbours.
    UpdateLive { target: BlockRef, patch: BlockPatch },
    Move { target: BlockRef, to_index: usize },
    Delete { target: BlockRef },
    Select { target: Option<BlockRef> },
    Undo,
    Redo,
    Batch { edits: Vec<BlockEdit> },
}

/// What a dispatched action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Blocks were created, in creation order.
    Added(Vec<BlockId>),
    /// State or selection changed.
    Applied,
    /// Nothing to do (no-op delete, undo at start of history, ...).
    Unchanged,
}

impl ActionOutcome {
    fn from_changed(changed: bool) -> Self {
        if changed {
            ActionOutcome::Applied
        } else {
            ActionOutcome::Unchanged
        }
    }
}

impl BlockHistoryManager {
    /// Applies one action. Errors leave the manager untouched.
    pub fn dispatch(&mut self, action: BuilderAction) -> Result<ActionOutcome> {
        let before = self.revision();
        let outcome = match action {
            BuilderAction::Add {
                block_type,
                at_index,
            } => ActionOutcome::Added(vec![self.add_block(&block_type, at_index)?]),
            BuilderAction::Update { target, patch } => {
                let id = target.resolve(self.blocks())?;
                self.update_block(&id, patch)?;
                ActionOutcome::from_changed(self.revision() != before)
            }
            BuilderAction::UpdateLive { target, patch } => {
                let id = target.resolve(self.blocks())?;
                self.update_block_live(&id, patch)?;
                ActionOutcome::from_changed(self.revision() != before)
            }
            BuilderAction::Move { target, to_index } => {
                let id = target.resolve(self.blocks())?;
                self.move_block(&id, to_index)?;
                ActionOutcome::from_changed(self.revision() != before)
            }
            BuilderAction::Delete { target } => {
                let deleted = match target.position_in(self.blocks()) {
                    Some(i) => {
                        let id = self.blocks()[i].id().clone();
                        self.delete_block(&id)
                    }
                    None => false,
                };
                ActionOutcome::from_changed(deleted)
            }
            BuilderAction::Select { target } => {
                let id = target.map(|t| t.resolve(self.blocks())).transpose()?;
                self.select_block(id.as_ref())?;
                ActionOutcome::Applied
            }
            BuilderAction::Undo => ActionOutcome::from_changed(self.undo()),
            BuilderAction::Redo => ActionOutcome::from_changed(self.redo()),
            BuilderAction::Batch { edits } => {
                let added = self.apply_batch(edits)?;
                if added.is_empty() {
                    ActionOutcome::from_changed(self.revision() != before)
                } else {
                    ActionOutcome::Added(added)
                }
            }
        };
        Ok(outcome)
    }
}
