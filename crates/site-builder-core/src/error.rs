/// Errors reported by block operations.
///
/// All of these are local and non-fatal: the manager's state is left
/// untouched when one is returned, and callers usually just log it.
use thiserror::Error;

use crate::block::BlockType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    /// No block matches the given reference.
    #[error("block not found: {0}")]
    BlockNotFound(String),

    /// The block type name is not one of the known kinds.
    #[error("invalid block type: {0:?}")]
    InvalidBlockType(String),

    /// Content of one kind was supplied for a block of another kind.
    #[error("content type mismatch: block is {expected}, content is {found}")]
    ContentTypeMismatch { expected: BlockType, found: BlockType },

    /// Content failed validation.
    #[error("invalid content: {0}")]
    InvalidContent(String),
}

pub type Result<T, E = BuilderError> = std::result::Result<T, E>;
