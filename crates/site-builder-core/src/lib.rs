/// Content blocks for the restaurant site builder and their edit history.
///
/// `BlockHistoryManager` owns the ordered block list of one site, the
/// current selection, and a bounded linear undo/redo history. Everything
/// here is synchronous and in-memory; `Autosaver` is the only piece that
/// touches disk.
pub mod action;
pub mod autosave;
pub mod block;
pub mod content;
pub mod error;
pub mod history;
pub mod manager;

pub use action::{ActionOutcome, BlockEdit, BlockRef, BuilderAction};
pub use autosave::Autosaver;
pub use block::{BlockId, BlockPatch, BlockType, Breakpoint, ContentBlock, StyleMap};
pub use content::{BlockContent, ContentDefaults, StockContent};
pub use error::BuilderError;
pub use manager::{BlockHistoryManager, BlockList};
