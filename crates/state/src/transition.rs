//! Interface to whatever state the chain drives.  The chain selection logic
//! only needs to walk that state forwards and backwards one block at a time.

use canon_primitives::id::BlockId;
use thiserror::Error;

use crate::block::Block;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum TsnError {
    #[error("block {0:?} does not build on state tip {1:?}")]
    MismatchParent(BlockId, BlockId),

    #[error("tried to undo {0:?} but state tip is {1:?}")]
    UndoNotTip(BlockId, BlockId),

    #[error("block {0:?} rejected: {1}")]
    Rejected(BlockId, String),

    #[error("undo of {0:?} failed: {1}")]
    UndoFailed(BlockId, String),
}

/// Reversible state mutation.  `undo_block` must exactly invert a previous
/// `apply_block` of the same block, and is only ever called on the most
/// recently applied block.
pub trait StateTransition {
    /// Applies a block on top of the current state.  On error the state must
    /// be left as it was.
    fn apply_block(&mut self, block: &Block) -> Result<(), TsnError>;

    /// Undoes the most recently applied block.  On error the state must be
    /// left as it was.
    fn undo_block(&mut self, block: &Block) -> Result<(), TsnError>;
}
