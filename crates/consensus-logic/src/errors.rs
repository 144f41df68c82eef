use canon_db::errors::DbError;
use canon_primitives::id::BlockId;
use canon_state::block_validation::BlockValidationError;
pub use canon_state::transition::TsnError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("blkid {0:?} missing from database")]
    MissingBlock(BlockId),

    #[error("no genesis block in database")]
    MissingGenesis,

    #[error("ancestry of {0:?} can't be traced back to genesis")]
    UnknownAncestor(BlockId),

    #[error("accumulated weight overflowed at {0:?}")]
    WeightOverflow(BlockId),

    #[error("no common ancestor between {0:?} and {1:?}")]
    DisjointChains(BlockId, BlockId),

    #[error("tried to reorg too deep ({0} blocks, limit {1})")]
    ReorgTooDeep(usize, usize),

    #[error("active tip is {0:?} but reorg starts from {1:?}")]
    StaleReorg(BlockId, BlockId),

    #[error("invalid block {0:?}: {1}")]
    InvalidBlock(BlockId, BlockValidationError),

    #[error("invalid state transition on block {0:?}: {1}")]
    InvalidStateTsn(BlockId, TsnError),

    #[error("failed to undo block {0:?}: {1}")]
    UndoFailed(BlockId, TsnError),

    #[error("failed to restore state at block {0:?}: {1}")]
    RollbackFailed(BlockId, TsnError),

    #[error("failed to persist active tip {0:?}: {1}")]
    Persistence(BlockId, DbError),

    #[error("chaintip: {0}")]
    ChainTip(#[from] ChainTipError),

    #[error("db: {0}")]
    Db(#[from] DbError),

    #[error("fork choice worker exited")]
    WorkerExited,
}

impl Error {
    /// Fatal errors mean our view of the chain or the state can no longer be
    /// trusted, so the fork choice worker stops.  Everything else only
    /// affects the block that caused it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DisjointChains(..)
                | Error::Persistence(..)
                | Error::RollbackFailed(..)
                | Error::Db(_)
        )
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ChainTipError {
    #[error("tried to attach blkid {0:?} but missing parent blkid {1:?}")]
    AttachMissingParent(BlockId, BlockId),

    #[error("block {0:?} claims height {1} but parent is at {2}")]
    InvalidHeight(BlockId, u64, u64),

    #[error("block {0:?} not in block index")]
    MissingBlock(BlockId),
}

/// Errors from the read-only query surface.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum QueryError {
    #[error("Block height out of range")]
    HeightOutOfRange(u64),
}
