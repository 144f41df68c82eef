//! Trait definitions for low level database interfaces.

use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use canon_primitives::id::BlockId;
use canon_state::block::Block;
#[cfg(feature = "mocks")]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::DbResult;

/// Common database interface that we can parameterize worker tasks over
/// instead of carrying around each store separately.
pub trait Database {
    type BlockDB: BlockDatabase + Send + Sync;
    type ChainstateDB: ChainstateDatabase + Send + Sync;

    fn block_db(&self) -> &Arc<Self::BlockDB>;
    fn chainstate_db(&self) -> &Arc<Self::ChainstateDB>;
}

/// Block store.  Does not store anything about what we think the chain tip
/// is, that's the chainstate db's job.
#[cfg_attr(feature = "mocks", automock)]
pub trait BlockDatabase {
    /// Stores a block.  Storing the same block again is a no-op.  A block is
    /// stored with status `Valid`, unless a status was already set for it.
    fn put_block(&self, block: Block) -> DbResult<()>;

    /// Gets a block by its ID, if we have it.
    fn get_block(&self, id: BlockId) -> DbResult<Option<Block>>;

    /// Gets the IDs of all the blocks we have at some height, in case there's
    /// more than one on competing forks.
    fn get_blocks_at_height(&self, height: u64) -> DbResult<Vec<BlockId>>;

    /// Sets the block's validity status.  Errors if the block isn't stored.
    fn set_block_status(&self, id: BlockId, status: BlockStatus) -> DbResult<()>;

    /// Gets the validity status of a block.
    fn get_block_status(&self, id: BlockId) -> DbResult<Option<BlockStatus>>;
}

/// Validity status of a stored block.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum BlockStatus {
    /// Block has not been found invalid.  This doesn't mean it's in the
    /// canonical chain.
    Valid,

    /// Block failed to apply, or descends from a block that did.
    Invalid,
}

/// Stores the pointer to the active chain tip, so the node knows where it was
/// when it restarts.
#[cfg_attr(feature = "mocks", automock)]
pub trait ChainstateDatabase {
    /// Durably records the active tip.  A reorg isn't complete until this
    /// returns successfully.
    fn set_active_tip(&self, tip: BlockId) -> DbResult<()>;

    /// Gets the last recorded active tip, if one was ever written.
    fn get_active_tip(&self) -> DbResult<Option<BlockId>>;
}
