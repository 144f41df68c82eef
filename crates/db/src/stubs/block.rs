use std::collections::*;

use canon_primitives::id::BlockId;
use canon_state::block::Block;
use parking_lot::Mutex;

use crate::{errors::*, traits::*};

/// Block store backed by hashmaps.  Each table has its own lock, which is
/// fine since the fork choice manager is the only writer.
#[derive(Debug, Default)]
pub struct StubBlockDb {
    blocks: Mutex<HashMap<BlockId, Block>>,
    statuses: Mutex<HashMap<BlockId, BlockStatus>>,
    heights: Mutex<BTreeMap<u64, Vec<BlockId>>>,
}

impl StubBlockDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks stored.
    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlockDatabase for StubBlockDb {
    fn put_block(&self, block: Block) -> DbResult<()> {
        let blkid = block.get_blockid();
        let height = block.header().height();

        {
            let mut tbl = self.blocks.lock();
            if tbl.contains_key(&blkid) {
                return Ok(());
            }
            tbl.insert(blkid, block);
        }

        {
            let mut tbl = self.heights.lock();
            tbl.entry(height).or_default().push(blkid);
        }

        {
            let mut tbl = self.statuses.lock();
            tbl.entry(blkid).or_insert(BlockStatus::Valid);
        }

        Ok(())
    }

    fn get_block(&self, id: BlockId) -> DbResult<Option<Block>> {
        let tbl = self.blocks.lock();
        Ok(tbl.get(&id).cloned())
    }

    fn get_blocks_at_height(&self, height: u64) -> DbResult<Vec<BlockId>> {
        let tbl = self.heights.lock();
        Ok(tbl.get(&height).cloned().unwrap_or_default())
    }

    fn set_block_status(&self, id: BlockId, status: BlockStatus) -> DbResult<()> {
        if !self.blocks.lock().contains_key(&id) {
            return Err(DbError::MissingBlock(id));
        }

        let mut tbl = self.statuses.lock();
        tbl.insert(id, status);
        Ok(())
    }

    fn get_block_status(&self, id: BlockId) -> DbResult<Option<BlockStatus>> {
        let tbl = self.statuses.lock();
        Ok(tbl.get(&id).copied())
    }
}
