//! Blocks whose parent we haven't seen yet.

use std::collections::{HashMap, VecDeque};

use canon_primitives::id::BlockId;
use canon_state::block::Block;
use tracing::*;

/// Bounded holding area for orphan blocks.  When full, the oldest orphan is
/// dropped to make room.
pub struct OrphanPool {
    max_blocks: usize,
    blocks: HashMap<BlockId, Block>,
    by_parent: HashMap<BlockId, Vec<BlockId>>,

    /// Arrival order, may contain ids that were already taken out.
    order: VecDeque<BlockId>,
}

impl OrphanPool {
    pub fn new(max_blocks: usize) -> Self {
        Self {
            max_blocks,
            blocks: HashMap::new(),
            by_parent: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, blkid: &BlockId) -> bool {
        self.blocks.contains_key(blkid)
    }

    /// Adds an orphan, returning the blkids evicted to make room.
    pub fn insert(&mut self, block: Block) -> Vec<BlockId> {
        let blkid = block.get_blockid();
        if self.max_blocks == 0 {
            return vec![blkid];
        }

        if self.blocks.contains_key(&blkid) {
            return Vec::new();
        }

        let mut evicted = Vec::new();
        while self.blocks.len() >= self.max_blocks {
            match self.order.pop_front() {
                Some(old) => {
                    if self.remove(&old).is_some() {
                        evicted.push(old);
                    }
                }
                None => break,
            }
        }

        if !evicted.is_empty() {
            debug!(?evicted, "evicted orphan blocks");
        }

        self.by_parent
            .entry(*block.header().parent())
            .or_default()
            .push(blkid);
        self.order.push_back(blkid);
        self.blocks.insert(blkid, block);

        if self.order.len() > self.max_blocks * 2 {
            let blocks = &self.blocks;
            self.order.retain(|id| blocks.contains_key(id));
        }

        evicted
    }

    /// Removes and returns every orphan whose parent is `parent`.
    pub fn take_children(&mut self, parent: &BlockId) -> Vec<Block> {
        let Some(ids) = self.by_parent.remove(parent) else {
            return Vec::new();
        };

        ids.into_iter()
            .filter_map(|id| self.blocks.remove(&id))
            .collect()
    }

    fn remove(&mut self, blkid: &BlockId) -> Option<Block> {
        let block = self.blocks.remove(blkid)?;
        let parent = block.header().parent();
        if let Some(siblings) = self.by_parent.get_mut(parent) {
            siblings.retain(|id| id != blkid);
            if siblings.is_empty() {
                self.by_parent.remove(parent);
            }
        }
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use canon_test_utils::chain::ChainBuilder;

    use super::*;

    #[test]
    fn test_take_children() {
        let mut builder = ChainBuilder::new();
        let g = builder.genesis().get_blockid();
        let chain = builder.build_uniform_chain(g, 3, 1);
        let sibling = builder.child_of(chain[0].get_blockid(), 2);

        let mut pool = OrphanPool::new(10);
        pool.insert(chain[1].clone());
        pool.insert(chain[2].clone());
        pool.insert(sibling.clone());
        assert_eq!(pool.len(), 3);

        let mut kids = pool.take_children(&chain[0].get_blockid());
        kids.sort_by_key(|b| b.get_blockid());
        let mut expected = vec![chain[1].clone(), sibling];
        expected.sort_by_key(|b| b.get_blockid());
        assert_eq!(kids, expected);

        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&chain[2].get_blockid()));
        assert!(pool.take_children(&chain[0].get_blockid()).is_empty());
    }

    #[test]
    fn test_evicts_oldest() {
        let mut builder = ChainBuilder::new();
        let g = builder.genesis().get_blockid();
        let chain = builder.build_uniform_chain(g, 4, 1);

        let mut pool = OrphanPool::new(2);
        assert!(pool.insert(chain[1].clone()).is_empty());
        assert!(pool.insert(chain[2].clone()).is_empty());
        assert!(pool.insert(chain[2].clone()).is_empty());
        assert_eq!(pool.insert(chain[3].clone()), vec![chain[1].get_blockid()]);

        assert_eq!(pool.len(), 2);
        assert!(!pool.contains(&chain[1].get_blockid()));
        assert!(pool.take_children(&chain[0].get_blockid()).is_empty());
    }

    #[test]
    fn test_zero_capacity() {
        let mut builder = ChainBuilder::new();
        let b = builder.extend_tip(1);
        let mut pool = OrphanPool::new(0);
        assert_eq!(pool.insert(b.clone()), vec![b.get_blockid()]);
        assert!(pool.is_empty());
    }
}
