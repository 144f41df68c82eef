//! Tracks the blocks that have no known children.

use std::collections::HashMap;

use canon_primitives::{id::BlockId, weight::ChainWeight};
use serde::{Deserialize, Serialize};

/// A block with no known child, along with what fork choice compares it by.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ChainTip {
    pub blkid: BlockId,
    pub height: u64,
    pub weight: ChainWeight,
}

impl ChainTip {
    pub fn new(blkid: BlockId, height: u64, weight: ChainWeight) -> Self {
        Self {
            blkid,
            height,
            weight,
        }
    }
}

#[derive(Debug, Default)]
pub struct TipTracker {
    tips: HashMap<BlockId, ChainTip>,
}

impl TipTracker {
    pub fn new_with_tip(tip: ChainTip) -> Self {
        let mut tips = HashMap::new();
        tips.insert(tip.blkid, tip);
        Self { tips }
    }

    /// Registers a newly attached block as a tip.  If its parent was a tip,
    /// the parent is demoted.
    ///
    /// Returns if the block forks off and creates a new lineage instead of
    /// extending an existing tip.
    pub fn register_block(&mut self, tip: ChainTip, parent: &BlockId) -> bool {
        let did_replace = self.tips.remove(parent).is_some();
        self.tips.insert(tip.blkid, tip);
        !did_replace
    }

    /// Reinstates a block as a tip, used when all its children were dropped.
    pub fn insert_tip(&mut self, tip: ChainTip) {
        self.tips.insert(tip.blkid, tip);
    }

    pub fn remove_tip(&mut self, blkid: &BlockId) -> Option<ChainTip> {
        self.tips.remove(blkid)
    }

    pub fn get(&self, blkid: &BlockId) -> Option<&ChainTip> {
        self.tips.get(blkid)
    }

    pub fn contains(&self, blkid: &BlockId) -> bool {
        self.tips.contains_key(blkid)
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainTip> {
        self.tips.values()
    }

    /// Snapshot of the tips, ordered by blkid so it doesn't depend on
    /// insertion order.
    pub fn list_tips(&self) -> Vec<ChainTip> {
        let mut tips = self.tips.values().copied().collect::<Vec<_>>();
        tips.sort_by_key(|t| t.blkid);
        tips
    }
}
