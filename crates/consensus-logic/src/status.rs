//! Read side of the chain state.  The fork choice worker is the only writer,
//! everyone else reads consistent snapshots through a [`ChainStatusHandle`].

use std::sync::Arc;

use canon_primitives::{id::BlockId, weight::ChainWeight};
use canon_state::block::Block;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;

use crate::{active_chain::ActiveChain, errors::QueryError, tip_tracker::ChainTip};

#[derive(Clone, Debug)]
pub struct ChainStatus {
    pub(crate) active: ActiveChain,
    pub(crate) tip_block: Block,
    pub(crate) tips: Vec<ChainTip>,
}

impl ChainStatus {
    pub(crate) fn new(active: ActiveChain, tip_block: Block, tips: Vec<ChainTip>) -> Self {
        Self {
            active,
            tip_block,
            tips,
        }
    }

    pub fn active(&self) -> &ActiveChain {
        &self.active
    }

    pub fn current_tip(&self) -> ChainTip {
        ChainTip::new(
            self.active.tip(),
            self.active.height(),
            self.active.weight(),
        )
    }

    pub fn current_tip_block(&self) -> &Block {
        &self.tip_block
    }

    pub fn height(&self) -> u64 {
        self.active.height()
    }

    /// Looks up the canonical block at a height.
    pub fn block_hash(&self, height: u64) -> Result<BlockId, QueryError> {
        self.active
            .block_hash(height)
            .ok_or(QueryError::HeightOutOfRange(height))
    }

    /// Height of any known tip.
    pub fn tip_height(&self, blkid: &BlockId) -> Option<u64> {
        self.tips
            .iter()
            .find(|t| t.blkid == *blkid)
            .map(|t| t.height)
    }

    pub fn tips(&self) -> &[ChainTip] {
        &self.tips
    }

    pub fn chain_info(&self) -> ChainInfo {
        let active_tip = self.active.tip();
        ChainInfo {
            blocks: self.active.height(),
            best_block_hash: active_tip,
            chain_weight: self.active.weight(),
            tips: self
                .tips
                .iter()
                .map(|t| TipInfo {
                    blkid: t.blkid,
                    height: t.height,
                    weight: t.weight,
                    active: t.blkid == active_tip,
                })
                .collect(),
        }
    }
}

/// Summary of the chain, in the spirit of `getblockchaininfo`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChainInfo {
    /// Height of the active tip.
    pub blocks: u64,
    pub best_block_hash: BlockId,
    pub chain_weight: ChainWeight,
    pub tips: Vec<TipInfo>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TipInfo {
    pub blkid: BlockId,
    pub height: u64,
    pub weight: ChainWeight,
    pub active: bool,
}

/// Shared handle to the chain status.  Cloning is cheap.
#[derive(Clone, Debug)]
pub struct ChainStatusHandle {
    inner: Arc<RwLock<ChainStatus>>,
}

impl ChainStatusHandle {
    pub(crate) fn new(status: ChainStatus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(status)),
        }
    }

    /// Takes a read lock for looking at several things at once consistently.
    pub fn read(&self) -> RwLockReadGuard<'_, ChainStatus> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ChainStatus> {
        self.inner.write()
    }

    pub fn current_tip(&self) -> ChainTip {
        self.read().current_tip()
    }

    pub fn current_tip_block(&self) -> Block {
        self.read().current_tip_block().clone()
    }

    pub fn height(&self) -> u64 {
        self.read().height()
    }

    pub fn block_hash(&self, height: u64) -> Result<BlockId, QueryError> {
        self.read().block_hash(height)
    }

    pub fn tip_height(&self, blkid: &BlockId) -> Option<u64> {
        self.read().tip_height(blkid)
    }

    pub fn tips(&self) -> Vec<ChainTip> {
        self.read().tips().to_vec()
    }

    pub fn chain_info(&self) -> ChainInfo {
        self.read().chain_info()
    }
}
