//! Builders for trees of blocks sharing one genesis.

use std::collections::HashMap;

use canon_primitives::{buf::Buf32, id::BlockId};
use canon_state::{
    block::{Block, BlockBody},
    genesis::make_genesis_block,
    header::BlockHeader,
    params::Params,
};

/// Default params shared by every node in tests, so they all agree on
/// genesis.
pub fn gen_params() -> Params {
    Params {
        genesis_timestamp: 1_700_000_000,
        genesis_weight: 1,
    }
}

/// Builds blocks on top of a genesis block, remembering everything it built
/// so it can extend any of them later.  Every block gets a fresh nonce in its
/// payload, so two siblings with the same weight still have distinct IDs.
pub struct ChainBuilder {
    params: Params,
    genesis: Block,
    blocks: HashMap<BlockId, Block>,
    tip: BlockId,
    nonce: u64,
    staker: Buf32,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::with_params(gen_params())
    }

    pub fn with_params(params: Params) -> Self {
        let genesis = make_genesis_block(&params);
        let genesis_id = genesis.get_blockid();
        let mut blocks = HashMap::new();
        blocks.insert(genesis_id, genesis.clone());
        Self {
            params,
            genesis,
            blocks,
            tip: genesis_id,
            nonce: 0,
            staker: Buf32::zero(),
        }
    }

    /// Sets the staker key for blocks built from now on.
    pub fn set_staker(&mut self, staker: Buf32) {
        self.staker = staker;
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn genesis(&self) -> &Block {
        &self.genesis
    }

    /// The last block built, or genesis.
    pub fn tip(&self) -> BlockId {
        self.tip
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Builds a child of some block this builder already knows.
    pub fn child_of(&mut self, parent: BlockId, weight: u64) -> Block {
        let parent_height = self
            .blocks
            .get(&parent)
            .map(|b| b.header().height())
            .expect("test: unknown parent");

        self.nonce += 1;
        let height = parent_height + 1;
        let body = BlockBody::new(self.nonce.to_le_bytes().to_vec());
        let header = BlockHeader::new(
            height,
            self.params.genesis_timestamp + height,
            parent,
            weight,
            self.staker,
            &body,
        );
        let block = Block::new(header, body);
        let blkid = block.get_blockid();
        self.blocks.insert(blkid, block.clone());
        self.tip = blkid;
        block
    }

    /// Builds a child of the last block built.
    pub fn extend_tip(&mut self, weight: u64) -> Block {
        self.child_of(self.tip, weight)
    }

    /// Builds a chain of blocks with the given weights on top of `parent`,
    /// lowest first.
    pub fn build_chain(&mut self, parent: BlockId, weights: &[u64]) -> Vec<Block> {
        let mut out = Vec::with_capacity(weights.len());
        let mut cur = parent;
        for w in weights {
            let block = self.child_of(cur, *w);
            cur = block.get_blockid();
            out.push(block);
        }
        out
    }

    /// Builds `n` blocks of weight `weight` on top of `parent`.
    pub fn build_uniform_chain(&mut self, parent: BlockId, n: usize, weight: u64) -> Vec<Block> {
        self.build_chain(parent, &vec![weight; n])
    }

    /// Returns the blocks from genesis (exclusive) to `tip` (inclusive),
    /// lowest first.
    pub fn path_to(&self, tip: BlockId) -> Vec<Block> {
        let mut out = Vec::new();
        let mut cur = tip;
        while let Some(block) = self.blocks.get(&cur) {
            if block.header().is_genesis() {
                break;
            }
            out.push(block.clone());
            cur = *block.header().parent();
        }
        out.reverse();
        out
    }
}
