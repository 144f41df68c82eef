use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use canon_primitives::{buf::Buf32, hash, id::BlockId};
use serde::{Deserialize, Serialize};

use crate::block::BlockBody;

/// Block header that forms the chain we use to reach consensus.
#[derive(
    Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize, Serialize, Deserialize,
)]
pub struct BlockHeader {
    /// Height of the block, parent height + 1.  Genesis is at 0.
    pub(crate) height: u64,

    /// Timestamp the block was staked at.
    pub(crate) timestamp: u64,

    /// Hash of the previous block, to form the blockchain.  Null for genesis.
    pub(crate) prev_block: BlockId,

    /// Intrinsic weight this block contributes to its chain, derived by the
    /// staking layer from the kernel it was produced with.
    pub(crate) weight: u64,

    /// Key of the staker that produced the block.
    pub(crate) staker: Buf32,

    /// Hash of the block body.
    pub(crate) body_hash: Buf32,
}

impl BlockHeader {
    /// Creates a new header, computing the body hash from the passed body.
    pub fn new(
        height: u64,
        timestamp: u64,
        prev_block: BlockId,
        weight: u64,
        staker: Buf32,
        body: &BlockBody,
    ) -> Self {
        Self {
            height,
            timestamp,
            prev_block,
            weight,
            staker,
            body_hash: body.compute_hash(),
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn parent(&self) -> &BlockId {
        &self.prev_block
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    pub fn staker(&self) -> &Buf32 {
        &self.staker
    }

    pub fn body_hash(&self) -> &Buf32 {
        &self.body_hash
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// Computes the block's ID, which commits to every header field.
    pub fn get_blockid(&self) -> BlockId {
        hash::compute_borsh_hash(self).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(weight: u64) -> BlockHeader {
        let body = BlockBody::new(vec![1, 2, 3]);
        BlockHeader::new(1, 100, BlockId::from([9u8; 32]), weight, Buf32::zero(), &body)
    }

    #[test]
    fn test_blockid_commits_to_weight() {
        assert_eq!(header(3).get_blockid(), header(3).get_blockid());
        assert_ne!(header(3).get_blockid(), header(4).get_blockid());
    }

    #[test]
    fn test_header_serde_json() {
        let h = header(7);
        let json = serde_json::to_string(&h).unwrap();
        let back: BlockHeader = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get_blockid(), h.get_blockid());
    }
}
