//! Block production and the ledger each simulated node runs its chain
//! through.

use std::collections::HashMap;

use canon_primitives::{buf::Buf32, id::BlockId};
use canon_state::{
    block::{Block, BlockBody},
    genesis::make_genesis_block,
    header::BlockHeader,
    params::Params,
    transition::{StateTransition, TsnError},
};
use tracing::*;

/// Produces a chain of blocks signed off by one staker.
pub struct Staker {
    key: Buf32,
    genesis_timestamp: u64,
    tip: (BlockId, u64),
    nonce: u64,
}

impl Staker {
    /// Starts staking on top of the genesis the params imply.
    pub fn new(params: &Params, key: Buf32) -> Self {
        let genesis = make_genesis_block(params);
        Self {
            key,
            genesis_timestamp: params.genesis_timestamp,
            tip: (genesis.get_blockid(), genesis.header().height()),
            nonce: 0,
        }
    }

    pub fn produce(&mut self, weight: u64) -> Block {
        let (parent, parent_height) = self.tip;
        let height = parent_height + 1;

        self.nonce += 1;
        let mut payload = self.key.as_ref().to_vec();
        payload.extend_from_slice(&self.nonce.to_le_bytes());
        let body = BlockBody::new(payload);

        let header = BlockHeader::new(
            height,
            self.genesis_timestamp + height,
            parent,
            weight,
            self.key,
            &body,
        );
        let block = Block::new(header, body);
        self.tip = (block.get_blockid(), height);
        block
    }

    pub fn produce_chain(&mut self, len: usize, weight: u64) -> Vec<Block> {
        (0..len).map(|_| self.produce(weight)).collect()
    }
}

/// Stake credited to each staker along the active chain.
#[derive(Debug, Default)]
pub struct StakeLedger {
    applied: Vec<BlockId>,
    balances: HashMap<Buf32, u128>,
}

impl StakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn tip(&self) -> BlockId {
        self.applied.last().copied().unwrap_or_else(BlockId::null)
    }
}

impl StateTransition for StakeLedger {
    fn apply_block(&mut self, block: &Block) -> Result<(), TsnError> {
        let blkid = block.get_blockid();
        let tip = self.tip();
        if *block.header().parent() != tip {
            return Err(TsnError::MismatchParent(blkid, tip));
        }

        let header = block.header();
        *self.balances.entry(*header.staker()).or_default() += header.weight() as u128;
        self.applied.push(blkid);
        trace!(%blkid, staker = %header.staker(), "credited stake");
        Ok(())
    }

    fn undo_block(&mut self, block: &Block) -> Result<(), TsnError> {
        let blkid = block.get_blockid();
        let tip = self.tip();
        if blkid != tip {
            return Err(TsnError::UndoNotTip(blkid, tip));
        }

        let header = block.header();
        let Some(bal) = self.balances.get_mut(header.staker()) else {
            return Err(TsnError::UndoFailed(blkid, "staker has no balance".to_owned()));
        };
        *bal -= header.weight() as u128;
        if *bal == 0 {
            self.balances.remove(header.staker());
        }
        self.applied.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stakers_fork_from_genesis() {
        let params = Params::default();
        let genesis = make_genesis_block(&params).get_blockid();
        let a = Staker::new(&params, Buf32::from([1; 32])).produce_chain(2, 1);
        let b = Staker::new(&params, Buf32::from([2; 32])).produce_chain(2, 1);

        assert_eq!(*a[0].header().parent(), genesis);
        assert_eq!(*b[0].header().parent(), genesis);
        assert_eq!(*a[1].header().parent(), a[0].get_blockid());
        assert_ne!(a[0].get_blockid(), b[0].get_blockid());
        assert_eq!(a[1].header().height(), 2);
    }

    #[test]
    fn test_ledger_undo_restores_balances() {
        let params = Params::default();
        let genesis = make_genesis_block(&params);
        let key = Buf32::from([3; 32]);
        let chain = Staker::new(&params, key).produce_chain(2, 4);

        let mut ledger = StakeLedger::new();
        ledger.apply_block(&genesis).unwrap();
        ledger.apply_block(&chain[0]).unwrap();
        ledger.apply_block(&chain[1]).unwrap();
        assert_eq!(ledger.balances.get(&key).copied(), Some(8));

        assert!(matches!(
            ledger.undo_block(&chain[0]),
            Err(TsnError::UndoNotTip(..))
        ));
        ledger.undo_block(&chain[1]).unwrap();
        ledger.undo_block(&chain[0]).unwrap();
        assert_eq!(ledger.balances.get(&key), None);
        assert_eq!(ledger.tip(), genesis.get_blockid());
    }
}
