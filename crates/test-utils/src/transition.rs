//! A state transition that keeps a toy staking ledger and records every call,
//! with hooks to make particular blocks fail.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use canon_primitives::{buf::Buf32, id::BlockId};
use canon_state::{
    block::Block,
    transition::{StateTransition, TsnError},
};
use parking_lot::Mutex;

/// Observable state after some sequence of applies and undos.  Two
/// transitions that end up with equal snapshots are indistinguishable.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LedgerSnapshot {
    /// Blocks currently applied, lowest first.
    pub applied: Vec<BlockId>,

    /// Sum of block weights credited to each staker.
    pub balances: BTreeMap<Buf32, u128>,
}

impl LedgerSnapshot {
    /// Snapshot of a ledger that applied exactly `blocks`, in order.
    pub fn from_blocks<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Self {
        let mut snap = Self::default();
        for b in blocks {
            snap.credit(b);
        }
        snap
    }

    pub fn tip(&self) -> Option<BlockId> {
        self.applied.last().copied()
    }

    fn credit(&mut self, block: &Block) {
        self.applied.push(block.get_blockid());
        *self.balances.entry(*block.header().staker()).or_default() +=
            block.header().weight() as u128;
    }

    fn debit(&mut self, block: &Block) {
        self.applied.pop();
        let staker = *block.header().staker();
        if let Some(bal) = self.balances.get_mut(&staker) {
            *bal -= block.header().weight() as u128;
            if *bal == 0 {
                self.balances.remove(&staker);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    ledger: LedgerSnapshot,
    fail_apply: HashSet<BlockId>,
    fail_undo: HashSet<BlockId>,
    apply_calls: usize,
    undo_calls: usize,
}

/// Cloning gives another handle onto the same ledger, so a test can keep one
/// while the fork choice manager owns the other.
#[derive(Clone, Debug, Default)]
pub struct RecordingTransition {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingTransition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future apply of `blkid` fail.
    pub fn fail_apply_on(&self, blkid: BlockId) {
        self.inner.lock().fail_apply.insert(blkid);
    }

    /// Makes every future undo of `blkid` fail.
    pub fn fail_undo_on(&self, blkid: BlockId) {
        self.inner.lock().fail_undo.insert(blkid);
    }

    pub fn clear_faults(&self) {
        let mut inner = self.inner.lock();
        inner.fail_apply.clear();
        inner.fail_undo.clear();
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.lock().ledger.clone()
    }

    pub fn state_tip(&self) -> Option<BlockId> {
        self.inner.lock().ledger.tip()
    }

    pub fn apply_calls(&self) -> usize {
        self.inner.lock().apply_calls
    }

    pub fn undo_calls(&self) -> usize {
        self.inner.lock().undo_calls
    }
}

impl StateTransition for RecordingTransition {
    fn apply_block(&mut self, block: &Block) -> Result<(), TsnError> {
        let mut inner = self.inner.lock();
        inner.apply_calls += 1;

        let blkid = block.get_blockid();
        let parent = *block.header().parent();
        let tip = inner.ledger.tip().unwrap_or_else(BlockId::null);
        if parent != tip {
            return Err(TsnError::MismatchParent(blkid, tip));
        }

        if inner.fail_apply.contains(&blkid) {
            return Err(TsnError::Rejected(blkid, "injected apply fault".to_owned()));
        }

        inner.ledger.credit(block);
        Ok(())
    }

    fn undo_block(&mut self, block: &Block) -> Result<(), TsnError> {
        let mut inner = self.inner.lock();
        inner.undo_calls += 1;

        let blkid = block.get_blockid();
        let tip = inner.ledger.tip().unwrap_or_else(BlockId::null);
        if tip != blkid {
            return Err(TsnError::UndoNotTip(blkid, tip));
        }

        if inner.fail_undo.contains(&blkid) {
            return Err(TsnError::UndoFailed(blkid, "injected undo fault".to_owned()));
        }

        inner.ledger.debit(block);
        Ok(())
    }
}
