//! Fork choice manager.  Takes in new blocks, tracks every competing chain and
//! keeps the active chain on the best one.

use std::sync::Arc;

use canon_config::ConsensusConfig;
use canon_db::traits::{BlockDatabase, BlockStatus, ChainstateDatabase, Database};
use canon_primitives::id::BlockId;
use canon_state::{
    block::Block, block_validation::validate_block_structure, genesis::make_genesis_block,
    params::Params, transition::StateTransition,
};
use tracing::*;

use crate::{
    active_chain::ActiveChain,
    block_index::BlockIndex,
    errors::*,
    fork_choice::{self, ForkChoiceDecision},
    orphans::OrphanPool,
    reorg,
    reorg_executor::{self, ReorgOutcome, ReorgReport},
    status::{ChainStatus, ChainStatusHandle},
    tip_tracker::{ChainTip, TipTracker},
    weight::WeightAccumulator,
};

/// What became of a block handed to [`ForkChoiceManager::on_block_received`].
#[derive(Debug)]
pub enum BlockOutcome {
    /// We already have it.
    Duplicate,

    /// Its parent is unknown, it's held until the parent shows up.
    Orphaned,

    /// It's invalid or builds on an invalid block.
    Rejected,

    /// Stored as a candidate, the active tip didn't change.
    Stored,

    /// The active chain switched, either extending the old tip or through a
    /// reorg.
    NewTip(ReorgReport),

    /// A better chain was found but switching to it failed, so we stayed on
    /// `restored_tip`.
    SwitchFailed { reason: Error, restored_tip: BlockId },
}

/// Owns everything the chain selection logic mutates.  Only one of these
/// should exist per node, and all calls into it have to be serialized.
pub struct ForkChoiceManager<D: Database, T: StateTransition> {
    /// Chain parameters.
    params: Arc<Params>,

    config: ConsensusConfig,

    /// Underlying block and chainstate database.
    database: Arc<D>,

    /// State the active chain is applied to.
    transition: T,

    /// Tree of every block we've accepted.
    index: BlockIndex,

    weights: WeightAccumulator,

    tips: TipTracker,

    orphans: OrphanPool,

    /// Active chain and what readers can see.
    status: ChainStatusHandle,
}

impl<D: Database, T: StateTransition> ForkChoiceManager<D, T> {
    /// Rebuilds the fork choice state from the database.  The active tip is
    /// re-derived as the best valid tip, and `transition` (which must be
    /// fresh) is brought up to it by applying every block from genesis.
    pub fn load(
        params: Arc<Params>,
        config: ConsensusConfig,
        database: Arc<D>,
        mut transition: T,
    ) -> Result<Self, Error> {
        let block_db = database.block_db().clone();

        let genesis_blkid = make_genesis_block(&params).get_blockid();
        if !block_db.get_blocks_at_height(0)?.contains(&genesis_blkid) {
            return Err(Error::MissingGenesis);
        }
        let genesis = block_db
            .get_block(genesis_blkid)?
            .ok_or(Error::MissingBlock(genesis_blkid))?;

        let mut index = BlockIndex::new(genesis_blkid, genesis.header().clone());
        let mut weights = WeightAccumulator::new();
        let genesis_weight = weights.accumulated_weight(&genesis_blkid, &index)?;
        let mut tips = TipTracker::new_with_tip(ChainTip::new(genesis_blkid, 0, genesis_weight));

        load_stored_blocks(&mut index, &mut weights, &mut tips, block_db.as_ref())?;

        let best = *fork_choice::pick_best_tip(tips.iter()).ok_or(Error::MissingGenesis)?;
        match database.chainstate_db().get_active_tip()? {
            Some(stored) if stored != best.blkid => {
                warn!(%stored, best = %best.blkid, "stored active tip is not the best tip");
            }
            None => warn!("no stored active tip"),
            _ => {}
        }

        // Bring the state up to the best tip.
        let path = path_from_genesis(&best.blkid, &index);
        let mut tip_block = genesis;
        for blkid in path.iter().copied() {
            let block = block_db
                .get_block(blkid)?
                .ok_or(Error::MissingBlock(blkid))?;
            transition
                .apply_block(&block)
                .map_err(|e| Error::InvalidStateTsn(blkid, e))?;
            tip_block = block;
        }

        database
            .chainstate_db()
            .set_active_tip(best.blkid)
            .map_err(|e| Error::Persistence(best.blkid, e))?;

        let active = ActiveChain::from_blocks(path, best.weight).ok_or(Error::MissingGenesis)?;
        info!(
            tip = %best.blkid,
            height = %best.height,
            weight = %best.weight,
            tips = %tips.len(),
            "loaded fork choice state"
        );

        let status = ChainStatusHandle::new(ChainStatus::new(active, tip_block, tips.list_tips()));
        let orphans = OrphanPool::new(config.max_orphan_blocks);

        Ok(Self {
            params,
            config,
            database,
            transition,
            index,
            weights,
            tips,
            orphans,
            status,
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn status_handle(&self) -> &ChainStatusHandle {
        &self.status
    }

    pub fn index(&self) -> &BlockIndex {
        &self.index
    }

    pub fn tips(&self) -> &TipTracker {
        &self.tips
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    pub fn transition(&self) -> &T {
        &self.transition
    }

    /// Entry point for every new block.  Validates it, adds it to the set of
    /// candidates and switches the active chain if it's now the best.  Any
    /// orphans that were waiting on this block are processed afterwards.
    pub fn on_block_received(&mut self, block: Block) -> Result<BlockOutcome, Error> {
        let blkid = block.get_blockid();
        let res = self.process_block(block);

        // A candidate we refused to switch to is still attached, so its
        // orphans can attach too.
        let drain = match &res {
            Ok(BlockOutcome::Duplicate | BlockOutcome::Orphaned) => false,
            Ok(_) => true,
            Err(e) => !e.is_fatal() && self.index.contains(&blkid),
        };
        if drain {
            self.process_orphans(blkid)?;
        }

        res
    }

    fn process_orphans(&mut self, parent: BlockId) -> Result<(), Error> {
        let mut queue = vec![parent];
        while let Some(p) = queue.pop() {
            for child in self.orphans.take_children(&p) {
                let child_blkid = child.get_blockid();
                match self.process_block(child) {
                    Ok(outcome) => {
                        debug!(%child_blkid, ?outcome, "processed orphan block");
                        queue.push(child_blkid);
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(%child_blkid, err = %e, "failed to process orphan block");
                        if self.index.contains(&child_blkid) {
                            queue.push(child_blkid);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn process_block(&mut self, block: Block) -> Result<BlockOutcome, Error> {
        let blkid = block.get_blockid();
        validate_block_structure(&block).map_err(|e| Error::InvalidBlock(blkid, e))?;

        if self.index.contains(&blkid) || self.orphans.contains(&blkid) {
            trace!(%blkid, "ignoring duplicate block");
            return Ok(BlockOutcome::Duplicate);
        }

        let block_db = self.database.block_db().clone();
        if block_db.get_block_status(blkid)? == Some(BlockStatus::Invalid) {
            debug!(%blkid, "ignoring known invalid block");
            return Ok(BlockOutcome::Rejected);
        }

        // Our own genesis is always in the index, so this is someone else's.
        if block.header().is_genesis() {
            warn!(%blkid, "rejecting foreign genesis block");
            return Ok(BlockOutcome::Rejected);
        }

        let parent = *block.header().parent();
        if !self.index.contains(&parent) {
            if block_db.get_block_status(parent)? == Some(BlockStatus::Invalid) {
                warn!(%blkid, %parent, "rejecting block building on invalid block");
                block_db.put_block(block)?;
                block_db.set_block_status(blkid, BlockStatus::Invalid)?;
                return Ok(BlockOutcome::Rejected);
            }

            debug!(%blkid, %parent, "holding orphan block");
            self.orphans.insert(block);
            return Ok(BlockOutcome::Orphaned);
        }

        block_db.put_block(block.clone())?;
        match self.index.attach(blkid, block.header()) {
            Ok(_) => {}
            Err(e @ ChainTipError::InvalidHeight(..)) => {
                warn!(%blkid, err = %e, "rejecting block");
                block_db.set_block_status(blkid, BlockStatus::Invalid)?;
                return Ok(BlockOutcome::Rejected);
            }
            Err(e) => return Err(e.into()),
        }

        let weight = match self.weights.accumulated_weight(&blkid, &self.index) {
            Ok(w) => w,
            Err(e) => {
                self.index.remove_subtree(&blkid);
                return Err(e);
            }
        };

        let tip = ChainTip::new(blkid, block.header().height(), weight);
        if self.tips.register_block(tip, &parent) {
            debug!(%blkid, "created new fork tip");
        }

        let active = self.status.current_tip();
        match fork_choice::evaluate(&active, &tip) {
            ForkChoiceDecision::Keep => {
                trace!(%blkid, %weight, active_weight = %active.weight, "keeping active tip");
                self.publish_tips();
                Ok(BlockOutcome::Stored)
            }
            ForkChoiceDecision::Switch(_) => self.switch_with_fallback(tip, block),
        }
    }

    /// Switches to `tip`.  If that fails, keeps trying the best remaining tip
    /// for as long as it beats the active one.
    fn switch_with_fallback(&mut self, tip: ChainTip, block: Block) -> Result<BlockOutcome, Error> {
        let mut failed = tip.blkid;
        let mut outcome = self.try_switch(tip, block)?;

        let mut attempts = self.tips.len();
        while matches!(outcome, BlockOutcome::SwitchFailed { .. }) && attempts > 0 {
            attempts -= 1;

            let active = self.status.current_tip();
            let Some(best) = fork_choice::pick_best_tip(self.tips.iter()).copied() else {
                break;
            };
            if fork_choice::evaluate(&active, &best) == ForkChoiceDecision::Keep {
                break;
            }

            // Nothing got invalidated, so it would fail the same way again.
            if best.blkid == failed {
                break;
            }
            failed = best.blkid;

            let block = self
                .database
                .block_db()
                .get_block(best.blkid)?
                .ok_or(Error::MissingBlock(best.blkid))?;
            info!(blkid = %best.blkid, "trying next best tip");
            outcome = self.try_switch(best, block)?;
        }

        Ok(outcome)
    }

    fn try_switch(&mut self, tip: ChainTip, block: Block) -> Result<BlockOutcome, Error> {
        let active = self.status.current_tip();
        let reorg = reorg::compute_reorg(&active.blkid, &tip.blkid, &self.index)?;

        let limit = self.config.max_reorg_depth;
        if reorg.depth() > limit {
            warn!(new_tip = %tip.blkid, depth = %reorg.depth(), %limit, "refusing deep reorg");
            self.publish_tips();
            return Err(Error::ReorgTooDeep(reorg.depth(), limit));
        }

        if !reorg.is_extension() {
            info!(old_tip = %active.blkid, new_tip = %tip.blkid, pivot = %reorg.pivot(), "reorganizing");
        }

        // Readers wait for the whole switch.
        let outcome = {
            let mut status = self.status.write();
            let outcome = reorg_executor::reorganize(
                &reorg,
                tip.weight,
                &mut status.active,
                &mut self.transition,
                self.database.as_ref(),
            )?;
            if outcome.is_success() {
                status.tip_block = block;
            }
            status.tips = self.tips.list_tips();
            outcome
        };

        match outcome {
            ReorgOutcome::Success(report) => {
                info!(
                    tip = %report.new_tip,
                    height = %tip.height,
                    weight = %tip.weight,
                    disconnected = %report.disconnected.len(),
                    connected = %report.connected.len(),
                    "new chain tip"
                );
                Ok(BlockOutcome::NewTip(report))
            }

            ReorgOutcome::Failure {
                reason,
                restored_tip,
            } => {
                warn!(err = %reason, %restored_tip, "failed to switch chain tip");

                // Remember not to accept the block again.
                if let Error::InvalidStateTsn(inv_blkid, _) = &reason {
                    self.invalidate_subtree(*inv_blkid)?;
                }

                Ok(BlockOutcome::SwitchFailed {
                    reason,
                    restored_tip,
                })
            }
        }
    }

    /// Marks a block and everything built on it as invalid and forgets about
    /// them.  If that leaves the parent childless it becomes a tip again.
    fn invalidate_subtree(&mut self, blkid: BlockId) -> Result<(), Error> {
        let block_db = self.database.block_db().clone();
        let parent = self.index.get_parent(&blkid).copied();

        let removed = self.index.remove_subtree(&blkid);
        for id in &removed {
            block_db.set_block_status(*id, BlockStatus::Invalid)?;
            self.tips.remove_tip(id);
        }
        warn!(%blkid, count = %removed.len(), "marked blocks invalid");

        if let Some(parent) = parent {
            if !self.index.has_children(&parent) && !self.tips.contains(&parent) {
                let height = self
                    .index
                    .height_of(&parent)
                    .ok_or(ChainTipError::MissingBlock(parent))?;
                let weight = self.weights.accumulated_weight(&parent, &self.index)?;
                self.tips.insert_tip(ChainTip::new(parent, height, weight));
            }
        }

        self.publish_tips();
        Ok(())
    }

    fn publish_tips(&self) {
        self.status.write().tips = self.tips.list_tips();
    }
}

/// Attaches every stored valid block to the index, lowest height first.
fn load_stored_blocks(
    index: &mut BlockIndex,
    weights: &mut WeightAccumulator,
    tips: &mut TipTracker,
    block_db: &impl BlockDatabase,
) -> Result<(), Error> {
    for height in 1.. {
        let blkids = block_db.get_blocks_at_height(height)?;
        if blkids.is_empty() {
            break;
        }

        for blkid in blkids {
            if block_db.get_block_status(blkid)? == Some(BlockStatus::Invalid) {
                continue;
            }

            let block = block_db
                .get_block(blkid)?
                .ok_or(Error::MissingBlock(blkid))?;
            let parent = *block.header().parent();
            if !index.contains(&parent) {
                debug!(%blkid, %parent, "skipping stored block with unusable parent");
                continue;
            }

            index.attach(blkid, block.header())?;
            let weight = weights.accumulated_weight(&blkid, index)?;
            tips.register_block(ChainTip::new(blkid, height, weight), &parent);
        }
    }

    Ok(())
}

/// Blkids from genesis up to `tip`, inclusive.
fn path_from_genesis(tip: &BlockId, index: &BlockIndex) -> Vec<BlockId> {
    let mut path = vec![*tip];
    let mut cur = *tip;
    while let Some(parent) = index.get_parent(&cur) {
        path.push(*parent);
        cur = *parent;
    }
    path.reverse();
    path
}
