//! Carries out a planned reorg against the state transition, so that either
//! the whole switch happens or none of it does.

use canon_common::{
    check_bail_trigger, BAIL_REORG_AFTER_DISCONNECT, BAIL_REORG_BEFORE_PERSIST,
};
use canon_db::traits::{BlockDatabase, ChainstateDatabase, Database};
use canon_primitives::{id::BlockId, weight::ChainWeight};
use canon_state::{block::Block, transition::StateTransition};
use tracing::*;

use crate::{active_chain::ActiveChain, errors::Error, reorg::Reorg};

/// What a successful reorg did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReorgReport {
    pub old_tip: BlockId,
    pub new_tip: BlockId,
    pub pivot: BlockId,

    /// Blocks undone, highest first.
    pub disconnected: Vec<BlockId>,

    /// Blocks applied, lowest first.
    pub connected: Vec<BlockId>,
}

#[derive(Debug)]
pub enum ReorgOutcome {
    Success(ReorgReport),

    /// The switch was abandoned and every change from the attempt was undone.
    Failure { reason: Error, restored_tip: BlockId },
}

impl ReorgOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReorgOutcome::Success(_))
    }
}

fn load_blocks<'a>(
    ids: impl Iterator<Item = &'a BlockId>,
    db: &impl BlockDatabase,
) -> Result<Vec<Block>, Error> {
    ids.map(|id| db.get_block(*id)?.ok_or(Error::MissingBlock(*id)))
        .collect()
}

/// Undoes `to_undo` in order, then applies `to_redo` in order.  Used to put
/// the state back the way it was, so a failure here leaves the state in a
/// condition we can't describe.
fn restore<'b>(
    transition: &mut impl StateTransition,
    to_undo: impl Iterator<Item = &'b Block>,
    to_redo: impl Iterator<Item = &'b Block>,
) -> Result<(), Error> {
    for block in to_undo {
        transition
            .undo_block(block)
            .map_err(|e| Error::RollbackFailed(block.get_blockid(), e))?;
    }

    for block in to_redo {
        transition
            .apply_block(block)
            .map_err(|e| Error::RollbackFailed(block.get_blockid(), e))?;
    }

    Ok(())
}

/// Switches the state and the active chain from the current tip to the new
/// tip the reorg describes, persisting the new tip pointer once the state is
/// switched.
///
/// A block failing to apply or undo gives a [`ReorgOutcome::Failure`] with
/// everything rolled back and `active` untouched.  A failed apply is reported
/// as [`Error::InvalidStateTsn`] naming the block.  Returns `Err` if we
/// couldn't even start, if the tip pointer couldn't be written (after rolling
/// back), or if rolling back itself failed.
pub fn reorganize<D: Database>(
    reorg: &Reorg,
    new_weight: ChainWeight,
    active: &mut ActiveChain,
    transition: &mut impl StateTransition,
    database: &D,
) -> Result<ReorgOutcome, Error> {
    let old_tip = active.tip();
    if *reorg.old_tip() != old_tip {
        return Err(Error::StaleReorg(old_tip, *reorg.old_tip()));
    }

    // Load everything up front so a missing block can't strand us halfway.
    let block_db = database.block_db().as_ref();
    let down_blocks = load_blocks(reorg.revert_iter(), block_db)?;
    let up_blocks = load_blocks(reorg.apply_iter(), block_db)?;

    let pivot_height = active.height() - down_blocks.len() as u64;
    debug!(
        %old_tip,
        pivot = %reorg.pivot(),
        %pivot_height,
        down = %down_blocks.len(),
        up = %up_blocks.len(),
        "executing reorg"
    );

    // Disconnect the old chain, highest first.
    for (i, block) in down_blocks.iter().enumerate() {
        if let Err(e) = transition.undo_block(block) {
            let blkid = block.get_blockid();
            warn!(%blkid, err = %e, "failed to undo block, restoring old chain");
            restore(
                transition,
                std::iter::empty::<&Block>(),
                down_blocks[..i].iter().rev(),
            )?;
            return Ok(ReorgOutcome::Failure {
                reason: Error::UndoFailed(blkid, e),
                restored_tip: old_tip,
            });
        }
    }

    check_bail_trigger(BAIL_REORG_AFTER_DISCONNECT);

    // Connect the new chain, lowest first.
    for (i, block) in up_blocks.iter().enumerate() {
        if let Err(e) = transition.apply_block(block) {
            let blkid = block.get_blockid();
            warn!(%blkid, err = %e, "failed to apply block, restoring old chain");
            restore(
                transition,
                up_blocks[..i].iter().rev(),
                down_blocks.iter().rev(),
            )?;
            return Ok(ReorgOutcome::Failure {
                reason: Error::InvalidStateTsn(blkid, e),
                restored_tip: old_tip,
            });
        }
    }

    let new_tip = *reorg.new_tip();

    check_bail_trigger(BAIL_REORG_BEFORE_PERSIST);

    // The switch doesn't count until the pointer is durable.
    if let Err(e) = database.chainstate_db().set_active_tip(new_tip) {
        error!(%new_tip, err = %e, "failed to persist new tip, restoring old chain");
        restore(
            transition,
            up_blocks.iter().rev(),
            down_blocks.iter().rev(),
        )?;
        return Err(Error::Persistence(new_tip, e));
    }

    active.rewind_to(pivot_height);
    for block in &up_blocks {
        active.extend(block.get_blockid());
    }
    active.set_weight(new_weight);

    Ok(ReorgOutcome::Success(ReorgReport {
        old_tip,
        new_tip,
        pivot: *reorg.pivot(),
        disconnected: reorg.revert_iter().copied().collect(),
        connected: reorg.apply_iter().copied().collect(),
    }))
}
