use canon_state::block::Block;
use tokio::sync::oneshot;

use crate::{errors::Error, fork_choice_manager::BlockOutcome};

/// Reply channel for a processed block.
pub type BlockReply = oneshot::Sender<Result<BlockOutcome, Error>>;

/// Message to the fork choice worker.
#[derive(Debug)]
pub enum ForkChoiceMessage {
    /// New block from a peer or from local staking, with an optional channel
    /// to report what became of it.
    NewBlock(Block, Option<BlockReply>),

    /// Answered once every message queued before it has been processed.
    Flush(oneshot::Sender<()>),
}
