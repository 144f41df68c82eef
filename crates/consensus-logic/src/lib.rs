//! Chain selection logic.  Tracks every competing chain, picks the heaviest
//! and reorganizes the active chain onto it.

pub mod active_chain;
pub mod block_index;
pub mod fork_choice;
pub mod fork_choice_manager;
pub mod genesis;
pub mod message;
pub mod orphans;
pub mod reorg;
pub mod reorg_executor;
pub mod status;
pub mod sync_manager;
pub mod tip_tracker;
pub mod weight;

pub mod errors;
