//! Block types and the structural rules every block must satisfy before the
//! chain selection logic will look at it.

pub mod block;
pub mod block_validation;
pub mod genesis;
pub mod header;
pub mod params;
pub mod transition;

pub mod prelude;
