//! Persistence interfaces for the chain selection core.  Only the stores the
//! fork choice logic needs live here: blocks with their validity status, and
//! the active tip pointer.

pub mod database;
pub mod errors;
pub mod traits;

#[cfg(any(test, feature = "stubs"))]
pub mod stubs;

pub use errors::{DbError, DbResult};
