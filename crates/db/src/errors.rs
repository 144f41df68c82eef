use canon_primitives::id::BlockId;
use thiserror::Error;

/// Simple result type used across database interface.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error, Clone)]
pub enum DbError {
    #[error("tried to set status on missing block {0:?}")]
    MissingBlock(BlockId),

    #[error("{0}")]
    Other(String),
}
