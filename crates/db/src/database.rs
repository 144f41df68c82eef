use std::sync::Arc;

use super::traits::*;

/// Shim database type that assumes that all the database impls are wrapped in
/// `Arc`s.
pub struct CommonDatabase<B, C>
where
    B: BlockDatabase + Sync + Send + 'static,
    C: ChainstateDatabase + Sync + Send + 'static,
{
    block_db: Arc<B>,
    chainstate_db: Arc<C>,
}

impl<B, C> CommonDatabase<B, C>
where
    B: BlockDatabase + Sync + Send + 'static,
    C: ChainstateDatabase + Sync + Send + 'static,
{
    pub fn new(block_db: Arc<B>, chainstate_db: Arc<C>) -> Self {
        Self {
            block_db,
            chainstate_db,
        }
    }
}

impl<B, C> Database for CommonDatabase<B, C>
where
    B: BlockDatabase + Sync + Send + 'static,
    C: ChainstateDatabase + Sync + Send + 'static,
{
    type BlockDB = B;
    type ChainstateDB = C;

    fn block_db(&self) -> &Arc<Self::BlockDB> {
        &self.block_db
    }

    fn chainstate_db(&self) -> &Arc<Self::ChainstateDB> {
        &self.chainstate_db
    }
}
