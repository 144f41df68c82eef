//! In-memory database implementations, for tests and the simulator.

use std::sync::Arc;

use crate::database::CommonDatabase;

pub mod block;
pub mod chainstate;

pub use block::StubBlockDb;
pub use chainstate::StubChainstateDb;

/// Database made entirely of in-memory stores.
pub type StubDatabase = CommonDatabase<StubBlockDb, StubChainstateDb>;

/// Creates a fresh, empty in-memory database.
pub fn get_stub_database() -> Arc<StubDatabase> {
    Arc::new(CommonDatabase::new(
        Arc::new(StubBlockDb::new()),
        Arc::new(StubChainstateDb::new()),
    ))
}
