use canon_primitives::id::BlockId;
use parking_lot::Mutex;

use crate::{errors::*, traits::*};

#[derive(Debug, Default)]
pub struct StubChainstateDb {
    active_tip: Mutex<Option<BlockId>>,
}

impl StubChainstateDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainstateDatabase for StubChainstateDb {
    fn set_active_tip(&self, tip: BlockId) -> DbResult<()> {
        *self.active_tip.lock() = Some(tip);
        Ok(())
    }

    fn get_active_tip(&self) -> DbResult<Option<BlockId>> {
        Ok(*self.active_tip.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_tip_roundtrip() {
        let db = StubChainstateDb::new();
        assert_eq!(db.get_active_tip().unwrap(), None);

        let tip = BlockId::from([4u8; 32]);
        db.set_active_tip(tip).unwrap();
        assert_eq!(db.get_active_tip().unwrap(), Some(tip));
    }
}
