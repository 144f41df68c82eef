use canon_db::traits::{BlockDatabase, ChainstateDatabase, Database};
use canon_primitives::id::BlockId;
use canon_state::{genesis::make_genesis_block, params::Params};
use tracing::*;

use crate::errors::Error;

/// Checks if we have to write the genesis block before starting.
pub fn check_needs_genesis(database: &impl Database) -> Result<bool, Error> {
    let gblocks = database.block_db().get_blocks_at_height(0)?;
    Ok(gblocks.is_empty())
}

/// Writes the genesis block and points the active tip at it.
pub fn init_genesis(params: &Params, database: &impl Database) -> Result<BlockId, Error> {
    debug!("preparing database genesis state!");

    let gblock = make_genesis_block(params);
    let genesis_blkid = gblock.get_blockid();
    database.block_db().put_block(gblock)?;
    database
        .chainstate_db()
        .set_active_tip(genesis_blkid)
        .map_err(|e| Error::Persistence(genesis_blkid, e))?;

    info!(%genesis_blkid, "wrote genesis block");
    Ok(genesis_blkid)
}

#[cfg(test)]
mod tests {
    use canon_db::stubs::get_stub_database;
    use canon_test_utils::chain::gen_params;

    use super::*;

    #[test]
    fn test_init_genesis() {
        let db = get_stub_database();
        assert!(check_needs_genesis(db.as_ref()).unwrap());

        let params = gen_params();
        let gid = init_genesis(&params, db.as_ref()).unwrap();
        assert_eq!(gid, make_genesis_block(&params).get_blockid());
        assert!(!check_needs_genesis(db.as_ref()).unwrap());
        assert_eq!(db.chainstate_db().get_active_tip().unwrap(), Some(gid));
        assert_eq!(db.block_db().get_blocks_at_height(0).unwrap(), vec![gid]);
    }
}
