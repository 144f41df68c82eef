use canon_primitives::{buf::Buf32, id::BlockId};

use crate::{
    block::{Block, BlockBody},
    header::BlockHeader,
    params::Params,
};

/// Builds the genesis block.  This is a pure function of the params so every
/// node derives the same genesis blkid.
pub fn make_genesis_block(params: &Params) -> Block {
    let body = BlockBody::default();
    let header = BlockHeader::new(
        0,
        params.genesis_timestamp,
        BlockId::null(),
        params.genesis_weight,
        Buf32::zero(),
        &body,
    );
    Block::new(header, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_deterministic() {
        let params = Params::default();
        let a = make_genesis_block(&params);
        let b = make_genesis_block(&params);
        assert_eq!(a.get_blockid(), b.get_blockid());
        assert!(a.header().is_genesis());
        assert!(a.header().parent().is_null());

        let other = Params {
            genesis_timestamp: params.genesis_timestamp + 1,
            ..params
        };
        assert_ne!(make_genesis_block(&other).get_blockid(), a.get_blockid());
    }
}
