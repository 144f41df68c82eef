//! Structural checks on blocks that don't need any chain context.

use canon_primitives::id::BlockId;
use thiserror::Error;

use crate::block::Block;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum BlockValidationError {
    #[error("body hash mismatch (header {header}, computed {computed})")]
    BodyHashMismatch { header: String, computed: String },

    #[error("genesis-height block has non-null parent {0:?}")]
    GenesisWithParent(BlockId),

    #[error("non-genesis block at height {0} has null parent")]
    MissingParent(u64),

    #[error("block at height {0} has zero weight")]
    ZeroWeight(u64),
}

/// Checks that the header is consistent with the body and that the block has
/// the shape its height implies.  Genesis may carry any weight, every other
/// block must carry at least 1 so accumulated weight is strictly increasing.
pub fn validate_block_structure(block: &Block) -> Result<(), BlockValidationError> {
    let header = block.header();

    let computed = block.body().compute_hash();
    if computed != *header.body_hash() {
        return Err(BlockValidationError::BodyHashMismatch {
            header: header.body_hash().to_string(),
            computed: computed.to_string(),
        });
    }

    if header.is_genesis() {
        if !header.parent().is_null() {
            return Err(BlockValidationError::GenesisWithParent(*header.parent()));
        }
        return Ok(());
    }

    if header.parent().is_null() {
        return Err(BlockValidationError::MissingParent(header.height()));
    }

    if header.weight() == 0 {
        return Err(BlockValidationError::ZeroWeight(header.height()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use canon_primitives::buf::Buf32;

    use super::*;
    use crate::{
        block::BlockBody, genesis::make_genesis_block, header::BlockHeader, params::Params,
    };

    fn child_of(parent: BlockId, height: u64, weight: u64) -> Block {
        let body = BlockBody::new(vec![height as u8]);
        let header = BlockHeader::new(height, 10, parent, weight, Buf32::zero(), &body);
        Block::new(header, body)
    }

    #[test]
    fn test_valid_blocks() {
        let genesis = make_genesis_block(&Params::default());
        assert_eq!(validate_block_structure(&genesis), Ok(()));

        let child = child_of(genesis.get_blockid(), 1, 4);
        assert_eq!(validate_block_structure(&child), Ok(()));
    }

    #[test]
    fn test_zero_weight_rejected() {
        let genesis = make_genesis_block(&Params::default());
        let child = child_of(genesis.get_blockid(), 1, 0);
        assert_eq!(
            validate_block_structure(&child),
            Err(BlockValidationError::ZeroWeight(1))
        );
    }

    #[test]
    fn test_genesis_shape() {
        let parent = BlockId::from([7u8; 32]);
        let bad_genesis = child_of(parent, 0, 1);
        assert_eq!(
            validate_block_structure(&bad_genesis),
            Err(BlockValidationError::GenesisWithParent(parent))
        );

        let orphan = child_of(BlockId::null(), 3, 1);
        assert_eq!(
            validate_block_structure(&orphan),
            Err(BlockValidationError::MissingParent(3))
        );
    }

    #[test]
    fn test_body_hash_mismatch() {
        let genesis = make_genesis_block(&Params::default());
        let good = child_of(genesis.get_blockid(), 1, 1);
        let tampered = Block::new(good.header().clone(), BlockBody::new(vec![0xff, 0xee]));
        assert!(matches!(
            validate_block_structure(&tampered),
            Err(BlockValidationError::BodyHashMismatch { .. })
        ));
    }
}
