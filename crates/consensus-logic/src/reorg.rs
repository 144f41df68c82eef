//! Reorg planning types.

use canon_primitives::id::BlockId;

use crate::{
    block_index::BlockIndex,
    errors::{ChainTipError, Error},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reorg {
    /// Blocks we're removing, in the order we're removing them.
    down: Vec<BlockId>,

    /// Pivot block that's shared on both chains.
    pivot: BlockId,

    /// Blocks we're adding, in the order we're adding them.
    up: Vec<BlockId>,
}

impl Reorg {
    pub fn revert_iter(&self) -> impl Iterator<Item = &BlockId> {
        self.down.iter()
    }

    pub fn pivot(&self) -> &BlockId {
        &self.pivot
    }

    pub fn apply_iter(&self) -> impl Iterator<Item = &BlockId> {
        self.up.iter()
    }

    pub fn old_tip(&self) -> &BlockId {
        self.down.first().unwrap_or(&self.pivot)
    }

    pub fn new_tip(&self) -> &BlockId {
        self.up.last().unwrap_or(&self.pivot)
    }

    /// Number of blocks we'd have to disconnect.
    pub fn depth(&self) -> usize {
        self.down.len()
    }

    /// If the reorg only adds blocks on top of the current tip.
    pub fn is_extension(&self) -> bool {
        self.down.is_empty() && !self.up.is_empty()
    }

    /// If the reorg describes no change in tip.
    pub fn is_identity(&self) -> bool {
        self.up.is_empty() && self.down.is_empty()
    }
}

/// Computes the reorg path from one block to a new tip.  Walks the higher
/// side down until both are at the same height, then both sides in lockstep
/// until they meet.  This behaves sensibly when one block is an ancestor of
/// the other or they're the same.
pub fn compute_reorg(start: &BlockId, dest: &BlockId, index: &BlockIndex) -> Result<Reorg, Error> {
    if start == dest {
        return Ok(Reorg {
            down: Vec::new(),
            pivot: *start,
            up: Vec::new(),
        });
    }

    let height_of = |id: &BlockId| {
        index
            .height_of(id)
            .ok_or(Error::ChainTip(ChainTipError::MissingBlock(*id)))
    };
    let parent_of = |id: &BlockId| {
        index
            .get_parent(id)
            .copied()
            .ok_or(Error::DisjointChains(*start, *dest))
    };

    let mut down = Vec::new();
    let mut up = Vec::new();
    let mut down_at = *start;
    let mut up_at = *dest;
    let mut down_height = height_of(start)?;
    let mut up_height = height_of(dest)?;

    while down_height > up_height {
        down.push(down_at);
        down_at = parent_of(&down_at)?;
        down_height -= 1;
    }

    while up_height > down_height {
        up.push(up_at);
        up_at = parent_of(&up_at)?;
        up_height -= 1;
    }

    while down_at != up_at {
        down.push(down_at);
        up.push(up_at);
        down_at = parent_of(&down_at)?;
        up_at = parent_of(&up_at)?;
    }

    up.reverse();
    Ok(Reorg {
        down,
        pivot: down_at,
        up,
    })
}

#[cfg(test)]
mod tests {
    use canon_state::block::Block;
    use canon_test_utils::chain::ChainBuilder;

    use super::*;

    fn ids(blocks: &[Block]) -> Vec<BlockId> {
        blocks.iter().map(|b| b.get_blockid()).collect()
    }

    fn index_with(builder: &ChainBuilder, branches: &[&[Block]]) -> BlockIndex {
        let genesis = builder.genesis();
        let mut index = BlockIndex::new(genesis.get_blockid(), genesis.header().clone());
        for branch in branches {
            for b in branch.iter() {
                index.attach(b.get_blockid(), b.header()).unwrap();
            }
        }
        index
    }

    #[test]
    fn test_eq_len() {
        let mut builder = ChainBuilder::new();
        let g = builder.genesis().get_blockid();
        let side_1 = builder.build_uniform_chain(g, 3, 1);
        let side_2 = builder.build_uniform_chain(side_1[0].get_blockid(), 2, 1);
        let index = index_with(&builder, &[&side_1, &side_2]);

        let reorg = compute_reorg(
            &side_1[2].get_blockid(),
            &side_2[1].get_blockid(),
            &index,
        )
        .unwrap();

        let exp_reorg = Reorg {
            down: vec![side_1[2].get_blockid(), side_1[1].get_blockid()],
            pivot: side_1[0].get_blockid(),
            up: ids(&side_2),
        };
        assert_eq!(reorg, exp_reorg);
        assert_eq!(reorg.depth(), 2);
        assert_eq!(reorg.old_tip(), &side_1[2].get_blockid());
        assert_eq!(reorg.new_tip(), &side_2[1].get_blockid());
    }

    #[test]
    fn test_longer_down() {
        let mut builder = ChainBuilder::new();
        let g = builder.genesis().get_blockid();
        let side_1 = builder.build_uniform_chain(g, 5, 1);
        let side_2 = builder.build_uniform_chain(g, 2, 1);
        let index = index_with(&builder, &[&side_1, &side_2]);

        let reorg = compute_reorg(
            &side_1[4].get_blockid(),
            &side_2[1].get_blockid(),
            &index,
        )
        .unwrap();

        let mut exp_down = ids(&side_1);
        exp_down.reverse();
        assert_eq!(
            reorg,
            Reorg {
                down: exp_down,
                pivot: g,
                up: ids(&side_2),
            }
        );
    }

    #[test]
    fn test_longer_up() {
        let mut builder = ChainBuilder::new();
        let g = builder.genesis().get_blockid();
        let side_1 = builder.build_uniform_chain(g, 2, 1);
        let side_2 = builder.build_uniform_chain(g, 5, 1);
        let index = index_with(&builder, &[&side_1, &side_2]);

        let reorg = compute_reorg(
            &side_1[1].get_blockid(),
            &side_2[4].get_blockid(),
            &index,
        )
        .unwrap();

        assert_eq!(reorg.pivot(), &g);
        assert_eq!(
            reorg.revert_iter().copied().collect::<Vec<_>>(),
            vec![side_1[1].get_blockid(), side_1[0].get_blockid()]
        );
        assert_eq!(reorg.apply_iter().copied().collect::<Vec<_>>(), ids(&side_2));
    }

    #[test]
    fn test_extension() {
        let mut builder = ChainBuilder::new();
        let g = builder.genesis().get_blockid();
        let chain = builder.build_uniform_chain(g, 6, 1);
        let index = index_with(&builder, &[&chain]);

        let src = chain[2].get_blockid();
        let reorg = compute_reorg(&src, &chain[5].get_blockid(), &index).unwrap();

        assert_eq!(
            reorg,
            Reorg {
                down: Vec::new(),
                pivot: src,
                up: ids(&chain[3..]),
            }
        );
        assert!(reorg.is_extension());
        assert!(!reorg.is_identity());
    }

    #[test]
    fn test_rollback_only() {
        let mut builder = ChainBuilder::new();
        let g = builder.genesis().get_blockid();
        let chain = builder.build_uniform_chain(g, 6, 1);
        let index = index_with(&builder, &[&chain]);

        let dest = chain[2].get_blockid();
        let reorg = compute_reorg(&chain[5].get_blockid(), &dest, &index).unwrap();

        assert_eq!(
            reorg,
            Reorg {
                down: vec![
                    chain[5].get_blockid(),
                    chain[4].get_blockid(),
                    chain[3].get_blockid()
                ],
                pivot: dest,
                up: Vec::new(),
            }
        );
        assert!(!reorg.is_extension());
    }

    #[test]
    fn test_identity() {
        let mut builder = ChainBuilder::new();
        let g = builder.genesis().get_blockid();
        let chain = builder.build_uniform_chain(g, 3, 1);
        let index = index_with(&builder, &[&chain]);

        let tip = chain[2].get_blockid();
        let reorg = compute_reorg(&tip, &tip, &index).unwrap();
        assert!(reorg.is_identity());
        assert_eq!(reorg.old_tip(), &tip);
        assert_eq!(reorg.new_tip(), &tip);
    }

    #[test]
    fn test_unknown_block() {
        let mut builder = ChainBuilder::new();
        let g = builder.genesis().get_blockid();
        let chain = builder.build_uniform_chain(g, 2, 1);
        let index = index_with(&builder, &[&chain]);

        let stray = canon_test_utils::random_blkid();
        assert!(matches!(
            compute_reorg(&chain[1].get_blockid(), &stray, &index),
            Err(Error::ChainTip(ChainTipError::MissingBlock(id))) if id == stray
        ));
    }
}
