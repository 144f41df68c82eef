//! Accumulated weight computation.

use std::collections::HashMap;

use canon_primitives::{id::BlockId, weight::ChainWeight};

use crate::{block_index::BlockIndex, errors::Error};

/// Memoizes the accumulated weight of every block it's asked about.  Entries
/// are never invalidated, since a block's ancestry can't change.
#[derive(Debug, Default)]
pub struct WeightAccumulator {
    cache: HashMap<BlockId, ChainWeight>,
}

impl WeightAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_cached(&self, blkid: &BlockId) -> Option<ChainWeight> {
        self.cache.get(blkid).copied()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Returns the sum of the intrinsic weights from genesis to `blkid`,
    /// inclusive.  Walks up to the nearest cached ancestor, then caches every
    /// block on the way back down.
    pub fn accumulated_weight(
        &mut self,
        blkid: &BlockId,
        index: &BlockIndex,
    ) -> Result<ChainWeight, Error> {
        if let Some(w) = self.cache.get(blkid) {
            return Ok(*w);
        }

        let mut path = Vec::new();
        let mut cur = *blkid;
        let mut base = ChainWeight::ZERO;
        loop {
            if let Some(w) = self.cache.get(&cur) {
                base = *w;
                break;
            }

            let header = index
                .get_header(&cur)
                .ok_or(Error::UnknownAncestor(cur))?;
            path.push((cur, header.weight()));

            if cur == *index.genesis() {
                break;
            }

            let parent = *header.parent();
            if parent.is_null() {
                // Some other genesis block, can't be ours.
                return Err(Error::UnknownAncestor(cur));
            }
            cur = parent;
        }

        for (id, w) in path.into_iter().rev() {
            base = base
                .checked_add_block(w)
                .ok_or(Error::WeightOverflow(id))?;
            self.cache.insert(id, base);
        }

        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use canon_test_utils::chain::ChainBuilder;

    use super::*;

    fn setup(weights: &[u64]) -> (BlockIndex, Vec<BlockId>, u64) {
        let mut builder = ChainBuilder::new();
        let genesis = builder.genesis().clone();
        let g = genesis.get_blockid();
        let mut index = BlockIndex::new(g, genesis.header().clone());
        let chain = builder.build_chain(g, weights);
        for b in &chain {
            index.attach(b.get_blockid(), b.header()).unwrap();
        }
        let ids = std::iter::once(g)
            .chain(chain.iter().map(|b| b.get_blockid()))
            .collect();
        (index, ids, genesis.header().weight())
    }

    #[test]
    fn test_accumulates_from_genesis() {
        let (index, ids, gw) = setup(&[3, 5, 7]);
        let mut acc = WeightAccumulator::new();

        let w = acc.accumulated_weight(&ids[3], &index).unwrap();
        assert_eq!(w.value(), (gw + 3 + 5 + 7) as u128);

        // Everything on the path got cached.
        assert_eq!(acc.cache_len(), 4);
        assert_eq!(
            acc.get_cached(&ids[1]),
            Some(ChainWeight::new((gw + 3) as u128))
        );
    }

    #[test]
    fn test_strictly_increasing_along_chain() {
        let (index, ids, _) = setup(&[1, 1, 9, 2, 1]);
        let mut acc = WeightAccumulator::new();

        let weights = ids
            .iter()
            .map(|id| acc.accumulated_weight(id, &index).unwrap())
            .collect::<Vec<_>>();
        for pair in weights.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_unknown_ancestor() {
        let (index, _, _) = setup(&[1]);
        let mut acc = WeightAccumulator::new();
        let stray = canon_test_utils::random_blkid();
        assert!(matches!(
            acc.accumulated_weight(&stray, &index),
            Err(Error::UnknownAncestor(id)) if id == stray
        ));
    }

    #[test]
    fn test_overflow() {
        let (index, ids, _) = setup(&[u64::MAX, u64::MAX]);
        let mut acc = WeightAccumulator::new();
        // u128 doesn't overflow from a couple of u64s, so seed the cache
        // close to the limit.
        acc.cache.insert(ids[1], ChainWeight::new(u128::MAX - 1));
        assert!(matches!(
            acc.accumulated_weight(&ids[2], &index),
            Err(Error::WeightOverflow(id)) if id == ids[2]
        ));
    }
}
