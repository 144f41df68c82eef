use canon_primitives::{id::BlockId, weight::ChainWeight};

/// The canonical chain, genesis first.  The entry at index `h` is the block
/// at height `h`, so it's never empty.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActiveChain {
    canonical: Vec<BlockId>,
    weight: ChainWeight,
}

impl ActiveChain {
    pub fn new_genesis(genesis: BlockId, weight: ChainWeight) -> Self {
        Self {
            canonical: vec![genesis],
            weight,
        }
    }

    /// Builds the chain from a genesis-first list of blkids.  Returns `None`
    /// if the list is empty.
    pub fn from_blocks(canonical: Vec<BlockId>, weight: ChainWeight) -> Option<Self> {
        if canonical.is_empty() {
            return None;
        }
        Some(Self { canonical, weight })
    }

    pub fn tip(&self) -> BlockId {
        self.canonical[self.canonical.len() - 1]
    }

    pub fn genesis(&self) -> BlockId {
        self.canonical[0]
    }

    pub fn height(&self) -> u64 {
        (self.canonical.len() - 1) as u64
    }

    /// Accumulated weight of the tip.
    pub fn weight(&self) -> ChainWeight {
        self.weight
    }

    pub fn block_hash(&self, height: u64) -> Option<BlockId> {
        self.canonical.get(height as usize).copied()
    }

    pub fn contains(&self, blkid: &BlockId) -> bool {
        self.canonical.contains(blkid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockId> {
        self.canonical.iter()
    }

    /// Drops every block above `height`.  Genesis always stays.
    pub(crate) fn rewind_to(&mut self, height: u64) {
        self.canonical.truncate(height as usize + 1);
    }

    pub(crate) fn extend(&mut self, blkid: BlockId) {
        self.canonical.push(blkid);
    }

    pub(crate) fn set_weight(&mut self, weight: ChainWeight) {
        self.weight = weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(b: u8) -> BlockId {
        BlockId::from([b; 32])
    }

    #[test]
    fn test_extend_and_rewind() {
        let mut chain = ActiveChain::new_genesis(id(0), ChainWeight::new(1));
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.tip(), id(0));

        chain.extend(id(1));
        chain.extend(id(2));
        chain.set_weight(ChainWeight::new(3));
        assert_eq!(chain.height(), 2);
        assert_eq!(chain.tip(), id(2));
        assert_eq!(chain.block_hash(1), Some(id(1)));
        assert_eq!(chain.block_hash(3), None);

        chain.rewind_to(0);
        assert_eq!(chain.tip(), id(0));
        assert_eq!(chain.genesis(), id(0));
        assert!(!chain.contains(&id(1)));
    }

    #[test]
    fn test_from_blocks() {
        assert!(ActiveChain::from_blocks(Vec::new(), ChainWeight::ZERO).is_none());
        let chain = ActiveChain::from_blocks(vec![id(0), id(5)], ChainWeight::new(2)).unwrap();
        assert_eq!(chain.tip(), id(5));
        assert_eq!(chain.iter().count(), 2);
    }
}
