//! In-memory tree of every block we've accepted, rooted at genesis.

use std::collections::*;

use canon_primitives::id::BlockId;
use canon_state::header::BlockHeader;
use tracing::*;

use crate::errors::ChainTipError;

/// Entry in block index table we use to relate a block with its immediate
/// relatives.  The parent is found through the header.
struct BlockEntry {
    header: BlockHeader,
    children: HashSet<BlockId>,
}

/// Arena of block headers keyed by blkid.  Relatives are referred to by blkid,
/// never by reference, so the tree can't form cycles.
pub struct BlockIndex {
    genesis: BlockId,
    table: HashMap<BlockId, BlockEntry>,
}

impl BlockIndex {
    /// Creates an index containing only the genesis block.
    pub fn new(genesis: BlockId, header: BlockHeader) -> Self {
        let mut table = HashMap::new();
        table.insert(
            genesis,
            BlockEntry {
                header,
                children: HashSet::new(),
            },
        );
        Self { genesis, table }
    }

    pub fn genesis(&self) -> &BlockId {
        &self.genesis
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.table.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get_header(&self, id: &BlockId) -> Option<&BlockHeader> {
        self.table.get(id).map(|ent| &ent.header)
    }

    /// Gets the parent of a block.  Returns `None` for genesis, or if the
    /// block isn't in the index.
    pub fn get_parent(&self, id: &BlockId) -> Option<&BlockId> {
        if *id == self.genesis {
            return None;
        }
        self.table.get(id).map(|ent| ent.header.parent())
    }

    pub fn height_of(&self, id: &BlockId) -> Option<u64> {
        self.table.get(id).map(|ent| ent.header.height())
    }

    pub fn children(&self, id: &BlockId) -> impl Iterator<Item = &BlockId> {
        self.table.get(id).into_iter().flat_map(|ent| ent.children.iter())
    }

    pub fn has_children(&self, id: &BlockId) -> bool {
        self.table
            .get(id)
            .map(|ent| !ent.children.is_empty())
            .unwrap_or(false)
    }

    /// Tries to attach a block to the tree.  Does not verify the header
    /// corresponds to the given blockid.
    ///
    /// Returns `false` if the block was already attached.
    pub fn attach(&mut self, blkid: BlockId, header: &BlockHeader) -> Result<bool, ChainTipError> {
        if self.table.contains_key(&blkid) {
            warn!(%blkid, "block already attached");
            return Ok(false);
        }

        let parent_blkid = header.parent();
        let Some(parent_ent) = self.table.get_mut(parent_blkid) else {
            return Err(ChainTipError::AttachMissingParent(blkid, *parent_blkid));
        };

        let parent_height = parent_ent.header.height();
        if header.height() != parent_height + 1 {
            return Err(ChainTipError::InvalidHeight(
                blkid,
                header.height(),
                parent_height,
            ));
        }

        parent_ent.children.insert(blkid);
        self.table.insert(
            blkid,
            BlockEntry {
                header: header.clone(),
                children: HashSet::new(),
            },
        );

        Ok(true)
    }

    pub fn get_all_descendants(&self, blkid: &BlockId) -> HashSet<BlockId> {
        let mut descendants = HashSet::new();
        let mut to_visit = vec![*blkid];

        while let Some(curr_blk) = to_visit.pop() {
            if let Some(entry) = self.table.get(&curr_blk) {
                for child in &entry.children {
                    descendants.insert(*child);
                    to_visit.push(*child);
                }
            }
        }
        descendants
    }

    /// Removes a block and everything built on it, returning the removed
    /// blkids.  Genesis can't be removed.
    pub fn remove_subtree(&mut self, blkid: &BlockId) -> Vec<BlockId> {
        if *blkid == self.genesis || !self.table.contains_key(blkid) {
            return Vec::new();
        }

        if let Some(parent) = self.get_parent(blkid).copied() {
            if let Some(parent_ent) = self.table.get_mut(&parent) {
                parent_ent.children.remove(blkid);
            }
        }

        let mut removed = vec![*blkid];
        removed.extend(self.get_all_descendants(blkid));
        for id in &removed {
            self.table.remove(id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use canon_test_utils::chain::ChainBuilder;

    use super::*;

    fn index_for(builder: &ChainBuilder) -> BlockIndex {
        let genesis = builder.genesis();
        BlockIndex::new(genesis.get_blockid(), genesis.header().clone())
    }

    #[test]
    fn test_attach_chain() {
        let mut builder = ChainBuilder::new();
        let mut index = index_for(&builder);
        let g = builder.genesis().get_blockid();
        let chain = builder.build_uniform_chain(g, 3, 1);

        for b in &chain {
            assert!(index.attach(b.get_blockid(), b.header()).unwrap());
        }

        assert_eq!(index.len(), 4);
        assert_eq!(index.get_parent(&g), None);
        assert_eq!(index.get_parent(&chain[0].get_blockid()), Some(&g));
        assert_eq!(index.height_of(&chain[2].get_blockid()), Some(3));
        assert!(index.has_children(&chain[1].get_blockid()));
        assert!(!index.has_children(&chain[2].get_blockid()));
        assert_eq!(index.get_all_descendants(&g).len(), 3);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut builder = ChainBuilder::new();
        let mut index = index_for(&builder);
        let b = builder.extend_tip(1);
        assert!(index.attach(b.get_blockid(), b.header()).unwrap());
        assert!(!index.attach(b.get_blockid(), b.header()).unwrap());
        assert_eq!(index.children(&builder.genesis().get_blockid()).count(), 1);
    }

    #[test]
    fn test_attach_missing_parent() {
        let mut builder = ChainBuilder::new();
        let mut index = index_for(&builder);
        let b1 = builder.extend_tip(1);
        let b2 = builder.extend_tip(1);

        let res = index.attach(b2.get_blockid(), b2.header());
        assert_eq!(
            res,
            Err(ChainTipError::AttachMissingParent(
                b2.get_blockid(),
                b1.get_blockid()
            ))
        );
    }

    #[test]
    fn test_attach_wrong_height() {
        let builder = ChainBuilder::new();
        let mut index = index_for(&builder);
        let g = builder.genesis().get_blockid();

        let body = canon_state::block::BlockBody::new(vec![42]);
        let header = BlockHeader::new(5, 0, g, 1, Default::default(), &body);
        let blkid = header.get_blockid();
        assert_eq!(
            index.attach(blkid, &header),
            Err(ChainTipError::InvalidHeight(blkid, 5, 0))
        );
        assert!(!index.contains(&blkid));
    }

    #[test]
    fn test_remove_subtree() {
        let mut builder = ChainBuilder::new();
        let mut index = index_for(&builder);
        let g = builder.genesis().get_blockid();
        let main = builder.build_uniform_chain(g, 2, 1);
        let fork = builder.build_uniform_chain(main[0].get_blockid(), 3, 1);

        for b in main.iter().chain(fork.iter()) {
            index.attach(b.get_blockid(), b.header()).unwrap();
        }

        let removed = index.remove_subtree(&fork[0].get_blockid());
        assert_eq!(removed.len(), 3);
        assert_eq!(index.len(), 3);
        assert_eq!(
            index.children(&main[0].get_blockid()).collect::<Vec<_>>(),
            vec![&main[1].get_blockid()]
        );

        assert!(index.remove_subtree(&g).is_empty());
        assert!(index.contains(&g));
    }
}
