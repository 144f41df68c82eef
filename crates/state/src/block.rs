use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use canon_primitives::{buf::Buf32, hash, id::BlockId};
use serde::{Deserialize, Serialize};

use crate::header::BlockHeader;

/// Full contents of a block.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Block {
    /// Header that links the block into the chain and carries its weight.
    header: BlockHeader,

    /// Body that contains the bulk of the data.
    body: BlockBody,
}

impl Block {
    pub fn new(header: BlockHeader, body: BlockBody) -> Self {
        Self { header, body }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn body(&self) -> &BlockBody {
        &self.body
    }

    pub fn get_blockid(&self) -> BlockId {
        self.header.get_blockid()
    }
}

/// Careful impl that makes the header consistent with the body.  The parent
/// is always null and the height is always 1, callers that need a real chain
/// should build it with [`BlockHeader::new`].
impl<'a> Arbitrary<'a> for Block {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let body = BlockBody::arbitrary(u)?;
        let ts = u64::arbitrary(u)?;
        let weight = u64::arbitrary(u)?.max(1);
        let staker = Buf32::arbitrary(u)?;
        let header = BlockHeader::new(1, ts, BlockId::null(), weight, staker, &body);
        Ok(Self::new(header, body))
    }
}

/// Opaque payload of a block.  The chain selection logic never looks inside,
/// only the state transition does.
#[derive(
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct BlockBody {
    payload: Vec<u8>,
}

impl BlockBody {
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn compute_hash(&self) -> Buf32 {
        hash::compute_borsh_hash(self)
    }
}
