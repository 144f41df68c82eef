use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{buf::Buf32, impl_buf_wrapper};

/// ID of a block, the hash of its header.
///
/// The derived ordering is lexicographic over the raw bytes, which fork
/// choice relies on to break ties between equally weighted tips.
#[derive(
    Copy,
    Clone,
    Eq,
    Default,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct BlockId(Buf32);

impl_buf_wrapper!(BlockId, Buf32, 32);

impl BlockId {
    /// Returns a dummy blkid that is all zeroes.  This is what the genesis
    /// block uses as its parent.
    pub fn null() -> Self {
        Self::from(Buf32::zero())
    }

    /// Checks to see if this is the dummy "zero" blkid.
    pub fn is_null(&self) -> bool {
        self.0.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut lo = [0u8; 32];
        lo[0] = 1;
        let mut hi = [0u8; 32];
        hi[0] = 2;
        let mut hi_tail = [0u8; 32];
        hi_tail[0] = 1;
        hi_tail[31] = 1;

        assert!(BlockId::from(lo) < BlockId::from(hi));
        assert!(BlockId::from(lo) < BlockId::from(hi_tail));
        assert!(BlockId::null() < BlockId::from(lo));
    }

    #[test]
    fn test_null() {
        assert!(BlockId::null().is_null());
        assert!(!BlockId::from([3u8; 32]).is_null());
    }
}
