//! Accumulated chain weight.

use std::fmt;

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Sum of the intrinsic weights of every block from genesis up to some block,
/// inclusive.  This is the only metric chain selection compares.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
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
pub struct ChainWeight(u128);

impl ChainWeight {
    pub const ZERO: ChainWeight = ChainWeight(0);

    pub fn new(v: u128) -> Self {
        Self(v)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    /// Adds a block's intrinsic weight, returning `None` on overflow.
    pub fn checked_add_block(self, block_weight: u64) -> Option<Self> {
        self.0.checked_add(block_weight as u128).map(Self)
    }
}

impl From<u128> for ChainWeight {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl fmt::Display for ChainWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
