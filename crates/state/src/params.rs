use serde::{Deserialize, Serialize};

/// Chain parameters every node on a network has to agree on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Timestamp written into the genesis header.
    pub genesis_timestamp: u64,

    /// Intrinsic weight of the genesis block.
    pub genesis_weight: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            genesis_timestamp: 1_500_000_000,
            genesis_weight: 1,
        }
    }
}
