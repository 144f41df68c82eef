pub use crate::buf::Buf32;
pub use crate::id::BlockId;
pub use crate::weight::ChainWeight;
