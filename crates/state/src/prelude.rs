pub use canon_primitives::prelude::*;

pub use crate::{
    block::{Block, BlockBody},
    header::BlockHeader,
    params::Params,
};
