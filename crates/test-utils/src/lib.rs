//! Helpers for building blocks, chains and stand-in collaborators in tests.

use std::cell::Cell;

use arbitrary::{Arbitrary, Unstructured};
use canon_primitives::id::BlockId;
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

pub mod chain;
pub mod transition;

const ARB_GEN_LEN: usize = 1 << 16;

/// Hands out arbitrary instances from a fixed pool of random bytes.
pub struct ArbitraryGenerator {
    buf: Vec<u8>,
    off: Cell<usize>,
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitraryGenerator {
    pub fn new() -> Self {
        Self::new_seeded(rand::thread_rng().gen())
    }

    /// Same seed, same sequence of instances.  Handy for pinning a failure.
    pub fn new_seeded(seed: u64) -> Self {
        let mut buf = vec![0; ARB_GEN_LEN];
        StdRng::seed_from_u64(seed).fill_bytes(&mut buf);
        Self {
            buf,
            off: Cell::new(0),
        }
    }

    pub fn generate<'a, T: Arbitrary<'a>>(&'a self) -> T {
        let off = self.off.get();
        let mut u = Unstructured::new(&self.buf[off..]);
        let before = u.len();
        let inst = T::arbitrary(&mut u).expect("test: generate arbitrary instance");
        self.off.set(off + before - u.len());
        inst
    }
}

/// Random blkid that no real block will ever have.
pub fn random_blkid() -> BlockId {
    let mut buf = [0; 32];
    rand::thread_rng().fill_bytes(&mut buf);
    BlockId::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_generator_is_repeatable() {
        let a = ArbitraryGenerator::new_seeded(7);
        let b = ArbitraryGenerator::new_seeded(7);
        let x: [u64; 4] = a.generate();
        let y: [u64; 4] = b.generate();
        assert_eq!(x, y);

        let next: [u64; 4] = a.generate();
        assert_ne!(x, next);
    }
}
