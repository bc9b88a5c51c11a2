//! Blake2b hashing.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use conclave_types::Hash256;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// String fingerprinting capability (`Hasher.hash(string) -> hash`).
pub trait Hasher: Send + Sync {
    fn hash(&self, input: &str) -> Hash256;
}

/// Default [`Hasher`]: Blake2b-256 over the UTF-8 bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake2bHasher;

impl Hasher for Blake2bHasher {
    fn hash(&self, input: &str) -> Hash256 {
        Hash256::new(blake2b_256(input.as_bytes()))
    }
}
