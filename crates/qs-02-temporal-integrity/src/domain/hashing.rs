//! SHA3-256 helpers used across the temporal domain.

use sha3::{Digest as _, Sha3_256};
use shared_types::Digest;

/// One-shot SHA3-256.
pub fn sha3(data: &[u8]) -> Digest {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA3-256 over multiple inputs.
pub fn sha3_many(inputs: &[&[u8]]) -> Digest {
    let mut hasher = Sha3_256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// SHA3-256 of a little-endian u64.
pub fn sha3_u64(value: u64) -> Digest {
    sha3(&value.to_le_bytes())
}
