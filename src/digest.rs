//! Content hash primitive shared by the Merkle tree and block sealing.
//!
//! Digests are SHA-256 rendered as 64 lowercase hex characters. Proof-of-work
//! difficulty is measured against this textual form, so the hex encoding is
//! part of the contract, not just a display choice.

use sha2::{Digest, Sha256};

/// Length of a digest in hex characters.
pub const DIGEST_LEN: usize = 64;

/// Hashes `data` and returns the hex-encoded digest.
pub fn digest(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// Hashes the concatenation `left ++ right`.
pub fn digest_pair(left: &str, right: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hex::encode(hasher.finalize())
}

/// True when the first `difficulty` characters of `hash` are all `'0'`.
pub fn has_leading_zeros(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}
