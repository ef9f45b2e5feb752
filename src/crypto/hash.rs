//! Hashing primitives shared by blocks and transactions.
//!
//! All identifiers on the wire (block hashes, transaction ids) are 64-char
//! lowercase hex strings produced by these helpers.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 digest rendered as a 64-char lowercase hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Random 64-char hex identifier, used for transaction ids.
pub fn random_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Checks whether `hash` starts with at least `difficulty` zero bits.
pub fn meets_difficulty(hash: &[u8], difficulty: u32) -> bool {
    let full_zero_bytes = difficulty as usize / 8;
    let remaining_bits = difficulty as usize % 8;

    for byte in hash.iter().take(full_zero_bytes) {
        if *byte != 0 {
            return false;
        }
    }

    if remaining_bits > 0 && full_zero_bytes < hash.len() {
        let mask = 0xFF << (8 - remaining_bits);
        if hash[full_zero_bytes] & mask != 0 {
            return false;
        }
    }

    true
}
