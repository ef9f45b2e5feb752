//! Cryptographic primitives: SHA-256 hashing and schnorr key pairs.

pub mod hash;
pub mod keys;

pub use hash::{meets_difficulty, random_id, sha256, sha256_hex};
pub use keys::{address_from_private_key, verify_signature, KeyError, KeyPair};
