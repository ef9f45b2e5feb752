//! Wallet implementation
//!
//! A wallet is a single key pair. The private key is what clients hold on
//! to; the address (the x-only public key in hex) is where funds go.

use crate::crypto::{KeyError, KeyPair};
use serde::Serialize;

/// A wallet managed by the node operator
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Hex-encoded private key
    pub private_key: String,
    /// Hex-encoded x-only public key
    pub address: String,
    #[serde(skip)]
    key_pair: KeyPair,
}

impl Wallet {
    /// Generate a wallet with a fresh random key pair
    pub fn generate() -> Self {
        let key_pair = KeyPair::generate();
        Self {
            private_key: key_pair.private_key_hex(),
            address: key_pair.address(),
            key_pair,
        }
    }

    /// Reconstruct a wallet from its hex private key
    pub fn from_private_key(private_key: &str) -> Result<Self, KeyError> {
        let key_pair = KeyPair::from_private_key_hex(private_key)?;
        Ok(Self {
            private_key: key_pair.private_key_hex(),
            address: key_pair.address(),
            key_pair,
        })
    }

    /// Sign a 32-byte digest with this wallet's key
    pub fn sign(&self, digest: &[u8; 32]) -> String {
        self.key_pair.sign(digest)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keep the private key out of debug output
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish()
    }
}
