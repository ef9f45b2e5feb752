//! Schnorr key management for wallets.
//!
//! Addresses are the hex encoding of an x-only secp256k1 public key, which
//! makes every address exactly 64 alphanumeric characters — the same shape
//! the gateway enforces on hash and transaction-id path parameters.

use rand::rngs::OsRng;
use secp256k1::schnorr::Signature;
use secp256k1::{Keypair, Message, Secp256k1, XOnlyPublicKey};
use thiserror::Error;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid address")]
    InvalidAddress,
    #[error("Invalid signature")]
    InvalidSignature,
}

/// A schnorr key pair. The x-only public key doubles as the wallet address.
#[derive(Clone)]
pub struct KeyPair {
    keypair: Keypair,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        Self {
            keypair: Keypair::new(&secp, &mut OsRng),
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secp = Secp256k1::new();
        let keypair = Keypair::from_seckey_slice(&secp, &bytes)
            .map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self { keypair })
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.keypair.secret_bytes())
    }

    /// The wallet address: hex of the x-only public key (64 chars)
    pub fn address(&self) -> String {
        hex::encode(self.keypair.x_only_public_key().0.serialize())
    }

    /// Sign a 32-byte message digest, returning the signature as hex
    pub fn sign(&self, message_digest: &[u8; 32]) -> String {
        let secp = Secp256k1::new();
        let message = Message::from_digest(*message_digest);
        let signature = secp.sign_schnorr(&message, &self.keypair);
        hex::encode(signature.as_ref())
    }
}

/// Verify a hex schnorr signature made by `address` over `message_digest`.
pub fn verify_signature(
    address: &str,
    message_digest: &[u8; 32],
    signature_hex: &str,
) -> Result<bool, KeyError> {
    let secp = Secp256k1::verification_only();

    let pubkey_bytes = hex::decode(address).map_err(|_| KeyError::InvalidAddress)?;
    let pubkey =
        XOnlyPublicKey::from_slice(&pubkey_bytes).map_err(|_| KeyError::InvalidAddress)?;

    let sig_bytes = hex::decode(signature_hex).map_err(|_| KeyError::InvalidSignature)?;
    let signature =
        Signature::from_slice(&sig_bytes).map_err(|_| KeyError::InvalidSignature)?;

    let message = Message::from_digest(*message_digest);
    Ok(secp.verify_schnorr(&signature, &message, &pubkey).is_ok())
}

/// Derive the wallet address for a hex private key.
pub fn address_from_private_key(hex_key: &str) -> Result<String, KeyError> {
    Ok(KeyPair::from_private_key_hex(hex_key)?.address())
}
