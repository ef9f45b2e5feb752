//! Minicoin: a small proof-of-work cryptocurrency node in Rust
//!
//! This crate provides a complete node featuring:
//! - Proof of Work consensus with longest-chain fork resolution
//! - Schnorr digital signatures (secp256k1)
//! - UTXO-based transaction model with a flat per-transaction fee
//! - A pending transaction pool mined into blocks on demand
//! - Peer tracking with block broadcast and chain synchronization
//! - A REST API covering the ledger, wallets, peers and the miner
//!
//! # Example
//!
//! ```rust
//! use minicoin::core::Blockchain;
//! use minicoin::operator::Operator;
//!
//! // Create a new chain and a wallet
//! let blockchain = Blockchain::with_difficulty(8);
//! let mut operator = Operator::new();
//! let wallet = operator.create_wallet();
//! println!("Address: {}", wallet.address);
//!
//! // The chain starts at the genesis block
//! assert_eq!(blockchain.latest_block().index, 0);
//! assert!(blockchain.get_all_transactions().is_empty());
//! ```

pub mod api;
pub mod core;
pub mod crypto;
pub mod miner;
pub mod node;
pub mod operator;

// Re-export commonly used types
pub use api::{create_router, ApiError, ApiState, HttpServer};
pub use core::{
    Block, Blockchain, SubmissionCheck, Transaction, BLOCK_REWARD, DEFAULT_DIFFICULTY,
    FEE_PER_TRANSACTION,
};
pub use crypto::KeyPair;
pub use miner::Miner;
pub use node::{Node, Peer};
pub use operator::{Operator, Wallet};
