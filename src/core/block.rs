//! Block implementation
//!
//! A block links to its predecessor by hash and carries the transactions
//! mined into it. The block hash covers index, parent, timestamp, nonce and
//! the transaction hashes.

use crate::core::transaction::{Transaction, TransactionError};
use crate::crypto::{meets_difficulty, sha256_hex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Block validation errors
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("Invalid hash for block {index}: expected '{expected}', got '{got}'")]
    InvalidHash {
        index: u64,
        expected: String,
        got: String,
    },
    #[error("Proof of work not satisfied for block {0}")]
    InvalidProofOfWork(u64),
    #[error("Invalid transaction in block {index}: {source}")]
    InvalidTransaction {
        index: u64,
        #[source]
        source: TransactionError,
    },
}

/// A block in the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    /// Hash of the previous block; "0" for genesis
    pub previous_hash: String,
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub nonce: u64,
    pub transactions: Vec<Transaction>,
    /// Cached hash of the block contents
    pub hash: String,
}

impl Block {
    /// The fixed first block every node starts from
    pub fn genesis() -> Self {
        let mut block = Self {
            index: 0,
            previous_hash: "0".to_string(),
            timestamp: 1_465_154_705,
            nonce: 0,
            transactions: Vec::new(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Create an unmined candidate block
    pub fn new(
        index: u64,
        previous_hash: String,
        timestamp: i64,
        transactions: Vec<Transaction>,
    ) -> Self {
        let mut block = Self {
            index,
            previous_hash,
            timestamp,
            nonce: 0,
            transactions,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Compute the hash over the block contents
    pub fn compute_hash(&self) -> String {
        let mut content = format!(
            "{}{}{}{}",
            self.index, self.previous_hash, self.timestamp, self.nonce
        );
        for transaction in &self.transactions {
            content.push_str(&transaction.hash);
        }
        sha256_hex(content.as_bytes())
    }

    /// Whether the cached hash has at least `difficulty` leading zero bits
    pub fn satisfies_difficulty(&self, difficulty: u32) -> bool {
        hex::decode(&self.hash)
            .map(|bytes| meets_difficulty(&bytes, difficulty))
            .unwrap_or(false)
    }

    /// Validate hash integrity, proof of work and every transaction
    pub fn check(&self, difficulty: u32) -> Result<(), BlockError> {
        let expected = self.compute_hash();
        if expected != self.hash {
            return Err(BlockError::InvalidHash {
                index: self.index,
                expected,
                got: self.hash.clone(),
            });
        }

        if !self.satisfies_difficulty(difficulty) {
            return Err(BlockError::InvalidProofOfWork(self.index));
        }

        for transaction in &self.transactions {
            transaction.check().map_err(|source| BlockError::InvalidTransaction {
                index: self.index,
                source,
            })?;
        }

        Ok(())
    }

    /// Proof-of-work loop: bump the nonce until the hash meets `difficulty`.
    /// Returns the number of attempts.
    pub fn mine(&mut self, difficulty: u32) -> u64 {
        let mut attempts: u64 = 0;
        loop {
            self.hash = self.compute_hash();
            attempts += 1;
            if self.satisfies_difficulty(difficulty) {
                return attempts;
            }
            self.nonce += 1;
        }
    }

    /// Find a transaction in this block by id
    pub fn transaction_by_id(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }
}
