//! Transaction model
//!
//! Transactions spend previously unspent outputs and create new ones. A
//! regular transaction pays a flat fee, collected by whoever mines it; fee
//! and reward transactions are created by the miner and carry no inputs.

use crate::crypto::{sha256, sha256_hex, verify_signature};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flat fee charged per regular transaction, collected by the miner.
pub const FEE_PER_TRANSACTION: u64 = 1;

/// Transaction validation errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction id must be 64 alphanumeric characters, got '{0}'")]
    MalformedId(String),
    #[error("Invalid transaction hash: expected '{expected}', got '{got}'")]
    InvalidHash { expected: String, got: String },
    #[error("Invalid signature for input spending '{transaction}:{index}'")]
    InvalidSignature { transaction: String, index: u32 },
    #[error("Insufficient inputs: inputs total {inputs}, outputs total {outputs}")]
    InsufficientInputs { inputs: u64, outputs: u64 },
    #[error("A {kind} transaction must not have inputs")]
    UnexpectedInputs { kind: String },
}

/// The role a transaction plays in a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Regular,
    Fee,
    Reward,
}

impl TransactionKind {
    fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Regular => "regular",
            TransactionKind::Fee => "fee",
            TransactionKind::Reward => "reward",
        }
    }
}

/// A reference to an unspent output, signed by its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Id of the transaction whose output is being spent
    pub transaction: String,
    /// Output position within that transaction
    pub index: u32,
    pub amount: u64,
    pub address: String,
    #[serde(default)]
    pub signature: String,
}

impl TransactionInput {
    /// Digest the owner signs to authorize spending this output.
    /// The signature itself is excluded so signing cannot invalidate it.
    pub fn signing_digest(&self) -> [u8; 32] {
        let content = format!("{}{}{}", self.transaction, self.index, self.address);
        sha256(content.as_bytes())
    }
}

/// A newly created output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub amount: u64,
    pub address: String,
}

/// Inputs consumed and outputs created by a transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionData {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
}

/// A transaction as carried in blocks and on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// 64-char alphanumeric identifier
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub data: TransactionData,
    /// Content hash over id, kind, inputs and outputs (signatures excluded)
    pub hash: String,
}

impl Transaction {
    /// Create a reward transaction paying the mining reward to `address`
    pub fn reward(address: &str, amount: u64) -> Self {
        Self::without_inputs(TransactionKind::Reward, address, amount)
    }

    /// Create a fee transaction paying collected fees to `address`
    pub fn fee(address: &str, amount: u64) -> Self {
        Self::without_inputs(TransactionKind::Fee, address, amount)
    }

    fn without_inputs(kind: TransactionKind, address: &str, amount: u64) -> Self {
        let mut transaction = Self {
            id: crate::crypto::random_id(),
            kind,
            data: TransactionData {
                inputs: Vec::new(),
                outputs: vec![TransactionOutput {
                    amount,
                    address: address.to_string(),
                }],
            },
            hash: String::new(),
        };
        transaction.hash = transaction.compute_hash();
        transaction
    }

    /// Compute the content hash. Input signatures are excluded so a
    /// transaction can be hashed before or after signing.
    pub fn compute_hash(&self) -> String {
        let mut content = String::new();
        content.push_str(&self.id);
        content.push_str(self.kind.as_str());
        for input in &self.data.inputs {
            content.push_str(&input.transaction);
            content.push_str(&input.index.to_string());
            content.push_str(&input.amount.to_string());
            content.push_str(&input.address);
        }
        for output in &self.data.outputs {
            content.push_str(&output.amount.to_string());
            content.push_str(&output.address);
        }
        sha256_hex(content.as_bytes())
    }

    /// Sum of all input amounts
    pub fn total_input(&self) -> u64 {
        self.data.inputs.iter().map(|i| i.amount).sum()
    }

    /// Sum of all output amounts
    pub fn total_output(&self) -> u64 {
        self.data.outputs.iter().map(|o| o.amount).sum()
    }

    /// The fee this transaction pays (inputs minus outputs; zero for
    /// fee/reward transactions)
    pub fn fee_paid(&self) -> u64 {
        self.total_input().saturating_sub(self.total_output())
    }

    /// Validate structure, hash integrity, signatures and amounts
    pub fn check(&self) -> Result<(), TransactionError> {
        if self.id.len() != 64 || !self.id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TransactionError::MalformedId(self.id.clone()));
        }

        let expected = self.compute_hash();
        if expected != self.hash {
            return Err(TransactionError::InvalidHash {
                expected,
                got: self.hash.clone(),
            });
        }

        match self.kind {
            TransactionKind::Regular => self.check_regular(),
            TransactionKind::Fee | TransactionKind::Reward => {
                if !self.data.inputs.is_empty() {
                    return Err(TransactionError::UnexpectedInputs {
                        kind: self.kind.as_str().to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    fn check_regular(&self) -> Result<(), TransactionError> {
        for input in &self.data.inputs {
            let valid = verify_signature(&input.address, &input.signing_digest(), &input.signature)
                .unwrap_or(false);
            if !valid {
                return Err(TransactionError::InvalidSignature {
                    transaction: input.transaction.clone(),
                    index: input.index,
                });
            }
        }

        let inputs = self.total_input();
        let outputs = self.total_output();
        if inputs < outputs {
            return Err(TransactionError::InsufficientInputs { inputs, outputs });
        }

        Ok(())
    }
}
