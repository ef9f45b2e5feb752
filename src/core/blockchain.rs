//! Blockchain implementation
//!
//! Owns the chain of blocks and the pool of pending transactions, and makes
//! the three-way call on whether a proposed block extends the current tip.

use crate::core::block::{Block, BlockError};
use crate::core::transaction::{Transaction, TransactionError, TransactionKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Default mining difficulty (number of leading zero bits)
pub const DEFAULT_DIFFICULTY: u32 = 16;

/// Block reward in coins
pub const BLOCK_REWARD: u64 = 50;

/// Blockchain-related errors
#[derive(Error, Debug)]
pub enum BlockchainError {
    /// The block does not sit at tip + 1. For a freshly mined block this is
    /// the signal that another block landed first.
    #[error("Invalid index: expected '{expected}', got '{got}'")]
    InvalidIndex { expected: u64, got: u64 },
    #[error("Invalid previous hash: expected '{expected}', got '{got}'")]
    InvalidPreviousHash { expected: String, got: String },
    #[error("Invalid block: {0}")]
    InvalidBlock(#[from] BlockError),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(#[from] TransactionError),
    #[error("Transaction '{0}' already exists")]
    DuplicateTransaction(String),
    #[error("Input '{transaction}:{index}' is not an unspent output")]
    InputNotUnspent { transaction: String, index: u32 },
    #[error("Input '{transaction}:{index}' is already claimed by a pending transaction")]
    InputAlreadyClaimed { transaction: String, index: u32 },
    #[error("Received chain is not longer: ours {ours} blocks, theirs {theirs}")]
    ChainNotLonger { ours: usize, theirs: usize },
    #[error("Received chain starts from a different genesis block")]
    GenesisMismatch,
}

/// Verdict on a block proposed as the new tip, whether it arrived from a
/// peer or from local mining
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionCheck {
    /// The block cannot be judged against the local tip (it is far ahead or
    /// sits on an unknown parent); a full chain reconciliation is needed
    Unknown,
    /// The block correctly extends the current tip
    Accepted,
    /// The local chain is already at or past this block
    Rejected,
}

/// An output that has not been spent by any transaction in the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnspentOutput {
    /// Id of the transaction that created the output
    pub transaction: String,
    /// Output position within that transaction
    pub index: u32,
    pub amount: u64,
    pub address: String,
}

/// The chain of blocks plus the pending transaction pool
#[derive(Debug)]
pub struct Blockchain {
    blocks: Vec<Block>,
    /// Transactions submitted but not yet mined into a block
    pending: Vec<Transaction>,
    difficulty: u32,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Create a new chain containing only the genesis block
    pub fn new() -> Self {
        Self::with_difficulty(DEFAULT_DIFFICULTY)
    }

    /// Create a chain with a custom proof-of-work difficulty
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            blocks: vec![Block::genesis()],
            pending: Vec::new(),
            difficulty,
        }
    }

    /// Current proof-of-work difficulty
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// All blocks in chain order
    pub fn get_all_blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The current tip, if any
    pub fn get_last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// The current tip. The chain always contains at least genesis.
    pub fn latest_block(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always contains the genesis block")
    }

    /// Find a block by its hash
    pub fn get_block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.hash == hash)
    }

    /// Find a block by index. Negative or out-of-range indexes are absent,
    /// never an error.
    pub fn get_block_by_index(&self, index: i64) -> Option<&Block> {
        if index < 0 {
            return None;
        }
        self.blocks.get(index as usize)
    }

    /// Find a transaction inside any mined block
    pub fn get_transaction_from_blocks(&self, id: &str) -> Option<&Transaction> {
        self.blocks.iter().find_map(|b| b.transaction_by_id(id))
    }

    /// Find a transaction by id, pending pool first, then mined blocks
    pub fn get_transaction_by_id(&self, id: &str) -> Option<&Transaction> {
        self.pending
            .iter()
            .find(|t| t.id == id)
            .or_else(|| self.get_transaction_from_blocks(id))
    }

    /// All pending (not yet mined) transactions
    pub fn get_all_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    /// All mined transactions touching `address` as input or output
    pub fn get_transactions_by_address(&self, address: &str) -> Vec<Transaction> {
        self.blocks
            .iter()
            .flat_map(|b| &b.transactions)
            .filter(|t| {
                t.data.inputs.iter().any(|i| i.address == address)
                    || t.data.outputs.iter().any(|o| o.address == address)
            })
            .cloned()
            .collect()
    }

    /// Every output in the chain that no mined transaction has spent
    pub fn unspent_outputs(&self) -> Vec<UnspentOutput> {
        let spent: HashSet<(String, u32)> = self
            .blocks
            .iter()
            .flat_map(|b| &b.transactions)
            .flat_map(|t| &t.data.inputs)
            .map(|i| (i.transaction.clone(), i.index))
            .collect();

        self.blocks
            .iter()
            .flat_map(|b| &b.transactions)
            .flat_map(|t| {
                t.data.outputs.iter().enumerate().map(move |(index, output)| UnspentOutput {
                    transaction: t.id.clone(),
                    index: index as u32,
                    amount: output.amount,
                    address: output.address.clone(),
                })
            })
            .filter(|utxo| !spent.contains(&(utxo.transaction.clone(), utxo.index)))
            .collect()
    }

    /// Unspent outputs owned by `address`
    pub fn get_unspent_transactions_for_address(&self, address: &str) -> Vec<UnspentOutput> {
        self.unspent_outputs()
            .into_iter()
            .filter(|utxo| utxo.address == address)
            .collect()
    }

    /// Validate a transaction and add it to the pending pool
    pub fn add_transaction(
        &mut self,
        transaction: Transaction,
    ) -> Result<Transaction, BlockchainError> {
        if self.get_transaction_by_id(&transaction.id).is_some() {
            return Err(BlockchainError::DuplicateTransaction(transaction.id));
        }

        transaction.check()?;

        if transaction.kind == TransactionKind::Regular {
            self.check_inputs_spendable(&transaction, true)?;
        }

        log::info!("Transaction {} added to the pending pool", transaction.id);
        self.pending.push(transaction.clone());
        Ok(transaction)
    }

    /// Verify that every input references an unspent output and, when
    /// `against_pending` is set, that no pending transaction claims it too.
    fn check_inputs_spendable(
        &self,
        transaction: &Transaction,
        against_pending: bool,
    ) -> Result<(), BlockchainError> {
        let unspent: HashSet<(String, u32)> = self
            .unspent_outputs()
            .into_iter()
            .map(|u| (u.transaction, u.index))
            .collect();

        for input in &transaction.data.inputs {
            let key = (input.transaction.clone(), input.index);
            if !unspent.contains(&key) {
                return Err(BlockchainError::InputNotUnspent {
                    transaction: input.transaction.clone(),
                    index: input.index,
                });
            }
            if against_pending {
                let claimed = self
                    .pending
                    .iter()
                    .flat_map(|t| &t.data.inputs)
                    .any(|i| i.transaction == input.transaction && i.index == input.index);
                if claimed {
                    return Err(BlockchainError::InputAlreadyClaimed {
                        transaction: input.transaction.clone(),
                        index: input.index,
                    });
                }
            }
        }

        Ok(())
    }

    /// Three-way verdict on a proposed tip (see [`SubmissionCheck`])
    pub fn check_block(&self, block: &Block) -> SubmissionCheck {
        let last = self.latest_block();
        if block.index <= last.index {
            SubmissionCheck::Rejected
        } else if block.index == last.index + 1 && block.previous_hash == last.hash {
            SubmissionCheck::Accepted
        } else {
            SubmissionCheck::Unknown
        }
    }

    /// Append a block to the chain. The block must sit exactly at tip + 1;
    /// an [`BlockchainError::InvalidIndex`] result means another block got
    /// there first.
    pub fn add_block(&mut self, block: Block) -> Result<(), BlockchainError> {
        let last = self.latest_block();

        if block.index != last.index + 1 {
            return Err(BlockchainError::InvalidIndex {
                expected: last.index + 1,
                got: block.index,
            });
        }

        if block.previous_hash != last.hash {
            return Err(BlockchainError::InvalidPreviousHash {
                expected: last.hash.clone(),
                got: block.previous_hash.clone(),
            });
        }

        block.check(self.difficulty)?;

        for transaction in &block.transactions {
            if transaction.kind == TransactionKind::Regular {
                self.check_inputs_spendable(transaction, false)?;
            }
        }

        let mined: HashSet<String> = block.transactions.iter().map(|t| t.id.clone()).collect();
        self.pending.retain(|t| !mined.contains(&t.id));

        log::info!("Block {} added to the chain", block.index);
        self.blocks.push(block);
        Ok(())
    }

    /// Adopt a longer chain received from a peer. The incoming chain must
    /// share our genesis, link correctly and satisfy proof of work.
    pub fn replace_chain(&mut self, blocks: Vec<Block>) -> Result<(), BlockchainError> {
        if blocks.len() <= self.blocks.len() {
            return Err(BlockchainError::ChainNotLonger {
                ours: self.blocks.len(),
                theirs: blocks.len(),
            });
        }

        if blocks.first().map(|b| &b.hash) != self.blocks.first().map(|b| &b.hash) {
            return Err(BlockchainError::GenesisMismatch);
        }

        for pair in blocks.windows(2) {
            let (previous, block) = (&pair[0], &pair[1]);
            if block.index != previous.index + 1 {
                return Err(BlockchainError::InvalidIndex {
                    expected: previous.index + 1,
                    got: block.index,
                });
            }
            if block.previous_hash != previous.hash {
                return Err(BlockchainError::InvalidPreviousHash {
                    expected: previous.hash.clone(),
                    got: block.previous_hash.clone(),
                });
            }
            block.check(self.difficulty)?;
        }

        let mined: HashSet<String> = blocks
            .iter()
            .flat_map(|b| &b.transactions)
            .map(|t| t.id.clone())
            .collect();
        self.pending.retain(|t| !mined.contains(&t.id));

        log::info!(
            "Chain replaced: {} blocks -> {} blocks",
            self.blocks.len(),
            blocks.len()
        );
        self.blocks = blocks;
        Ok(())
    }
}
