//! Core ledger types: transactions, blocks and the blockchain itself.

pub mod block;
pub mod blockchain;
pub mod transaction;

pub use block::{Block, BlockError};
pub use blockchain::{
    Blockchain, BlockchainError, SubmissionCheck, UnspentOutput, BLOCK_REWARD, DEFAULT_DIFFICULTY,
};
pub use transaction::{
    Transaction, TransactionData, TransactionError, TransactionInput, TransactionKind,
    TransactionOutput, FEE_PER_TRANSACTION,
};
