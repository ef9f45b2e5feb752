//! Miner implementation
//!
//! Mining snapshots the chain state under a read lock, then grinds the
//! proof of work on a blocking thread so the request runtime stays
//! responsive. The mined block is NOT inserted here; whoever asked for it
//! must offer it back to the chain, which may have moved on in the
//! meantime.

use crate::core::{Block, Blockchain, Transaction, TransactionKind};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Mining errors
#[derive(Error, Debug)]
pub enum MinerError {
    #[error("Mining task failed: {0}")]
    TaskFailed(String),
}

/// Assembles and mines candidate blocks
pub struct Miner {
    blockchain: Arc<RwLock<Blockchain>>,
}

impl Miner {
    pub fn new(blockchain: Arc<RwLock<Blockchain>>) -> Self {
        Self { blockchain }
    }

    /// Mine a block containing all pending transactions plus a fee
    /// transaction (when any fees were collected) and the block reward.
    pub async fn mine(
        &self,
        reward_address: &str,
        fee_address: &str,
        reward: u64,
    ) -> Result<Block, MinerError> {
        let (index, previous_hash, difficulty, mut transactions) = {
            let chain = self.blockchain.read().await;
            let last = chain.latest_block();
            (
                last.index + 1,
                last.hash.clone(),
                chain.difficulty(),
                chain.get_all_transactions().to_vec(),
            )
        };

        let fees: u64 = transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Regular)
            .map(Transaction::fee_paid)
            .sum();
        if fees > 0 {
            transactions.push(Transaction::fee(fee_address, fees));
        }
        transactions.push(Transaction::reward(reward_address, reward));

        log::info!(
            "Mining block {index} with {} transactions at difficulty {difficulty}",
            transactions.len()
        );

        let timestamp = Utc::now().timestamp();
        let block = tokio::task::spawn_blocking(move || {
            let mut block = Block::new(index, previous_hash, timestamp, transactions);
            let attempts = block.mine(difficulty);
            log::info!("Mined block {} in {attempts} attempts", block.index);
            block
        })
        .await
        .map_err(|err| MinerError::TaskFailed(err.to_string()))?;

        Ok(block)
    }
}
