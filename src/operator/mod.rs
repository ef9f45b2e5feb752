//! Operator: wallet custody and transaction construction.
//!
//! The operator holds the wallets this node manages and builds signed
//! transactions on their behalf, selecting unspent outputs to cover the
//! requested amount plus the flat fee.

pub mod wallet;

pub use wallet::Wallet;

use crate::core::{
    Blockchain, Transaction, TransactionData, TransactionError, TransactionInput,
    TransactionKind, TransactionOutput, FEE_PER_TRANSACTION,
};
use crate::crypto::{self, KeyError};
use thiserror::Error;

/// Operator errors
#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Address '{0}' not found")]
    AddressNotFound(String),
    #[error("No wallet found for address '{0}'")]
    WalletNotFound(String),
    #[error("Insufficient funds for address '{address}': balance {balance}, required {required}")]
    InsufficientFunds {
        address: String,
        balance: u64,
        required: u64,
    },
    #[error("Amount '{0}' is too large")]
    AmountTooLarge(u64),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// Manages the wallets held by this node
#[derive(Debug, Default)]
pub struct Operator {
    wallets: Vec<Wallet>,
}

impl Operator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a new wallet
    pub fn create_wallet(&mut self) -> Wallet {
        let wallet = Wallet::generate();
        log::info!("Created wallet {}", wallet.address);
        self.wallets.push(wallet.clone());
        wallet
    }

    /// Look up the address a private key controls. The key does not need to
    /// belong to a stored wallet.
    pub fn address_for_private_key(&self, private_key: &str) -> Result<String, KeyError> {
        crypto::address_from_private_key(private_key)
    }

    /// Balance of an address: the sum of its unspent outputs. An address
    /// with no unspent outputs is unknown to the ledger.
    pub fn get_balance_for_address(
        &self,
        address: &str,
        blockchain: &Blockchain,
    ) -> Result<u64, OperatorError> {
        let unspent = blockchain.get_unspent_transactions_for_address(address);
        if unspent.is_empty() {
            return Err(OperatorError::AddressNotFound(address.to_string()));
        }
        Ok(unspent.iter().map(|u| u.amount).sum())
    }

    /// Build and sign a transaction sending `amount` from `from_address` to
    /// `to_address`, spending just enough unspent outputs to cover the
    /// amount plus the fee. Any surplus goes to `change_address`. The
    /// sending address must belong to a wallet this operator holds.
    pub fn create_transaction(
        &self,
        from_address: &str,
        to_address: &str,
        amount: u64,
        change_address: &str,
        blockchain: &Blockchain,
    ) -> Result<Transaction, OperatorError> {
        let wallet = self
            .wallets
            .iter()
            .find(|w| w.address == from_address)
            .ok_or_else(|| OperatorError::WalletNotFound(from_address.to_string()))?;
        let unspent = blockchain.get_unspent_transactions_for_address(from_address);
        // amount comes straight off the wire and may sit at the u64 ceiling
        let required = amount
            .checked_add(FEE_PER_TRANSACTION)
            .ok_or(OperatorError::AmountTooLarge(amount))?;

        let mut inputs: Vec<TransactionInput> = Vec::new();
        let mut gathered: u64 = 0;
        for utxo in unspent {
            if gathered >= required {
                break;
            }
            gathered += utxo.amount;
            let mut input = TransactionInput {
                transaction: utxo.transaction,
                index: utxo.index,
                amount: utxo.amount,
                address: utxo.address,
                signature: String::new(),
            };
            input.signature = wallet.sign(&input.signing_digest());
            inputs.push(input);
        }

        if gathered < required {
            return Err(OperatorError::InsufficientFunds {
                address: from_address.to_string(),
                balance: gathered,
                required,
            });
        }

        let mut outputs = vec![TransactionOutput {
            amount,
            address: to_address.to_string(),
        }];
        let change = gathered - required;
        if change > 0 {
            outputs.push(TransactionOutput {
                amount: change,
                address: change_address.to_string(),
            });
        }

        let mut transaction = Transaction {
            id: crypto::random_id(),
            kind: TransactionKind::Regular,
            data: TransactionData { inputs, outputs },
            hash: String::new(),
        };
        transaction.hash = transaction.compute_hash();
        transaction.check()?;
        Ok(transaction)
    }
}
