//! REST API module
//!
//! Exposes the node's ledger, peer set, wallet utilities and miner over
//! HTTP, and translates domain errors into HTTP responses.
//!
//! # Endpoints
//!
//! ## Blockchain
//! - `GET /blockchain/blocks` - Full chain
//! - `GET/PUT /blockchain/blocks/latest` - Read or propose the tip
//! - `GET /blockchain/blocks/{hash|index}` - Block lookup
//! - `GET /blockchain/blocks/transactions/{id}` - Mined transaction lookup
//! - `POST /blockchain/transactions` - Submit a transaction
//! - `GET /blockchain/transactions/regular` - Pending transactions
//! - `GET /blockchain/transactions?address=` - Transactions by address
//! - `GET /blockchain/transactions/unspent?address=` - Unspent outputs
//!
//! ## Operator
//! - `POST /operator/wallet` - Create a wallet
//! - `GET /operator/wallets/{privateKey}` - Derive an address
//! - `POST /operator/wallets/transactions` - Build and submit a transaction
//! - `GET /operator/{address}/balance` - Address balance
//!
//! ## Node
//! - `GET/POST /node/peers` - Peer list / registration
//! - `GET /node/transactions/{id}/confirmations` - Confirmation count
//!
//! ## Miner
//! - `POST /miner/mine` - Mine the pending pool into a new block

pub mod error;
pub mod format;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::{ApiError, ErrorKind};
pub use handlers::ApiState;
pub use routes::create_router;
pub use server::{HttpServer, ServerError};
