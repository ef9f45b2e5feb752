//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Permissive CORS for programmatic cross-origin access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Blockchain endpoints. Static segments win over captures, so
        // "latest" and "transactions" are never swallowed by {id}.
        .route("/blockchain/blocks", get(handlers::get_blocks))
        .route(
            "/blockchain/blocks/latest",
            get(handlers::get_latest_block).put(handlers::put_latest_block),
        )
        .route(
            "/blockchain/blocks/transactions/{transaction_id}",
            get(handlers::get_transaction_from_blocks),
        )
        .route("/blockchain/blocks/{id}", get(handlers::get_block_by_id))
        .route(
            "/blockchain/transactions",
            post(handlers::post_transaction).get(handlers::get_transactions_by_address),
        )
        .route(
            "/blockchain/transactions/regular",
            get(handlers::get_pending_transactions),
        )
        .route(
            "/blockchain/transactions/unspent",
            get(handlers::get_unspent_for_address),
        )
        // Operator endpoints
        .route("/operator/wallet", post(handlers::create_wallet))
        .route(
            "/operator/wallets/transactions",
            post(handlers::create_operator_transaction),
        )
        .route(
            "/operator/wallets/{private_key}",
            get(handlers::get_address_for_private_key),
        )
        .route("/operator/{address_id}/balance", get(handlers::get_balance))
        // Node endpoints
        .route(
            "/node/peers",
            get(handlers::get_peers).post(handlers::connect_peer),
        )
        .route(
            "/node/transactions/{transaction_id}/confirmations",
            get(handlers::get_confirmations),
        )
        // Mining
        .route("/miner/mine", post(handlers::mine_block))
        // Add state and middleware
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(cors)
}
