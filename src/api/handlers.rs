//! REST API handlers for the gateway endpoints
//!
//! Each handler parses and validates its input, calls exactly one
//! collaborator operation, and maps the outcome to a status and body.
//! Failures are raised as [`ApiError`] and rendered by its `IntoResponse`
//! impl, never written by the handler itself.

use crate::api::error::ApiError;
use crate::api::format::{format_amount, format_timestamp, short_hash};
use crate::core::{Block, Blockchain, SubmissionCheck, Transaction, BLOCK_REWARD};
use crate::miner::Miner;
use crate::node::{Node, Peer};
use crate::operator::Operator;
use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub blockchain: Arc<RwLock<Blockchain>>,
    pub operator: Arc<RwLock<Operator>>,
    pub node: Arc<Node>,
    pub miner: Arc<Miner>,
}

/// JSON extractor whose rejection is an [`ApiError`], so a malformed body
/// gets the same 400 rendering as every other invalid input.
pub struct WireJson<T>(pub T);

impl<S, T> FromRequest<S> for WireJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(WireJson(value)),
            Err(rejection) => Err(ApiError::invalid_input(rejection.body_text())),
        }
    }
}

/// Whether a path parameter has the shape of a hash or transaction id:
/// exactly 64 alphanumeric characters.
fn is_hash_shaped(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_alphanumeric())
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineRequest {
    pub reward_address: String,
    pub fee_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorTransactionRequest {
    pub from_address: String,
    pub to_address: String,
    pub amount: u64,
    pub change_address: Option<String>,
}

#[derive(Deserialize)]
pub struct AddressQuery {
    #[serde(default)]
    pub address: String,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub balance: u64,
}

#[derive(Serialize)]
pub struct ConfirmationsResponse {
    pub confirmations: u32,
}

// ============================================================================
// Blockchain Endpoints
// ============================================================================

/// GET /blockchain/blocks
pub async fn get_blocks(State(state): State<ApiState>) -> Json<Vec<Block>> {
    Json(state.blockchain.read().await.get_all_blocks().to_vec())
}

/// GET /blockchain/blocks/latest
pub async fn get_latest_block(State(state): State<ApiState>) -> Result<Json<Block>, ApiError> {
    state
        .blockchain
        .read()
        .await
        .get_last_block()
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Last block not found"))
}

/// PUT /blockchain/blocks/latest
///
/// A peer announcing what it believes is the chain tip. All three verdicts
/// of the submission check have a distinct rendering.
pub async fn put_latest_block(
    State(state): State<ApiState>,
    WireJson(block): WireJson<Block>,
) -> Result<Response, ApiError> {
    log::info!(
        "Received tip proposal: block {} ({}) from {}",
        block.index,
        short_hash(&block.hash),
        format_timestamp(block.timestamp)
    );

    let verdict = state.node.check_received_block(block.clone()).await?;
    match verdict {
        SubmissionCheck::Unknown => {
            Ok((StatusCode::OK, "Requesting the blockchain to check.").into_response())
        }
        SubmissionCheck::Accepted => Ok((StatusCode::OK, Json(block)).into_response()),
        SubmissionCheck::Rejected => Err(ApiError::conflict("Blockchain is up to date.")),
    }
}

/// GET /blockchain/blocks/{id}
///
/// The parameter is a hash when it has the 64-char shape, otherwise an
/// index. The hash interpretation is tried first so a 64-character
/// numeric-looking value is never swallowed by the index lookup.
pub async fn get_block_by_id(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Block>, ApiError> {
    let blockchain = state.blockchain.read().await;

    if is_hash_shaped(&id) {
        return blockchain
            .get_block_by_hash(&id)
            .cloned()
            .map(Json)
            .ok_or_else(|| ApiError::not_found(format!("Block not found with hash '{id}'")));
    }

    // Non-numeric or negative indexes are just absent blocks
    id.parse::<i64>()
        .ok()
        .and_then(|index| blockchain.get_block_by_index(index).cloned())
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Block not found with index '{id}'")))
}

/// GET /blockchain/blocks/transactions/{transaction_id}
pub async fn get_transaction_from_blocks(
    State(state): State<ApiState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    let not_found =
        || ApiError::not_found(format!("Transaction '{transaction_id}' not found in any block"));

    if !is_hash_shaped(&transaction_id) {
        return Err(not_found());
    }

    state
        .blockchain
        .read()
        .await
        .get_transaction_from_blocks(&transaction_id)
        .cloned()
        .map(Json)
        .ok_or_else(not_found)
}

/// POST /blockchain/transactions
pub async fn post_transaction(
    State(state): State<ApiState>,
    WireJson(transaction): WireJson<Transaction>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let mut blockchain = state.blockchain.write().await;

    if blockchain.get_transaction_by_id(&transaction.id).is_some() {
        return Err(ApiError::conflict(format!(
            "Transaction '{}' already exists",
            transaction.id
        )));
    }

    let created = blockchain.add_transaction(transaction)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /blockchain/transactions/regular
pub async fn get_pending_transactions(State(state): State<ApiState>) -> Json<Vec<Transaction>> {
    Json(state.blockchain.read().await.get_all_transactions().to_vec())
}

/// GET /blockchain/transactions?address=
pub async fn get_transactions_by_address(
    State(state): State<ApiState>,
    Query(query): Query<AddressQuery>,
) -> Json<Vec<Transaction>> {
    Json(
        state
            .blockchain
            .read()
            .await
            .get_transactions_by_address(&query.address),
    )
}

/// GET /blockchain/transactions/unspent?address=
pub async fn get_unspent_for_address(
    State(state): State<ApiState>,
    Query(query): Query<AddressQuery>,
) -> Json<Vec<crate::core::UnspentOutput>> {
    Json(
        state
            .blockchain
            .read()
            .await
            .get_unspent_transactions_for_address(&query.address),
    )
}

// ============================================================================
// Operator Endpoints
// ============================================================================

/// POST /operator/wallet
pub async fn create_wallet(
    State(state): State<ApiState>,
) -> (StatusCode, Json<crate::operator::Wallet>) {
    let wallet = state.operator.write().await.create_wallet();
    (StatusCode::CREATED, Json(wallet))
}

/// GET /operator/wallets/{private_key}
///
/// Derives the address a private key controls. The key itself is never
/// echoed back on failure.
pub async fn get_address_for_private_key(
    State(state): State<ApiState>,
    Path(private_key): Path<String>,
) -> Result<String, ApiError> {
    state
        .operator
        .read()
        .await
        .address_for_private_key(&private_key)
        .map_err(|_| ApiError::not_found("Wallet not found for the provided private key"))
}

/// POST /operator/wallets/transactions
///
/// Builds a transaction via the operator and submits it to the ledger
/// exactly like the direct submission path.
pub async fn create_operator_transaction(
    State(state): State<ApiState>,
    WireJson(request): WireJson<OperatorTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let change_address = request
        .change_address
        .as_deref()
        .unwrap_or(&request.from_address);

    let mut blockchain = state.blockchain.write().await;
    let transaction = state.operator.read().await.create_transaction(
        &request.from_address,
        &request.to_address,
        request.amount,
        change_address,
        &blockchain,
    )?;

    if blockchain.get_transaction_by_id(&transaction.id).is_some() {
        return Err(ApiError::conflict(format!(
            "Transaction '{}' already exists",
            transaction.id
        )));
    }

    let created = blockchain.add_transaction(transaction)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /operator/{address_id}/balance
pub async fn get_balance(
    State(state): State<ApiState>,
    Path(address_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let blockchain = state.blockchain.read().await;
    let balance = state
        .operator
        .read()
        .await
        .get_balance_for_address(&address_id, &blockchain)?;
    Ok(Json(BalanceResponse { balance }))
}

// ============================================================================
// Node Endpoints
// ============================================================================

/// GET /node/peers
pub async fn get_peers(State(state): State<ApiState>) -> Json<Vec<Peer>> {
    Json(state.node.peers().await)
}

/// POST /node/peers
pub async fn connect_peer(
    State(state): State<ApiState>,
    WireJson(peer): WireJson<Peer>,
) -> (StatusCode, Json<Peer>) {
    let peer = state.node.connect_to_peer(peer).await;
    (StatusCode::CREATED, Json(peer))
}

/// GET /node/transactions/{transaction_id}/confirmations
pub async fn get_confirmations(
    State(state): State<ApiState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<ConfirmationsResponse>, ApiError> {
    if !is_hash_shaped(&transaction_id) {
        return Err(ApiError::not_found(format!(
            "Transaction '{transaction_id}' not found in any block"
        )));
    }

    let confirmations = state.node.get_confirmations(&transaction_id).await;
    Ok(Json(ConfirmationsResponse { confirmations }))
}

// ============================================================================
// Miner Endpoint
// ============================================================================

/// POST /miner/mine
///
/// Mining runs off the request runtime; while it is in flight another block
/// may land, so the finished block is offered back through the same
/// submission check as a peer block. Losing that race is a 409, and the
/// block just computed is discarded.
pub async fn mine_block(
    State(state): State<ApiState>,
    WireJson(request): WireJson<MineRequest>,
) -> Result<(StatusCode, Json<Block>), ApiError> {
    let fee_address = request
        .fee_address
        .as_deref()
        .unwrap_or(&request.reward_address);

    let block = state
        .miner
        .mine(&request.reward_address, fee_address, BLOCK_REWARD)
        .await
        .map_err(|err| ApiError::internal("Mining failed").with_cause(&err))?;

    match state.node.check_received_block(block.clone()).await? {
        SubmissionCheck::Accepted => {
            log::info!(
                "Mined block {} ({}), reward {} to {}",
                block.index,
                short_hash(&block.hash),
                format_amount(BLOCK_REWARD),
                request.reward_address
            );
            Ok((StatusCode::CREATED, Json(block)))
        }
        SubmissionCheck::Rejected | SubmissionCheck::Unknown => Err(ApiError::conflict(
            "A new block was added before we were able to mine one",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::create_router;
    use crate::core::{BlockchainError, FEE_PER_TRANSACTION};
    use axum::body::Body;
    use axum::http::{header, Method};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const TEST_DIFFICULTY: u32 = 4;

    fn test_state() -> ApiState {
        let blockchain = Arc::new(RwLock::new(Blockchain::with_difficulty(TEST_DIFFICULTY)));
        let node = Arc::new(Node::new("localhost", 3001, Arc::clone(&blockchain)));
        let miner = Arc::new(Miner::new(Arc::clone(&blockchain)));
        ApiState {
            blockchain,
            operator: Arc::new(RwLock::new(Operator::new())),
            node,
            miner,
        }
    }

    async fn send(
        state: &ApiState,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, String) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn mined_successor(state: &ApiState, transactions: Vec<Transaction>) -> Block {
        let chain = state.blockchain.read().await;
        let last = chain.latest_block();
        let mut block = Block::new(
            last.index + 1,
            last.hash.clone(),
            Utc::now().timestamp(),
            transactions,
        );
        block.mine(TEST_DIFFICULTY);
        block
    }

    #[tokio::test]
    async fn test_get_blocks_returns_the_chain() {
        let state = test_state();
        let (status, body) = send(&state, Method::GET, "/blockchain/blocks", None).await;
        assert_eq!(status, StatusCode::OK);
        let blocks: Vec<Block> = serde_json::from_str(&body).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].index, 0);
    }

    #[tokio::test]
    async fn test_latest_block_is_idempotent() {
        let state = test_state();
        let (status, first) = send(&state, Method::GET, "/blockchain/blocks/latest", None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = send(&state, Method::GET, "/blockchain/blocks/latest", None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_block_lookup_by_hash_and_index_never_collide() {
        let state = test_state();
        let genesis_hash = state.blockchain.read().await.latest_block().hash.clone();

        // A 64-char parameter is a hash even when it looks numeric
        let (status, body) =
            send(&state, Method::GET, &format!("/blockchain/blocks/{genesis_hash}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let block: Block = serde_json::from_str(&body).unwrap();
        assert_eq!(block.index, 0);

        let numeric_looking = "1".repeat(64);
        let (status, body) =
            send(&state, Method::GET, &format!("/blockchain/blocks/{numeric_looking}"), None)
                .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("hash"));

        let (status, _) = send(&state, Method::GET, "/blockchain/blocks/0", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&state, Method::GET, "/blockchain/blocks/-1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("index '-1'"));

        let (status, _) = send(&state, Method::GET, "/blockchain/blocks/not-a-number", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_latest_block_three_outcomes() {
        let state = test_state();
        let successor = mined_successor(&state, vec![]).await;

        let mut far_ahead = successor.clone();
        far_ahead.index = 42;
        far_ahead.hash = far_ahead.compute_hash();
        let (status, body) = send(
            &state,
            Method::PUT,
            "/blockchain/blocks/latest",
            Some(serde_json::to_value(&far_ahead).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Requesting the blockchain to check.");
        assert_eq!(state.blockchain.read().await.get_all_blocks().len(), 1);

        let (status, body) = send(
            &state,
            Method::PUT,
            "/blockchain/blocks/latest",
            Some(serde_json::to_value(&successor).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let echoed: Block = serde_json::from_str(&body).unwrap();
        assert_eq!(echoed.hash, successor.hash);
        assert_eq!(state.blockchain.read().await.get_all_blocks().len(), 2);

        let (status, body) = send(
            &state,
            Method::PUT,
            "/blockchain/blocks/latest",
            Some(serde_json::to_value(&successor).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, "Blockchain is up to date.");
        assert_eq!(state.blockchain.read().await.get_all_blocks().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_transaction_submission_conflicts() {
        let state = test_state();
        let reward = Transaction::reward("miner", 50);
        let json = serde_json::to_value(&reward).unwrap();

        let (status, _) =
            send(&state, Method::POST, "/blockchain/transactions", Some(json.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            send(&state, Method::POST, "/blockchain/transactions", Some(json)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, format!("Transaction '{}' already exists", reward.id));
    }

    #[tokio::test]
    async fn test_invalid_transaction_submission_is_bad_request() {
        let state = test_state();
        let mut reward = Transaction::reward("miner", 50);
        reward.data.outputs[0].amount = 9000; // breaks the hash

        let (status, _) = send(
            &state,
            Method::POST,
            "/blockchain/transactions",
            Some(serde_json::to_value(&reward).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request_not_unprocessable() {
        let state = test_state();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/blockchain/transactions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = create_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transaction_found_in_block_after_mining() {
        let state = test_state();
        let reward = Transaction::reward("miner", 50);
        let block = mined_successor(&state, vec![reward.clone()]).await;
        state.blockchain.write().await.add_block(block).unwrap();

        let (status, body) = send(
            &state,
            Method::GET,
            &format!("/blockchain/blocks/transactions/{}", reward.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let found: Transaction = serde_json::from_str(&body).unwrap();
        assert_eq!(found.id, reward.id);

        let missing = "c".repeat(64);
        let (status, body) = send(
            &state,
            Method::GET,
            &format!("/blockchain/blocks/transactions/{missing}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            format!("Transaction '{missing}' not found in any block")
        );
    }

    #[tokio::test]
    async fn test_pending_and_address_transaction_views() {
        let state = test_state();
        let reward = Transaction::reward("miner", 50);
        send(
            &state,
            Method::POST,
            "/blockchain/transactions",
            Some(serde_json::to_value(&reward).unwrap()),
        )
        .await;

        let (status, body) =
            send(&state, Method::GET, "/blockchain/transactions/regular", None).await;
        assert_eq!(status, StatusCode::OK);
        let pending: Vec<Transaction> = serde_json::from_str(&body).unwrap();
        assert_eq!(pending.len(), 1);

        // Not mined yet, so the address has no history and no unspent outputs
        let (status, body) =
            send(&state, Method::GET, "/blockchain/transactions?address=miner", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");

        let block = mined_successor(&state, vec![reward]).await;
        state.blockchain.write().await.add_block(block).unwrap();

        let (_, body) =
            send(&state, Method::GET, "/blockchain/transactions?address=miner", None).await;
        let touching: Vec<Transaction> = serde_json::from_str(&body).unwrap();
        assert_eq!(touching.len(), 1);

        let (_, body) =
            send(&state, Method::GET, "/blockchain/transactions/unspent?address=miner", None)
                .await;
        let unspent: Vec<crate::core::UnspentOutput> = serde_json::from_str(&body).unwrap();
        assert_eq!(unspent.len(), 1);
        assert_eq!(unspent[0].amount, 50);
    }

    #[tokio::test]
    async fn test_wallet_creation_and_address_derivation() {
        let state = test_state();
        let (status, body) = send(&state, Method::POST, "/operator/wallet", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let wallet: serde_json::Value = serde_json::from_str(&body).unwrap();
        let private_key = wallet["privateKey"].as_str().unwrap();
        let address = wallet["address"].as_str().unwrap();
        assert_eq!(address.len(), 64);

        let (status, derived) =
            send(&state, Method::GET, &format!("/operator/wallets/{private_key}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(derived, address);

        let (status, body) =
            send(&state, Method::GET, "/operator/wallets/deadbeef", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Wallet not found for the provided private key");
        assert!(!body.contains("deadbeef"));
    }

    #[tokio::test]
    async fn test_operator_transaction_path() {
        let state = test_state();
        let wallet = state.operator.write().await.create_wallet();

        let reward = Transaction::reward(&wallet.address, 50);
        let block = mined_successor(&state, vec![reward]).await;
        state.blockchain.write().await.add_block(block).unwrap();

        let recipient = "d".repeat(64);
        let (status, body) = send(
            &state,
            Method::POST,
            "/operator/wallets/transactions",
            Some(serde_json::json!({
                "fromAddress": wallet.address,
                "toAddress": recipient,
                "amount": 10,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Transaction = serde_json::from_str(&body).unwrap();
        assert_eq!(created.data.outputs[0].address, recipient);
        assert_eq!(created.fee_paid(), FEE_PER_TRANSACTION);
        assert_eq!(
            state.blockchain.read().await.get_all_transactions().len(),
            1
        );

        // Unknown sender is an argument failure, not an internal error
        let (status, _) = send(
            &state,
            Method::POST,
            "/operator/wallets/transactions",
            Some(serde_json::json!({
                "fromAddress": "e".repeat(64),
                "toAddress": recipient,
                "amount": 10,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // An amount at the u64 ceiling cannot cover the fee on top of it
        let (status, body) = send(
            &state,
            Method::POST,
            "/operator/wallets/transactions",
            Some(serde_json::json!({
                "fromAddress": wallet.address,
                "toAddress": recipient,
                "amount": u64::MAX,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, format!("Amount '{}' is too large", u64::MAX));
    }

    #[tokio::test]
    async fn test_balance_route() {
        let state = test_state();
        let reward = Transaction::reward("miner", 50);
        let block = mined_successor(&state, vec![reward]).await;
        state.blockchain.write().await.add_block(block).unwrap();

        let (status, body) = send(&state, Method::GET, "/operator/miner/balance", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"balance":50}"#);

        let (status, body) = send(&state, Method::GET, "/operator/nobody/balance", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Address 'nobody' not found");
    }

    #[tokio::test]
    async fn test_peer_listing_and_registration() {
        let state = test_state();
        let (status, body) = send(&state, Method::GET, "/node/peers", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");

        let (status, body) = send(
            &state,
            Method::POST,
            "/node/peers",
            Some(serde_json::json!({"url": "http://localhost:3002"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let peer: Peer = serde_json::from_str(&body).unwrap();
        assert_eq!(peer.url, "http://localhost:3002");

        let (_, body) = send(&state, Method::GET, "/node/peers", None).await;
        let peers: Vec<Peer> = serde_json::from_str(&body).unwrap();
        assert_eq!(peers.len(), 1);
    }

    #[tokio::test]
    async fn test_confirmations_count_local_chain() {
        let state = test_state();
        let reward = Transaction::reward("miner", 50);
        let block = mined_successor(&state, vec![reward.clone()]).await;
        state.blockchain.write().await.add_block(block).unwrap();

        let (status, body) = send(
            &state,
            Method::GET,
            &format!("/node/transactions/{}/confirmations", reward.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"confirmations":1}"#);

        let unmined = "a".repeat(64);
        let (status, body) = send(
            &state,
            Method::GET,
            &format!("/node/transactions/{unmined}/confirmations"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"confirmations":0}"#);
    }

    #[tokio::test]
    async fn test_mining_endpoint_appends_a_block() {
        let state = test_state();
        let (status, body) = send(
            &state,
            Method::POST,
            "/miner/mine",
            Some(serde_json::json!({"rewardAddress": "miner"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let block: Block = serde_json::from_str(&body).unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(state.blockchain.read().await.get_all_blocks().len(), 2);
    }

    #[tokio::test]
    async fn test_losing_mine_request_answers_conflict() {
        // Difficulty high enough that both requests snapshot the same tip
        // before either proof of work completes
        let blockchain = Arc::new(RwLock::new(Blockchain::with_difficulty(16)));
        let node = Arc::new(Node::new("localhost", 3001, Arc::clone(&blockchain)));
        let miner = Arc::new(Miner::new(Arc::clone(&blockchain)));
        let state = ApiState {
            blockchain,
            operator: Arc::new(RwLock::new(Operator::new())),
            node,
            miner,
        };

        let body = serde_json::json!({"rewardAddress": "miner"});
        let (first, second) = tokio::join!(
            send(&state, Method::POST, "/miner/mine", Some(body.clone())),
            send(&state, Method::POST, "/miner/mine", Some(body)),
        );

        let (winner, loser) = if first.0 == StatusCode::CREATED {
            (first, second)
        } else {
            (second, first)
        };
        assert_eq!(winner.0, StatusCode::CREATED);
        assert_eq!(loser.0, StatusCode::CONFLICT);
        assert_eq!(
            loser.1,
            "A new block was added before we were able to mine one"
        );

        // Exactly one block was appended, not two
        assert_eq!(state.blockchain.read().await.get_all_blocks().len(), 2);
        let block: Block = serde_json::from_str(&winner.1).unwrap();
        assert_eq!(state.blockchain.read().await.latest_block().hash, block.hash);
    }

    #[tokio::test]
    async fn test_mined_block_beaten_by_interloper_is_conflict() {
        let state = test_state();

        // Mine without inserting, then let a rival land first
        let beaten = state.miner.mine("miner", "miner", BLOCK_REWARD).await.unwrap();
        let rival = mined_successor(&state, vec![]).await;
        state.blockchain.write().await.add_block(rival).unwrap();

        let verdict = state.node.check_received_block(beaten).await.unwrap();
        assert_eq!(verdict, SubmissionCheck::Rejected);
        // Exactly one block was appended: the rival's
        assert_eq!(state.blockchain.read().await.get_all_blocks().len(), 2);

        // The same race surfaces as InvalidIndex on a raw insert
        let late = state.miner.mine("miner", "miner", BLOCK_REWARD).await;
        let late = {
            let chain = state.blockchain.read().await;
            let mut block = late.unwrap();
            block.index = chain.latest_block().index; // stale on purpose
            block
        };
        let err = state.blockchain.write().await.add_block(late).unwrap_err();
        assert!(matches!(err, BlockchainError::InvalidIndex { .. }));
    }
}
