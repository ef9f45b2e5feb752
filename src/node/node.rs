//! Node implementation
//!
//! Tracks peers and moves blocks between them. A block that arrives from a
//! peer (or from the local miner) is judged against the current tip; a block
//! too far ahead triggers a full chain download in the background.

use crate::core::{Block, Blockchain, BlockchainError, SubmissionCheck, Transaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Node-level errors
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Peer request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// A peer node, identified by its base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub url: String,
}

/// This node's view of the network
pub struct Node {
    url: String,
    blockchain: Arc<RwLock<Blockchain>>,
    peers: RwLock<Vec<Peer>>,
    client: reqwest::Client,
}

impl Node {
    pub fn new(host: &str, port: u16, blockchain: Arc<RwLock<Blockchain>>) -> Self {
        Self {
            url: format!("http://{host}:{port}"),
            blockchain,
            peers: RwLock::new(Vec::new()),
            client: reqwest::Client::new(),
        }
    }

    /// This node's own base URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current peer list
    pub async fn peers(&self) -> Vec<Peer> {
        self.peers.read().await.clone()
    }

    /// Register a peer and greet it in the background: announce ourselves to
    /// its peer list and fetch its latest block. Our own URL and duplicates
    /// are ignored.
    pub async fn connect_to_peer(&self, peer: Peer) -> Peer {
        if peer.url == self.url {
            return peer;
        }

        {
            let mut peers = self.peers.write().await;
            if peers.contains(&peer) {
                return peer;
            }
            log::info!("Connected to peer {}", peer.url);
            peers.push(peer.clone());
        }

        let client = self.client.clone();
        let blockchain = Arc::clone(&self.blockchain);
        let our_url = self.url.clone();
        let peer_url = peer.url.clone();
        tokio::spawn(async move {
            let greeting = client
                .post(format!("{peer_url}/node/peers"))
                .json(&Peer { url: our_url })
                .send()
                .await;
            if let Err(err) = greeting {
                log::warn!("Unable to announce ourselves to {peer_url}: {err}");
            }

            match fetch_latest_block(&client, &peer_url).await {
                Ok(block) => {
                    let verdict = blockchain.read().await.check_block(&block);
                    if verdict == SubmissionCheck::Unknown {
                        sync_chain_from_peer(&client, &blockchain, &peer_url).await;
                    }
                }
                Err(err) => log::warn!("Unable to fetch latest block from {peer_url}: {err}"),
            }
        });

        peer
    }

    /// Judge a proposed tip and act on the verdict. Check and insertion
    /// happen under one write lock so a rival block cannot slip in between.
    pub async fn check_received_block(
        &self,
        block: Block,
    ) -> Result<SubmissionCheck, BlockchainError> {
        let verdict = {
            let mut blockchain = self.blockchain.write().await;
            let verdict = blockchain.check_block(&block);
            if verdict == SubmissionCheck::Accepted {
                blockchain.add_block(block.clone())?;
            }
            verdict
        };

        match verdict {
            SubmissionCheck::Accepted => self.broadcast_latest(block).await,
            SubmissionCheck::Unknown => self.spawn_chain_sync().await,
            SubmissionCheck::Rejected => {}
        }

        Ok(verdict)
    }

    /// Count how many nodes (including this one) have mined `transaction_id`
    /// into a block. Unreachable peers simply do not count.
    pub async fn get_confirmations(&self, transaction_id: &str) -> u32 {
        let mut confirmations = 0;
        if self
            .blockchain
            .read()
            .await
            .get_transaction_from_blocks(transaction_id)
            .is_some()
        {
            confirmations += 1;
        }

        for peer in self.peers.read().await.iter() {
            match self
                .client
                .get(format!(
                    "{}/blockchain/blocks/transactions/{transaction_id}",
                    peer.url
                ))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    if response.json::<Transaction>().await.is_ok() {
                        confirmations += 1;
                    }
                }
                Ok(_) => {}
                Err(err) => log::warn!("Peer {} unreachable for confirmation: {err}", peer.url),
            }
        }

        confirmations
    }

    /// Download each peer's chain in the background and adopt the longest
    /// valid one
    async fn spawn_chain_sync(&self) {
        let client = self.client.clone();
        let blockchain = Arc::clone(&self.blockchain);
        let peers = self.peers.read().await.clone();
        tokio::spawn(async move {
            for peer in peers {
                sync_chain_from_peer(&client, &blockchain, &peer.url).await;
            }
        });
    }

    /// Push our new tip to every peer in the background
    async fn broadcast_latest(&self, block: Block) {
        let peers = self.peers.read().await.clone();
        for peer in peers {
            let client = self.client.clone();
            let block = block.clone();
            tokio::spawn(async move {
                let result = client
                    .put(format!("{}/blockchain/blocks/latest", peer.url))
                    .json(&block)
                    .send()
                    .await;
                if let Err(err) = result {
                    log::warn!("Unable to send latest block to {}: {err}", peer.url);
                }
            });
        }
    }
}

async fn fetch_latest_block(
    client: &reqwest::Client,
    peer_url: &str,
) -> Result<Block, NodeError> {
    let block = client
        .get(format!("{peer_url}/blockchain/blocks/latest"))
        .send()
        .await?
        .error_for_status()?
        .json::<Block>()
        .await?;
    Ok(block)
}

async fn sync_chain_from_peer(
    client: &reqwest::Client,
    blockchain: &Arc<RwLock<Blockchain>>,
    peer_url: &str,
) {
    let blocks = client
        .get(format!("{peer_url}/blockchain/blocks"))
        .send()
        .await
        .and_then(|r| r.error_for_status());

    let blocks = match blocks {
        Ok(response) => response.json::<Vec<Block>>().await,
        Err(err) => {
            log::warn!("Unable to download chain from {peer_url}: {err}");
            return;
        }
    };

    match blocks {
        Ok(blocks) => {
            let result = blockchain.write().await.replace_chain(blocks);
            match result {
                Ok(()) => log::info!("Adopted chain from {peer_url}"),
                Err(err) => log::info!("Kept local chain over {peer_url}: {err}"),
            }
        }
        Err(err) => log::warn!("Malformed chain from {peer_url}: {err}"),
    }
}
