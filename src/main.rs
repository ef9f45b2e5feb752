//! Minicoin node binary
//!
//! Wires the blockchain, operator, node and miner together and serves the
//! REST API until interrupted.

use clap::Parser;
use minicoin::api::{ApiState, HttpServer};
use minicoin::core::Blockchain;
use minicoin::miner::Miner;
use minicoin::node::{Node, Peer};
use minicoin::operator::Operator;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Parser)]
#[command(name = "minicoin")]
#[command(version = "0.1.0")]
#[command(about = "A small proof-of-work cryptocurrency node", long_about = None)]
struct Cli {
    /// Host to bind the HTTP API to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind the HTTP API to
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Comma-separated peer URLs to connect to on startup
    #[arg(long)]
    peers: Option<String>,

    /// Proof-of-work difficulty (number of leading zero bits)
    #[arg(short, long)]
    difficulty: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let blockchain = match cli.difficulty {
        Some(difficulty) => Blockchain::with_difficulty(difficulty),
        None => Blockchain::new(),
    };
    let blockchain = Arc::new(RwLock::new(blockchain));
    let node = Arc::new(Node::new(&cli.host, cli.port, Arc::clone(&blockchain)));
    let miner = Arc::new(Miner::new(Arc::clone(&blockchain)));
    let state = ApiState {
        blockchain,
        operator: Arc::new(RwLock::new(Operator::new())),
        node: Arc::clone(&node),
        miner,
    };

    let mut server = HttpServer::new(state);
    server.start(&cli.host, cli.port).await?;

    if let Some(peers) = cli.peers {
        for url in peers.split(',').map(str::trim).filter(|u| !u.is_empty()) {
            node.connect_to_peer(Peer {
                url: url.to_string(),
            })
            .await;
        }
    }

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down");
    server.stop().await?;
    Ok(())
}
