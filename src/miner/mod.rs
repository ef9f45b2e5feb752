//! Miner: assembles candidate blocks and runs proof of work off the
//! async runtime.

pub mod miner;

pub use miner::{Miner, MinerError};
