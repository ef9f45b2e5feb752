//! Node: peer bookkeeping and block propagation.

pub mod node;

pub use node::{Node, NodeError, Peer};
