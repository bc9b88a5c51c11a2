//! Fundamental types for the Conclave ledger node.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! hashes, node and account identities, voting weights, timestamps, blocks, containers
//! and election votes.

pub mod address;
pub mod block;
pub mod container;
pub mod error;
pub mod hash;
pub mod keys;
pub mod network;
pub mod time;
pub mod vote;
pub mod weight;

pub use address::{AccountId, NodeId};
pub use block::{Block, Instruction};
pub use container::Container;
pub use error::TypesError;
pub use hash::Hash256;
pub use keys::{PrivateKey, PublicKey, Signature};
pub use network::NetworkId;
pub use time::Timestamp;
pub use vote::{ElectionId, Vote};
pub use weight::{Weight, WeightTotal};
