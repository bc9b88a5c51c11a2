//! Sync protocol messages and the transport they travel over.
//!
//! Three request kinds cover everything a syncing node needs:
//! - **GetGenesis**: the chain root, to anchor verification
//! - **GetContainerChain**: container headers following a known hash
//! - **GetContainersWithBlocks**: full containers for a set of hashes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use conclave_types::{Container, Hash256, NodeId};

use crate::NetworkError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncRequest {
    GetGenesis,
    /// Up to `limit` headers following `start` in chain order.
    GetContainerChain { start: Hash256, limit: usize },
    GetContainersWithBlocks { hashes: Vec<Hash256> },
}

impl SyncRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncRequest::GetGenesis => "GetGenesis",
            SyncRequest::GetContainerChain { .. } => "GetContainerChain",
            SyncRequest::GetContainersWithBlocks { .. } => "GetContainersWithBlocks",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncResponse {
    /// The peer's genesis container, if it has one.
    Genesis(Option<Container>),
    /// Headers only; `blocks` is empty.
    ContainerChain(Vec<Container>),
    ContainersWithBlocks(Vec<Container>),
    /// The peer failed to serve the request.
    Error(String),
}

impl SyncResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncResponse::Genesis(_) => "Genesis",
            SyncResponse::ContainerChain(_) => "ContainerChain",
            SyncResponse::ContainersWithBlocks(_) => "ContainersWithBlocks",
            SyncResponse::Error(_) => "Error",
        }
    }
}

/// Request/response access to connected peers.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn send_to_random_peer(&self, request: SyncRequest)
        -> Result<SyncResponse, NetworkError>;

    async fn send_to_peer(
        &self,
        peer: &NodeId,
        request: SyncRequest,
    ) -> Result<SyncResponse, NetworkError>;

    async fn connected_node_ids(&self) -> Vec<NodeId>;
}
