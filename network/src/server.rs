//! Serving side of the sync protocol: answers the requests a
//! [`ContainerSyncer`](crate::ContainerSyncer) sends from the local ledger.

use std::sync::Arc;

use tracing::{debug, warn};

use conclave_ledger::{Ledger, LedgerError};
use conclave_types::{Container, Hash256, NetworkId};

use crate::{SyncRequest, SyncResponse};

/// Upper bound on headers returned for one chain request.
pub const MAX_CHAIN_RESPONSE: usize = 10_000;

/// Stateless responder backed by the ledger.
pub struct SyncServer {
    network_id: NetworkId,
    ledger: Arc<dyn Ledger>,
}

impl SyncServer {
    pub fn new(network_id: NetworkId, ledger: Arc<dyn Ledger>) -> Self {
        Self { network_id, ledger }
    }

    /// Answer one request. Ledger failures become [`SyncResponse::Error`].
    pub async fn handle(&self, request: SyncRequest) -> SyncResponse {
        let kind = request.kind();
        let result = match request {
            SyncRequest::GetGenesis => self.genesis().await,
            SyncRequest::GetContainerChain { start, limit } => self.chain(start, limit).await,
            SyncRequest::GetContainersWithBlocks { hashes } => self.with_blocks(&hashes).await,
        };
        match result {
            Ok(response) => {
                debug!(request = kind, response = response.kind(), "sync request served");
                response
            }
            Err(e) => {
                warn!(request = kind, error = %e, "sync request failed");
                SyncResponse::Error(e.to_string())
            }
        }
    }

    async fn genesis(&self) -> Result<SyncResponse, LedgerError> {
        let genesis = self
            .ledger
            .container_with_blocks(&self.network_id.genesis_hash())
            .await?;
        Ok(SyncResponse::Genesis(genesis))
    }

    async fn chain(&self, start: Hash256, limit: usize) -> Result<SyncResponse, LedgerError> {
        let limit = limit.min(MAX_CHAIN_RESPONSE);
        let headers = self
            .ledger
            .containers_after(&start, limit)
            .await?
            .iter()
            .map(Container::header)
            .collect();
        Ok(SyncResponse::ContainerChain(headers))
    }

    /// Unknown hashes are skipped.
    async fn with_blocks(&self, hashes: &[Hash256]) -> Result<SyncResponse, LedgerError> {
        let mut containers = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if let Some(container) = self.ledger.container_with_blocks(hash).await? {
                containers.push(container);
            }
        }
        Ok(SyncResponse::ContainersWithBlocks(containers))
    }
}
