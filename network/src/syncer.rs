//! Container syncer — the top-level synchronization state machine.
//!
//! ```text
//! NoGenesis ──► HaveGenesis ──► ChainFetched ──► SyncComplete
//! ```
//!
//! Every [`ContainerSyncer::sync_pass`] runs exactly one step:
//! 1. acquire and verify the genesis container (locally, else from a peer)
//! 2. fetch one page of container chain headers following the ledger tip;
//!    a full page means more follow, so the next pass fetches after it
//! 3. fetch full containers for a batch of queued headers and reassemble
//! 4. once nothing is left unprocessed, complete and fire the callback
//!
//! A step that makes progress resets the retry counter. A failed step
//! increments it unless the failure was a network failure. Once the counter
//! reaches `max_retries` the syncer stops and completes with whatever genesis
//! it holds.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use conclave_ledger::{ContainerAddState, ContainerProcessor, Ledger, ValidateOptions};
use conclave_types::{Container, Hash256, NetworkId, NodeId};

use crate::server::MAX_CHAIN_RESPONSE;
use crate::sync_manager::{ContainerSyncManager, SyncManagerConfig};
use crate::{NetworkError, PeerTransport, SyncError, SyncRequest, SyncResponse};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5_000;
pub const DEFAULT_CHAIN_LIMIT: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Headers fetched per batch step.
    pub batch_size: usize,
    pub max_retries: u32,
    /// Delay between passes.
    pub retry_delay_ms: u64,
    /// Failed rounds tolerated per reassembly pass.
    pub max_attempts: u32,
    /// Headers requested per chain page.
    pub chain_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let manager = SyncManagerConfig::default();
        Self {
            batch_size: manager.batch_size,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_attempts: manager.max_attempts,
            chain_limit: DEFAULT_CHAIN_LIMIT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    NoGenesis,
    HaveGenesis,
    ChainFetched,
    SyncComplete,
}

/// Result of a step that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Progress,
    /// Nothing advanced, but not an error either (e.g. a genesis that did not
    /// verify). Leaves the retry counter alone.
    Stalled,
}

/// What the driver should do after a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    Reschedule,
    Complete,
    /// Retries exhausted; completion was forced.
    Exhausted,
    Stopped,
}

#[derive(Default)]
struct SyncState {
    genesis: Option<Container>,
    /// Last header of the previous full chain page.
    chain_cursor: Option<Hash256>,
    chain_fetched: bool,
    complete: bool,
    retries: u32,
}

type CompletionCallback = Box<dyn Fn(Option<Container>) + Send + Sync>;

pub struct ContainerSyncer {
    network_id: NetworkId,
    config: SyncConfig,
    ledger: Arc<dyn Ledger>,
    processor: Arc<dyn ContainerProcessor>,
    transport: Arc<dyn PeerTransport>,
    manager: ContainerSyncManager,
    state: Mutex<SyncState>,
    on_complete: Option<CompletionCallback>,
    stopped: AtomicBool,
    stop_notify: Notify,
}

impl ContainerSyncer {
    pub fn new(
        network_id: NetworkId,
        config: SyncConfig,
        ledger: Arc<dyn Ledger>,
        processor: Arc<dyn ContainerProcessor>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        let manager = ContainerSyncManager::new(
            SyncManagerConfig {
                batch_size: config.batch_size,
                max_attempts: config.max_attempts,
            },
            ledger.clone(),
            processor.clone(),
        );
        Self {
            network_id,
            config,
            ledger,
            processor,
            transport,
            manager,
            state: Mutex::new(SyncState::default()),
            on_complete: None,
            stopped: AtomicBool::new(false),
            stop_notify: Notify::new(),
        }
    }

    /// Register the callback fired once when syncing completes, forced or not.
    pub fn on_sync_complete(&mut self, callback: impl Fn(Option<Container>) + Send + Sync + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn manager(&self) -> &ContainerSyncManager {
        &self.manager
    }

    pub async fn phase(&self) -> SyncPhase {
        let state = self.state.lock().await;
        if state.complete {
            SyncPhase::SyncComplete
        } else if state.chain_fetched {
            SyncPhase::ChainFetched
        } else if state.genesis.is_some() {
            SyncPhase::HaveGenesis
        } else {
            SyncPhase::NoGenesis
        }
    }

    pub async fn retries(&self) -> u32 {
        self.state.lock().await.retries
    }

    pub async fn is_complete(&self) -> bool {
        self.state.lock().await.complete
    }

    /// Cancel future passes. In-flight requests are not interrupted.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once [`stop`](Self::stop) has been called.
    pub async fn stopped(&self) {
        loop {
            let notified = self.stop_notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }

    /// Run one step and apply the retry policy.
    pub async fn sync_pass(&self) -> PassOutcome {
        if self.is_complete().await {
            return PassOutcome::Complete;
        }

        let result = self.check_and_sync().await;
        let retries = {
            let mut state = self.state.lock().await;
            match &result {
                Ok(StepOutcome::Progress) => state.retries = 0,
                Ok(StepOutcome::Stalled) => {}
                Err(e) if e.consumes_retry() => {
                    state.retries += 1;
                    warn!(error = %e, retries = state.retries, "sync step failed");
                }
                Err(e) => warn!(error = %e, "sync step hit a network failure, not counted"),
            }
            if state.complete {
                return PassOutcome::Complete;
            }
            state.retries
        };

        if self.is_stopped() {
            return PassOutcome::Stopped;
        }
        if retries < self.config.max_retries {
            return PassOutcome::Reschedule;
        }

        error!(
            retries,
            max_retries = self.config.max_retries,
            "sync retries exhausted, forcing completion"
        );
        self.stop();
        self.complete().await;
        PassOutcome::Exhausted
    }

    /// Execute exactly one step of the state machine.
    pub async fn check_and_sync(&self) -> Result<StepOutcome, SyncError> {
        let (has_genesis, chain_fetched, complete) = {
            let state = self.state.lock().await;
            (state.genesis.is_some(), state.chain_fetched, state.complete)
        };

        if complete {
            Ok(StepOutcome::Progress)
        } else if !has_genesis {
            self.acquire_genesis().await
        } else if !chain_fetched {
            self.fetch_chain().await
        } else if self.manager.has_unprocessed_containers().await {
            self.fetch_batch().await
        } else {
            self.complete().await;
            Ok(StepOutcome::Progress)
        }
    }

    async fn acquire_genesis(&self) -> Result<StepOutcome, SyncError> {
        let genesis_hash = self.network_id.genesis_hash();

        if let Some(local) = self.ledger.container_with_blocks(&genesis_hash).await? {
            if !self.verify_genesis(&local).await {
                error!(hash = %local.hash, "local genesis failed verification");
                return Ok(StepOutcome::Stalled);
            }
            debug!(hash = %local.hash, "genesis loaded from ledger");
            self.state.lock().await.genesis = Some(local);
            return Ok(StepOutcome::Progress);
        }

        let request = SyncRequest::GetGenesis;
        let genesis = match self.transport.send_to_random_peer(request.clone()).await? {
            SyncResponse::Genesis(Some(container)) => container,
            SyncResponse::Genesis(None) => return Err(SyncError::GenesisUnavailable),
            other => return Err(Self::unexpected(&request, other)),
        };

        if !self.verify_genesis(&genesis).await {
            error!(hash = %genesis.hash, "peer genesis failed verification");
            return Ok(StepOutcome::Stalled);
        }

        match self.processor.add_container(genesis.clone()).await? {
            ContainerAddState::ContainerAdded | ContainerAddState::AlreadyExists => {}
            other => return Err(SyncError::GenesisRejected(other.to_string())),
        }
        info!(hash = %genesis.hash, "genesis acquired from peer");
        self.state.lock().await.genesis = Some(genesis);
        Ok(StepOutcome::Progress)
    }

    /// Header validation passes and the hash is both self-consistent and
    /// equal to the network id.
    async fn verify_genesis(&self, container: &Container) -> bool {
        let expected = self.network_id.genesis_hash();
        let valid = match self
            .processor
            .validate_container(container, ValidateOptions::header_only())
            .await
        {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "genesis validation errored");
                false
            }
        };
        valid && container.compute_hash() == container.hash && container.hash == expected
    }

    /// Fetch one page of the chain. A short page ends the fetch; a full one
    /// moves the cursor to its last header for the next pass.
    async fn fetch_chain(&self) -> Result<StepOutcome, SyncError> {
        let cursor = self.state.lock().await.chain_cursor;
        let start = match cursor {
            Some(hash) => hash,
            None => self
                .ledger
                .last_container_hash()
                .await?
                .unwrap_or_else(|| self.network_id.genesis_hash()),
        };
        let limit = self.config.chain_limit.min(MAX_CHAIN_RESPONSE);
        let request = SyncRequest::GetContainerChain { start, limit };

        let headers = match self.transport.send_to_random_peer(request.clone()).await? {
            SyncResponse::ContainerChain(headers) => headers,
            other => return Err(Self::unexpected(&request, other)),
        };

        let count = headers.len();
        let last = headers.last().map(|c| c.hash);
        for header in headers {
            self.manager.add_container_to_queue(header).await;
        }

        let mut state = self.state.lock().await;
        match last {
            Some(hash) if count >= limit => {
                state.chain_cursor = Some(hash);
                debug!(%start, count, "chain page full, more to fetch");
            }
            _ => {
                state.chain_cursor = None;
                state.chain_fetched = true;
                info!(%start, count, "container chain fetched");
            }
        }
        Ok(StepOutcome::Progress)
    }

    async fn fetch_batch(&self) -> Result<StepOutcome, SyncError> {
        let batch = self.manager.next_container_batch().await;
        if batch.is_empty() {
            return self.reassemble().await;
        }

        let peers = self.transport.connected_node_ids().await;
        if peers.is_empty() {
            self.manager.requeue_front(batch).await;
            return Err(NetworkError::NoPeers.into());
        }

        let requested = batch.len();
        let partitions = partition_round_robin(batch, &peers);
        let results = join_all(
            partitions
                .into_iter()
                .map(|(peer, headers)| self.fetch_partition(peer, headers)),
        )
        .await;

        let mut fetched = Vec::new();
        let mut failures = Vec::new();
        for (headers, result) in results {
            match result {
                Ok(containers) => {
                    let missing = accept_containers(headers, containers, &mut fetched);
                    if !missing.is_empty() {
                        debug!(count = missing.len(), "peer omitted containers, requeueing");
                        self.manager.requeue_front(missing).await;
                    }
                }
                Err(e) => {
                    self.manager.requeue_front(headers).await;
                    failures.push(e);
                }
            }
        }

        let received = fetched.len();
        for container in fetched {
            self.manager.add_container(container).await;
        }
        debug!(received, failed_partitions = failures.len(), "batch step done");

        if received > 0 {
            return Ok(StepOutcome::Progress);
        }
        let first_failure = failures.into_iter().next();
        Err(first_failure.unwrap_or(SyncError::NothingReturned(requested)))
    }

    async fn fetch_partition(
        &self,
        peer: NodeId,
        headers: Vec<Container>,
    ) -> (Vec<Container>, Result<Vec<Container>, SyncError>) {
        let request = SyncRequest::GetContainersWithBlocks {
            hashes: headers.iter().map(|c| c.hash).collect(),
        };
        let result = match self.transport.send_to_peer(&peer, request.clone()).await {
            Ok(SyncResponse::ContainersWithBlocks(containers)) => Ok(containers),
            Ok(other) => Err(Self::unexpected(&request, other)),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            warn!(%peer, error = %e, "container fetch failed");
        }
        (headers, result)
    }

    /// Nothing left to fetch, but containers wait for their predecessor.
    async fn reassemble(&self) -> Result<StepOutcome, SyncError> {
        let applied = self.manager.process_containers().await;
        let waiting = self.manager.received_count().await;
        if applied == 0 && waiting > 0 {
            return Err(SyncError::ChainGap(waiting));
        }
        Ok(StepOutcome::Progress)
    }

    async fn complete(&self) {
        let genesis = {
            let mut state = self.state.lock().await;
            if state.complete {
                return;
            }
            state.complete = true;
            state.genesis.clone()
        };
        self.stop();
        info!(
            genesis = ?genesis.as_ref().map(|g| g.hash),
            applied = self.manager.applied_total(),
            "sync complete"
        );
        if let Some(callback) = &self.on_complete {
            callback(genesis);
        }
    }

    fn unexpected(request: &SyncRequest, response: SyncResponse) -> SyncError {
        match response {
            SyncResponse::Error(message) => SyncError::Remote(message),
            other => SyncError::UnexpectedResponse {
                request: request.kind(),
                got: other.kind(),
            },
        }
    }
}

/// Deal headers to peers in turn. Peers that get nothing are left out.
fn partition_round_robin(batch: Vec<Container>, peers: &[NodeId]) -> Vec<(NodeId, Vec<Container>)> {
    let mut partitions: Vec<(NodeId, Vec<Container>)> =
        peers.iter().map(|p| (p.clone(), Vec::new())).collect();
    for (i, header) in batch.into_iter().enumerate() {
        partitions[i % peers.len()].1.push(header);
    }
    partitions.retain(|(_, headers)| !headers.is_empty());
    partitions
}

/// Keep the returned containers that were requested and whose content matches
/// their hash. Returns the requested headers that did not come back.
fn accept_containers(
    requested: Vec<Container>,
    returned: Vec<Container>,
    accepted: &mut Vec<Container>,
) -> Vec<Container> {
    let wanted: HashSet<Hash256> = requested.iter().map(|c| c.hash).collect();
    let mut got = HashSet::new();
    for container in returned {
        if !wanted.contains(&container.hash) || container.compute_hash() != container.hash {
            warn!(hash = %container.hash, "discarding unrequested or inconsistent container");
            continue;
        }
        if got.insert(container.hash) {
            accepted.push(container);
        }
    }
    requested
        .into_iter()
        .filter(|c| !got.contains(&c.hash))
        .collect()
}
