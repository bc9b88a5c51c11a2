//! The Conclave node: wires the consensus core, container sync and the
//! ambient stack (metrics, spans, shutdown) together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn, Instrument};

use conclave_consensus::{
    ConsensusValidator, ElectionManager, ProposalEvent, ProposalQueue, QuorumOutcome, VoteQueue,
};
use conclave_crypto::{Hasher, SignedMessage, Signer};
use conclave_ledger::{BlockManager, ContainerProcessor, Ledger};
use conclave_network::{
    ContainerSyncer, PassOutcome, PeerTransport, SyncPhase, SyncRequest, SyncResponse, SyncServer,
};
use conclave_types::{AccountId, Block, Container, NetworkId, NodeId, PublicKey, Vote};
use conclave_utils::{format_duration_ms, Clock, IntervalTicker, Ticker};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::ConsensusMetrics;
use crate::shutdown::ShutdownController;
use crate::tracing_spans::{proposal_span, sync_pass_span, vote_batch_span};

/// Collaborators the node is built from.
///
/// The ledger side is usually one object implementing all three ledger
/// traits; it is passed three times.
pub struct NodeServices {
    pub ledger: Arc<dyn Ledger>,
    pub block_manager: Arc<dyn BlockManager>,
    pub processor: Arc<dyn ContainerProcessor>,
    pub transport: Arc<dyn PeerTransport>,
    pub elections: Arc<dyn ElectionManager>,
    pub signer: Arc<dyn Signer>,
    pub hasher: Arc<dyn Hasher>,
    pub clock: Arc<dyn Clock>,
}

/// Where initial container sync stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    Syncing,
    /// Sync finished (or was forced to finish) holding this genesis.
    Complete(Option<Container>),
    /// The node shut down before sync finished.
    Stopped,
}

pub struct ConsensusNode {
    config: NodeConfig,
    node_id: NodeId,
    network_id: NetworkId,
    ledger: Arc<dyn Ledger>,
    transport: Arc<dyn PeerTransport>,
    signer: Arc<dyn Signer>,
    validator: ConsensusValidator,
    vote_queue: Arc<VoteQueue>,
    proposals: Mutex<ProposalQueue>,
    syncer: ContainerSyncer,
    sync_server: SyncServer,
    sync_status: Arc<watch::Sender<SyncStatus>>,
    metrics: Option<Arc<ConsensusMetrics>>,
    shutdown: ShutdownController,
}

impl ConsensusNode {
    pub fn new(config: NodeConfig, services: NodeServices) -> Result<Self, NodeError> {
        config.validate()?;
        let node_id = config.node_id()?;
        let network_id = config.network_id()?;

        let metrics = if config.enable_metrics {
            Some(Arc::new(ConsensusMetrics::new()?))
        } else {
            None
        };

        let validator =
            ConsensusValidator::new(services.ledger.clone(), services.block_manager.clone());

        let vote_queue = Arc::new(VoteQueue::new(
            config.vote_queue_config(),
            services.ledger.clone(),
            services.elections.clone(),
            services.hasher.clone(),
            services.clock.clone(),
        ));

        let mut proposals = ProposalQueue::new(config.proposal_queue_config(), services.clock);
        if let Some(metrics) = &metrics {
            let metrics = metrics.clone();
            proposals.subscribe(move |event| match event {
                ProposalEvent::Queued { .. } => metrics.proposals_queued.inc(),
                ProposalEvent::Rejected { .. } => metrics.proposals_rejected.inc(),
                ProposalEvent::Expired { .. } => metrics.proposals_expired.inc(),
            });
        }

        let (status_tx, _) = watch::channel(SyncStatus::Syncing);
        let sync_status = Arc::new(status_tx);

        let mut syncer = ContainerSyncer::new(
            network_id,
            config.sync_config(),
            services.ledger.clone(),
            services.processor,
            services.transport.clone(),
        );
        {
            let sync_status = sync_status.clone();
            syncer.on_sync_complete(move |genesis| {
                info!(
                    genesis = ?genesis.as_ref().map(|c| c.hash),
                    "container sync complete"
                );
                sync_status.send_replace(SyncStatus::Complete(genesis));
            });
        }

        let sync_server = SyncServer::new(network_id, services.ledger.clone());

        info!(node = %node_id, network = %network_id, metrics = metrics.is_some(), "node created");

        Ok(Self {
            config,
            node_id,
            network_id,
            ledger: services.ledger,
            transport: services.transport,
            signer: services.signer,
            validator,
            vote_queue,
            proposals: Mutex::new(proposals),
            syncer,
            sync_server,
            sync_status,
            metrics,
            shutdown: ShutdownController::new(),
        })
    }

    // ── Consensus ───────────────────────────────────────────────────────

    /// Whether the validators that signed `block` hold a quorum of the weight
    /// currently connected.
    pub async fn multi_signature_quorum_reached(&self, block: &Block) -> bool {
        self.evaluate_block_quorum(block).await.reached
    }

    pub async fn evaluate_block_quorum(&self, block: &Block) -> QuorumOutcome {
        let connected = self.transport.connected_node_ids().await;
        self.validator.evaluate_block_quorum(block, &connected).await
    }

    pub async fn add_vote(&self, vote: Vote, from_node: NodeId) {
        self.vote_queue.add_vote(vote, from_node).await;
        if let Some(metrics) = &self.metrics {
            metrics.votes_queued.inc();
        }
    }

    /// Sign `block` as this node and queue it for proposal.
    ///
    /// Returns `Ok(false)` when the block is already in the ledger or the
    /// proposal queue refuses it.
    pub async fn propose(&self, block: Block, priority: i64) -> Result<bool, NodeError> {
        let span = proposal_span(&block.hash.to_hex(), priority);
        self.sign_and_enqueue(block, priority).instrument(span).await
    }

    async fn sign_and_enqueue(&self, mut block: Block, priority: i64) -> Result<bool, NodeError> {
        if self.ledger.action(&block.hash).await?.is_some() {
            debug!("block already confirmed, not proposing");
            return Ok(false);
        }
        let signature = self.signer.sign(block.hash.as_bytes());
        block
            .validator_signatures
            .insert(self.node_id.clone(), signature);
        let queued = self.proposals.lock().await.enqueue(block, priority);
        if !queued {
            warn!("proposal queue refused block");
        }
        Ok(queued)
    }

    /// Highest-ranked live proposal, if any.
    pub async fn next_proposal(&self) -> Option<Block> {
        self.proposals.lock().await.next()
    }

    pub async fn proposal_count(&self) -> usize {
        self.proposals.lock().await.len()
    }

    /// Batch-verify every validator signature on `block` against `keys`.
    ///
    /// A signer missing from `keys` fails the whole block.
    pub fn verify_validator_signatures(
        &self,
        block: &Block,
        keys: &HashMap<NodeId, PublicKey>,
    ) -> bool {
        let message = block.hash.as_bytes();
        let mut items = Vec::with_capacity(block.validator_signatures.len());
        for (node, signature) in &block.validator_signatures {
            let Some(public_key) = keys.get(node) else {
                debug!(%node, "no public key for validator");
                return false;
            };
            items.push(SignedMessage {
                message,
                signature,
                public_key,
            });
        }
        self.signer.batch_verify(&items)
    }

    pub async fn account_history(&self, account: &AccountId) -> Result<Vec<Block>, NodeError> {
        Ok(self.ledger.account_history(account).await?)
    }

    // ── Sync ────────────────────────────────────────────────────────────

    /// Answer a peer's sync request from the local ledger.
    pub async fn handle_sync_request(&self, request: SyncRequest) -> SyncResponse {
        self.sync_server.handle(request).await
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status.borrow().clone()
    }

    pub async fn sync_phase(&self) -> SyncPhase {
        self.syncer.phase().await
    }

    /// Resolves with the synced genesis once sync completes. Resolves with
    /// `None` if the node shuts down first or sync was forced to complete
    /// without a genesis.
    pub async fn wait_for_sync(&self) -> Option<Container> {
        let mut rx = self.sync_status.subscribe();
        let genesis = match rx.wait_for(|s| *s != SyncStatus::Syncing).await {
            Ok(status) => match &*status {
                SyncStatus::Complete(genesis) => genesis.clone(),
                SyncStatus::Syncing | SyncStatus::Stopped => None,
            },
            Err(_) => None,
        };
        genesis
    }

    fn stop_sync(&self) {
        self.syncer.stop();
        self.sync_status.send_if_modified(|status| {
            if *status == SyncStatus::Syncing {
                *status = SyncStatus::Stopped;
                true
            } else {
                false
            }
        });
    }

    // ── Metrics ─────────────────────────────────────────────────────────

    /// Resample gauges and advance counters from component totals.
    pub async fn refresh_metrics(&self) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let votes = self.vote_queue.metrics().await;
        ConsensusMetrics::sync_counter(&metrics.votes_dispatched, votes.dispatched_total);
        ConsensusMetrics::sync_counter(&metrics.votes_rejected, votes.rejected_total);
        metrics.vote_backlog.set(votes.pending_votes as i64);

        let proposals = self.proposals.lock().await.queue_metrics();
        metrics.proposal_queue_size.set(proposals.size as i64);

        let manager = self.syncer.manager();
        ConsensusMetrics::sync_counter(&metrics.containers_applied, manager.applied_total());
        metrics
            .unprocessed_containers
            .set(manager.unprocessed_count().await as i64);
        metrics.sync_retries.set(i64::from(self.syncer.retries().await));
    }

    // ── Loops ───────────────────────────────────────────────────────────

    /// Drive vote batching and container sync from real-time tickers until
    /// shutdown.
    pub async fn run(&self) {
        info!(
            vote_interval = %format_duration_ms(self.config.vote_queue.interval_ms),
            sync_retry_delay = %format_duration_ms(self.config.sync.retry_delay_ms),
            "starting real-time tickers"
        );
        let vote_ticker =
            IntervalTicker::new(Duration::from_millis(self.config.vote_queue.interval_ms));
        let sync_ticker =
            IntervalTicker::immediate(Duration::from_millis(self.config.sync.retry_delay_ms));
        self.run_with(vote_ticker, sync_ticker).await;
    }

    /// Drive both loops from the given tick sources.
    ///
    /// The sync loop ends when sync completes, stops, or its ticker is
    /// exhausted. The vote loop runs until shutdown or its ticker is
    /// exhausted.
    pub async fn run_with(&self, vote_ticker: impl Ticker, sync_ticker: impl Ticker) {
        info!(node = %self.node_id, "node loops starting");
        tokio::join!(self.vote_loop(vote_ticker), self.sync_loop(sync_ticker));
        self.refresh_metrics().await;
        info!(node = %self.node_id, "node loops stopped");
    }

    /// [`run`](Self::run) until SIGINT/SIGTERM or [`shutdown`](Self::shutdown).
    pub async fn run_until_signal(&self) {
        let signal = async {
            let mut rx = self.shutdown.subscribe();
            tokio::select! {
                _ = self.shutdown.wait_for_signal() => {}
                _ = rx.recv() => {}
            }
            self.stop_sync();
        };
        tokio::join!(self.run(), signal);
    }

    /// Stop both loops and any pending sync.
    pub fn shutdown(&self) {
        info!(node = %self.node_id, "node shutting down");
        self.shutdown.shutdown();
        self.stop_sync();
    }

    /// Each tick dispatches on its own task. The queue's processing set keeps
    /// at most one batch in flight per election.
    async fn vote_loop(&self, mut ticker: impl Ticker) {
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut in_flight: JoinSet<usize> = JoinSet::new();
        while !self.shutdown.is_triggered() {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                more = ticker.tick() => {
                    if !more {
                        debug!("vote ticker exhausted");
                        break;
                    }
                }
            }
            while let Some(done) = in_flight.try_join_next() {
                Self::log_tick_result(done);
            }
            let pending = self.vote_queue.metrics().await.pending_votes;
            if pending > 0 {
                let queue = self.vote_queue.clone();
                in_flight.spawn(
                    async move { queue.tick().await }.instrument(vote_batch_span(pending)),
                );
            }
            self.refresh_metrics().await;
        }
        self.drain_vote_ticks(in_flight, shutdown_rx).await;
    }

    /// Let in-flight ticks finish unless shutdown arrives first.
    async fn drain_vote_ticks(
        &self,
        mut in_flight: JoinSet<usize>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        if self.shutdown.is_triggered() {
            in_flight.abort_all();
        }
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv(), if !in_flight.is_empty() => {
                    debug!(tasks = in_flight.len(), "aborting in-flight vote ticks");
                    in_flight.abort_all();
                }
                done = in_flight.join_next() => match done {
                    Some(done) => Self::log_tick_result(done),
                    None => break,
                },
            }
        }
    }

    fn log_tick_result(done: Result<usize, JoinError>) {
        match done {
            Ok(dispatched) => debug!(dispatched, "vote tick finished"),
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!(error = %e, "vote tick task failed"),
        }
    }

    async fn sync_loop(&self, mut ticker: impl Ticker) {
        let mut shutdown_rx = self.shutdown.subscribe();
        let network = self.network_id.to_string();
        while !self.shutdown.is_triggered() {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = self.syncer.stopped() => break,
                more = ticker.tick() => {
                    if !more {
                        debug!("sync ticker exhausted");
                        break;
                    }
                }
            }

            let retries_before = self.syncer.retries().await;
            let started = Instant::now();
            let outcome = self
                .syncer
                .sync_pass()
                .instrument(sync_pass_span(&network, retries_before))
                .await;
            if let Some(metrics) = &self.metrics {
                metrics.sync_passes.inc();
                metrics
                    .sync_pass_duration_ms
                    .observe(started.elapsed().as_secs_f64() * 1_000.0);
                if outcome == PassOutcome::Exhausted
                    || self.syncer.retries().await > retries_before
                {
                    metrics.sync_failures.inc();
                }
            }

            if outcome != PassOutcome::Reschedule {
                info!(?outcome, "sync loop finished");
                break;
            }
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn network_id(&self) -> NetworkId {
        self.network_id
    }

    pub fn validator(&self) -> &ConsensusValidator {
        &self.validator
    }

    pub fn vote_queue(&self) -> &VoteQueue {
        &self.vote_queue
    }

    pub fn syncer(&self) -> &ContainerSyncer {
        &self.syncer
    }

    pub fn metrics(&self) -> Option<&ConsensusMetrics> {
        self.metrics.as_deref()
    }
}
