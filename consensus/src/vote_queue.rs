//! Vote queue — batches election votes and dispatches them by weight.
//!
//! Votes are buffered per election. On each tick, every election that has
//! pending votes and is not already being processed takes its heaviest
//! `batch_size` votes (ties broken by vote hash) and dispatches them
//! concurrently to the [`ElectionManager`]. Each election moves through
//! idle → batching → dispatching → idle; distinct elections are independent.
//!
//! A vote the election manager rejects is logged and dropped. It is never
//! retried and never blocks the rest of its batch.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use conclave_crypto::Hasher;
use conclave_ledger::Ledger;
use conclave_types::{ElectionId, Hash256, NodeId, Timestamp, Vote, Weight};
use conclave_utils::Clock;

use crate::ElectionManager;

/// Default number of votes dispatched per election per tick.
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Default tick interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteQueueConfig {
    pub batch_size: usize,
    pub interval_ms: u64,
}

impl Default for VoteQueueConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

/// A buffered vote with the data needed to order it.
#[derive(Clone, Debug)]
pub struct VoteRecord {
    pub vote: Vote,
    /// Peer that relayed the vote.
    pub from_node: NodeId,
    /// Ledger weight of the voter when the vote was queued.
    pub weight: Weight,
    pub timestamp: Timestamp,
    pub hash: Hash256,
}

/// Snapshot of queue occupancy and lifetime totals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteQueueMetrics {
    /// Elections with at least one buffered vote.
    pub pending_elections: usize,
    pub pending_votes: usize,
    pub elections_processing: usize,
    pub dispatched_total: u64,
    pub rejected_total: u64,
}

#[derive(Default)]
struct QueueState {
    pending: HashMap<ElectionId, Vec<VoteRecord>>,
    processing: HashSet<ElectionId>,
}

pub struct VoteQueue {
    config: VoteQueueConfig,
    ledger: Arc<dyn Ledger>,
    elections: Arc<dyn ElectionManager>,
    hasher: Arc<dyn Hasher>,
    clock: Arc<dyn Clock>,
    state: Mutex<QueueState>,
    dispatched: AtomicU64,
    rejected: AtomicU64,
}

/// Deterministic dispatch order: heaviest first, then ascending hash.
pub fn order_votes(records: &mut [VoteRecord]) {
    records.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.hash.cmp(&b.hash)));
}

impl VoteQueue {
    pub fn new(
        config: VoteQueueConfig,
        ledger: Arc<dyn Ledger>,
        elections: Arc<dyn ElectionManager>,
        hasher: Arc<dyn Hasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            ledger,
            elections,
            hasher,
            clock,
            state: Mutex::new(QueueState::default()),
            dispatched: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &VoteQueueConfig {
        &self.config
    }

    /// Buffer a vote relayed by `from_node`.
    ///
    /// The voter's weight is read from the ledger now; an unknown voter or a
    /// failed lookup counts as zero. Duplicate voters are not filtered.
    pub async fn add_vote(&self, vote: Vote, from_node: NodeId) {
        let weight = match self.ledger.vote_weight(&vote.voter).await {
            Ok(weight) => weight.unwrap_or(Weight::ZERO),
            Err(e) => {
                warn!(voter = %vote.voter, error = %e, "weight lookup failed, counting zero");
                Weight::ZERO
            }
        };
        let timestamp = self.clock.now();
        let hash = self.hasher.hash(&format!(
            "{}:{}:{}",
            vote.election,
            vote.voter,
            timestamp.as_millis()
        ));

        debug!(election = %vote.election, voter = %vote.voter, %weight, "vote queued");
        let record = VoteRecord {
            vote,
            from_node,
            weight,
            timestamp,
            hash,
        };
        let mut state = self.state.lock().await;
        state
            .pending
            .entry(record.vote.election.clone())
            .or_default()
            .push(record);
    }

    /// Take one batch from every idle election with pending votes and
    /// dispatch them. Returns the number of votes handed to the election
    /// manager.
    pub async fn tick(&self) -> usize {
        let batches = self.take_batches().await;
        if batches.is_empty() {
            return 0;
        }
        let dispatched: usize = batches.iter().map(|(_, batch)| batch.len()).sum();
        join_all(
            batches
                .into_iter()
                .map(|(election, batch)| self.process_batch(election, batch)),
        )
        .await;
        dispatched
    }

    async fn take_batches(&self) -> Vec<(ElectionId, Vec<VoteRecord>)> {
        let mut state = self.state.lock().await;
        let QueueState {
            pending,
            processing,
        } = &mut *state;

        let mut batches = Vec::new();
        for (election, records) in pending.iter_mut() {
            if records.is_empty() || processing.contains(election) {
                continue;
            }
            order_votes(records);
            let take = records.len().min(self.config.batch_size);
            let batch: Vec<VoteRecord> = records.drain(..take).collect();
            processing.insert(election.clone());
            batches.push((election.clone(), batch));
        }
        pending.retain(|_, records| !records.is_empty());
        batches
    }

    async fn process_batch(&self, election: ElectionId, batch: Vec<VoteRecord>) {
        let size = batch.len();
        let results = join_all(batch.iter().map(|record| self.dispatch(record))).await;
        let accepted = results.iter().filter(|ok| **ok).count();
        info!(%election, size, accepted, "vote batch dispatched");

        self.state.lock().await.processing.remove(&election);
    }

    async fn dispatch(&self, record: &VoteRecord) -> bool {
        let vote = &record.vote;
        let weight = record.weight.to_string();
        match self
            .elections
            .process_vote(
                &vote.election,
                &vote.voter,
                &vote.candidate,
                &vote.signature,
                &weight,
            )
            .await
        {
            Ok(()) => {
                self.dispatched.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    election = %vote.election,
                    voter = %vote.voter,
                    error = %e,
                    "vote rejected by election manager"
                );
                false
            }
        }
    }

    pub async fn metrics(&self) -> VoteQueueMetrics {
        let state = self.state.lock().await;
        VoteQueueMetrics {
            pending_elections: state.pending.values().filter(|r| !r.is_empty()).count(),
            pending_votes: state.pending.values().map(Vec::len).sum(),
            elections_processing: state.processing.len(),
            dispatched_total: self.dispatched.load(Ordering::Relaxed),
            rejected_total: self.rejected.load(Ordering::Relaxed),
        }
    }
}
