//! Container sync manager — reassembles containers that arrive out of order
//! into the ledger's hash-chain order.
//!
//! Containers wait in `received` until their predecessor is the ledger tip.
//! A container is applied at most once: its hash joins `processed` on
//! success and every later copy is ignored. `processed` lives as long as the
//! manager.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use conclave_ledger::{ContainerProcessor, Ledger};
use conclave_types::{Container, Hash256};

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncManagerConfig {
    /// Headers handed out per [`ContainerSyncManager::next_container_batch`].
    pub batch_size: usize,
    /// Failed application rounds tolerated per reassembly pass.
    pub max_attempts: u32,
}

impl Default for SyncManagerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Default)]
struct ManagerState {
    received: HashMap<Hash256, Container>,
    queue: VecDeque<Container>,
    processed: HashSet<Hash256>,
}

pub struct ContainerSyncManager {
    config: SyncManagerConfig,
    ledger: Arc<dyn Ledger>,
    processor: Arc<dyn ContainerProcessor>,
    state: Mutex<ManagerState>,
    /// Held for a whole reassembly pass.
    pass_lock: Mutex<()>,
    applied: AtomicU64,
}

impl ContainerSyncManager {
    pub fn new(
        config: SyncManagerConfig,
        ledger: Arc<dyn Ledger>,
        processor: Arc<dyn ContainerProcessor>,
    ) -> Self {
        Self {
            config,
            ledger,
            processor,
            state: Mutex::new(ManagerState::default()),
            pass_lock: Mutex::new(()),
            applied: AtomicU64::new(0),
        }
    }

    /// Queue a header whose blocks still need fetching.
    pub async fn add_container_to_queue(&self, container: Container) {
        let mut state = self.state.lock().await;
        if state.processed.contains(&container.hash) {
            return;
        }
        state.queue.push_back(container);
    }

    /// Put headers back at the front of the queue, keeping their order.
    pub async fn requeue_front(&self, containers: Vec<Container>) {
        let mut state = self.state.lock().await;
        for container in containers.into_iter().rev() {
            if !state.processed.contains(&container.hash) {
                state.queue.push_front(container);
            }
        }
    }

    /// Pop up to `batch_size` headers in FIFO order.
    pub async fn next_container_batch(&self) -> Vec<Container> {
        let mut state = self.state.lock().await;
        let take = state.queue.len().min(self.config.batch_size);
        state.queue.drain(..take).collect()
    }

    /// Accept a full container and try to extend the chain. Returns the
    /// number of containers applied by the resulting pass.
    pub async fn add_container(&self, container: Container) -> usize {
        {
            let mut state = self.state.lock().await;
            if state.processed.contains(&container.hash) {
                debug!(hash = %container.hash, "container already processed, ignoring");
                return 0;
            }
            state.received.insert(container.hash, container);
        }
        self.process_containers().await
    }

    /// Apply every received container that links to the tip, in chain order.
    ///
    /// Each round reads the tip, picks the received container whose previous
    /// hash matches it (lowest hash if several do), and hands it to the
    /// processor. A successful round starts the next one. A container the
    /// processor refuses is dropped without being marked processed, and the
    /// round counts against `max_attempts`. The pass stops early when no
    /// received container links to the tip.
    pub async fn process_containers(&self) -> usize {
        let _pass = self.pass_lock.lock().await;

        let mut applied = 0;
        let mut failed_rounds = 0;
        while failed_rounds < self.config.max_attempts {
            let tip = match self.ledger.last_container_hash().await {
                Ok(tip) => tip,
                Err(e) => {
                    warn!(error = %e, "failed to read ledger tip");
                    failed_rounds += 1;
                    continue;
                }
            };

            let Some(candidate) = self.take_successor(tip).await else {
                break;
            };
            let hash = candidate.hash;

            match self.processor.add_container(candidate).await {
                Ok(state) if state.is_added() => {
                    self.state.lock().await.processed.insert(hash);
                    self.applied.fetch_add(1, Ordering::Relaxed);
                    applied += 1;
                    debug!(%hash, "container applied");
                }
                Ok(state) => {
                    warn!(%hash, %state, "container not added, dropping");
                    failed_rounds += 1;
                }
                Err(e) => {
                    warn!(%hash, error = %e, "container processing failed, dropping");
                    failed_rounds += 1;
                }
            }
        }

        let remaining = self.state.lock().await.received.len();
        if remaining > 0 {
            warn!(remaining, applied, "containers still waiting for their predecessor");
        } else if applied > 0 {
            info!(applied, "reassembly pass complete");
        }
        applied
    }

    async fn take_successor(&self, tip: Option<Hash256>) -> Option<Container> {
        let mut state = self.state.lock().await;
        let hash = state
            .received
            .values()
            .filter(|c| c.previous_container_hash == tip)
            .map(|c| c.hash)
            .min()?;
        state.received.remove(&hash)
    }

    pub async fn has_unprocessed_containers(&self) -> bool {
        self.unprocessed_count().await > 0
    }

    /// Containers received or queued but not yet applied.
    pub async fn unprocessed_count(&self) -> usize {
        let state = self.state.lock().await;
        state.received.len() + state.queue.len()
    }

    /// Received full containers still waiting for their predecessor.
    pub async fn received_count(&self) -> usize {
        self.state.lock().await.received.len()
    }

    pub async fn is_processed(&self, hash: &Hash256) -> bool {
        self.state.lock().await.processed.contains(hash)
    }

    /// Lifetime count of containers applied through this manager.
    pub fn applied_total(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }
}
