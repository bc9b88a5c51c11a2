//! Proposal queue — bounded, TTL-limited holding area for blocks awaiting
//! proposal.
//!
//! Items are keyed by block hash. `next` scans the whole map, evicting
//! anything older than `max_age_ms`, and hands out the highest-priority
//! survivor. Ties go to the item queued first, then to the lower hash.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use conclave_types::{Block, Hash256, Timestamp};
use conclave_utils::Clock;

pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1_000;
pub const DEFAULT_MAX_AGE_MS: u64 = 60_000;
/// Priority used when the caller has no preference.
pub const DEFAULT_PRIORITY: i64 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalQueueConfig {
    pub max_queue_size: usize,
    pub max_age_ms: u64,
}

impl Default for ProposalQueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            max_age_ms: DEFAULT_MAX_AGE_MS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProposalItem {
    pub proposal: Block,
    pub priority: i64,
    pub added_at: Timestamp,
}

/// Lifecycle notifications for queued proposals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProposalEvent {
    /// A proposal was inserted (or replaced an entry with the same hash).
    Queued { hash: Hash256, priority: i64 },
    /// A proposal was refused.
    Rejected { hash: Hash256, reason: String },
    /// A proposal aged out before being taken.
    Expired { hash: Hash256 },
}

type Listener = Box<dyn Fn(&ProposalEvent) + Send + Sync>;

/// Occupancy snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProposalQueueMetrics {
    pub size: usize,
}

pub struct ProposalQueue {
    config: ProposalQueueConfig,
    clock: Arc<dyn Clock>,
    items: HashMap<Hash256, ProposalItem>,
    listeners: Vec<Listener>,
}

impl ProposalQueue {
    pub fn new(config: ProposalQueueConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            items: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    /// Register an observer. Observers run inline on the calling task.
    pub fn subscribe(&mut self, listener: impl Fn(&ProposalEvent) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&self, event: ProposalEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// Queue `proposal`. Returns `false` if the queue is full.
    ///
    /// The capacity check comes first, so at capacity even a proposal whose
    /// hash is already queued is refused.
    pub fn enqueue(&mut self, proposal: Block, priority: i64) -> bool {
        let hash = proposal.hash;
        if self.items.len() >= self.config.max_queue_size {
            warn!(%hash, size = self.items.len(), "proposal queue full, rejecting");
            self.emit(ProposalEvent::Rejected {
                hash,
                reason: "queue full".to_string(),
            });
            return false;
        }

        let item = ProposalItem {
            proposal,
            priority,
            added_at: self.clock.now(),
        };
        self.items.insert(hash, item);
        debug!(%hash, priority, "proposal queued");
        self.emit(ProposalEvent::Queued { hash, priority });
        true
    }

    /// Remove and return the best non-expired proposal.
    pub fn next(&mut self) -> Option<Block> {
        let now = self.clock.now();
        let max_age = self.config.max_age_ms;

        let expired: Vec<Hash256> = self
            .items
            .iter()
            .filter(|(_, item)| item.added_at.has_expired(max_age, now))
            .map(|(hash, _)| *hash)
            .collect();
        for hash in expired {
            self.items.remove(&hash);
            debug!(%hash, "proposal expired");
            self.emit(ProposalEvent::Expired { hash });
        }

        let best = self
            .items
            .iter()
            .min_by(|(ha, a), (hb, b)| Self::rank(ha, a, hb, b))
            .map(|(hash, _)| *hash)?;
        self.items.remove(&best).map(|item| item.proposal)
    }

    /// Higher priority first, then earlier `added_at`, then lower hash.
    fn rank(ha: &Hash256, a: &ProposalItem, hb: &Hash256, b: &ProposalItem) -> Ordering {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.added_at.cmp(&b.added_at))
            .then_with(|| ha.cmp(hb))
    }

    /// Drop a proposal regardless of age or priority.
    pub fn remove(&mut self, hash: &Hash256) -> Option<ProposalItem> {
        self.items.remove(hash)
    }

    pub fn contains(&self, hash: &Hash256) -> bool {
        self.items.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn queue_metrics(&self) -> ProposalQueueMetrics {
        ProposalQueueMetrics {
            size: self.items.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_types::{AccountId, Instruction};
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
    use std::sync::Mutex;

    struct TestClock(AtomicU64);

    impl TestClock {
        fn advance(&self, ms: u64) {
            self.0.fetch_add(ms, AtomicOrdering::SeqCst);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Timestamp {
            Timestamp::new(self.0.load(AtomicOrdering::SeqCst))
        }
    }

    fn block(nonce: u64) -> Block {
        Block::new(
            AccountId::new("alice"),
            AccountId::new("bob"),
            Instruction::new("transfer", vec![1, 2, 3]),
            Timestamp::new(1),
            nonce,
            None,
        )
    }

    fn queue(max_queue_size: usize) -> (ProposalQueue, Arc<TestClock>) {
        let clock = Arc::new(TestClock(AtomicU64::new(1_000)));
        let config = ProposalQueueConfig {
            max_queue_size,
            max_age_ms: 60_000,
        };
        (ProposalQueue::new(config, clock.clone()), clock)
    }

    #[test]
    fn third_enqueue_rejected_at_capacity_two() {
        let (mut q, _) = queue(2);
        assert!(q.enqueue(block(1), DEFAULT_PRIORITY));
        assert!(q.enqueue(block(2), DEFAULT_PRIORITY));
        assert!(!q.enqueue(block(3), DEFAULT_PRIORITY));
        assert_eq!(q.queue_metrics().size, 2);
    }

    #[test]
    fn highest_priority_first() {
        let (mut q, _) = queue(10);
        let low = block(1);
        let high = block(2);
        q.enqueue(low.clone(), 1);
        q.enqueue(high.clone(), 5);
        assert_eq!(q.next().map(|b| b.hash), Some(high.hash));
        assert_eq!(q.next().map(|b| b.hash), Some(low.hash));
        assert!(q.next().is_none());
    }

    #[test]
    fn equal_priority_goes_to_earliest() {
        let (mut q, clock) = queue(10);
        let first = block(1);
        let second = block(2);
        q.enqueue(first.clone(), 3);
        clock.advance(10);
        q.enqueue(second, 3);
        assert_eq!(q.next().map(|b| b.hash), Some(first.hash));
    }

    #[test]
    fn equal_priority_and_time_goes_to_lower_hash() {
        let (mut q, _) = queue(10);
        let a = block(1);
        let b = block(2);
        let lower = a.hash.min(b.hash);
        q.enqueue(a, 3);
        q.enqueue(b, 3);
        assert_eq!(q.next().map(|b| b.hash), Some(lower));
    }

    #[test]
    fn expired_items_are_never_returned() {
        let (mut q, clock) = queue(10);
        q.enqueue(block(1), 1);
        clock.advance(60_000);
        assert!(q.next().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn item_just_inside_ttl_is_returned() {
        let (mut q, clock) = queue(10);
        q.enqueue(block(1), 1);
        clock.advance(59_999);
        assert!(q.next().is_some());
    }

    #[test]
    fn same_hash_overwrites() {
        let (mut q, _) = queue(10);
        let b = block(1);
        q.enqueue(b.clone(), 1);
        q.enqueue(b.clone(), 9);
        assert_eq!(q.len(), 1);
        assert_eq!(q.remove(&b.hash).map(|i| i.priority), Some(9));
        assert!(q.remove(&b.hash).is_none());
    }

    #[test]
    fn observers_see_queued_rejected_and_expired() {
        let (mut q, clock) = queue(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        q.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let a = block(1);
        let b = block(2);
        q.enqueue(a.clone(), 2);
        q.enqueue(b.clone(), 2);
        clock.advance(60_000);
        q.next();

        let events = seen.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                ProposalEvent::Queued { hash: a.hash, priority: 2 },
                ProposalEvent::Rejected { hash: b.hash, reason: "queue full".into() },
                ProposalEvent::Expired { hash: a.hash },
            ]
        );
    }
}
