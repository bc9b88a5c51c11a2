//! Consensus — block validation, weighted quorum, and vote/proposal admission.
//!
//! - A block is final when the validators that signed it hold ≥ 67% of the
//!   weight of the connected peers.
//! - Election votes are buffered and dispatched in weight order, one batch per
//!   election per tick.
//! - Blocks waiting to be proposed sit in a bounded, TTL-limited queue.
//!
//! ## Module overview
//!
//! - [`quorum`] — Pure quorum evaluation over weights.
//! - [`validator`] — Block validation and quorum over ledger weights.
//! - [`election`] — Election manager interface.
//! - [`vote_queue`] — Per-election vote batching and dispatch.
//! - [`proposal_queue`] — Bounded proposal queue with TTL and observers.
//! - [`error`] — Consensus error types.

pub mod election;
pub mod error;
pub mod proposal_queue;
pub mod quorum;
pub mod validator;
pub mod vote_queue;

pub use election::ElectionManager;
pub use error::ConsensusError;
pub use proposal_queue::{
    ProposalEvent, ProposalItem, ProposalQueue, ProposalQueueConfig, ProposalQueueMetrics,
    DEFAULT_PRIORITY,
};
pub use quorum::{evaluate_quorum, QuorumOutcome, QUORUM_PERCENT};
pub use validator::ConsensusValidator;
pub use vote_queue::{order_votes, VoteQueue, VoteQueueConfig, VoteQueueMetrics, VoteRecord};
