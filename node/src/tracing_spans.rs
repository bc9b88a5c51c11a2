//! Span constructors shared by the node's loops, so traces carry the same
//! names and fields everywhere.

use tracing::{info_span, Span};

/// One `ContainerSyncer::sync_pass`.
pub fn sync_pass_span(network_id: &str, retries: u32) -> Span {
    info_span!("sync_pass", network = %network_id, retries = retries)
}

/// One `VoteQueue::tick`.
pub fn vote_batch_span(pending_votes: usize) -> Span {
    info_span!("vote_batch", pending = pending_votes)
}

/// Local signing and queueing of a proposed block.
pub fn proposal_span(block_hash: &str, priority: i64) -> Span {
    info_span!("proposal", hash = %block_hash, priority = priority)
}
