//! Election manager interface.
//!
//! Vote tallying and candidate bookkeeping live with the election manager;
//! the [`VoteQueue`](crate::VoteQueue) only orders and dispatches votes to it.

use async_trait::async_trait;

use conclave_types::{ElectionId, NodeId, Signature};

use crate::ConsensusError;

#[async_trait]
pub trait ElectionManager: Send + Sync {
    /// Record one vote. `weight` is the voter's weight in its canonical
    /// base-10 form.
    async fn process_vote(
        &self,
        election: &ElectionId,
        voter: &NodeId,
        candidate: &NodeId,
        signature: &Signature,
        weight: &str,
    ) -> Result<(), ConsensusError>;
}
