//! Block and quorum validation against ledger rules.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use conclave_ledger::{BlockManager, Ledger, ValidationState};
use conclave_types::{Block, NodeId, Weight};

use crate::quorum::{evaluate_quorum, QuorumOutcome};

/// Validates blocks through the ledger's block manager and evaluates
/// multi-signature quorum from ledger weights.
///
/// Never fails: lookup and validation errors are logged and turned into a
/// negative verdict (or a zero weight).
pub struct ConsensusValidator {
    ledger: Arc<dyn Ledger>,
    block_manager: Arc<dyn BlockManager>,
}

impl ConsensusValidator {
    pub fn new(ledger: Arc<dyn Ledger>, block_manager: Arc<dyn BlockManager>) -> Self {
        Self {
            ledger,
            block_manager,
        }
    }

    /// Whether `block` passes ledger validation.
    pub async fn valid_block(&self, block: &Block) -> bool {
        let state = self.block_manager.validate_block(block).await;
        Self::accept(block, "block", state)
    }

    /// Whether `block` passes multi-signature finalization checks.
    pub async fn valid_block_finalization(&self, block: &Block) -> bool {
        let state = self.block_manager.validate_block_finalization(block).await;
        Self::accept(block, "finalization", state)
    }

    fn accept(
        block: &Block,
        check: &str,
        state: Result<ValidationState, conclave_ledger::LedgerError>,
    ) -> bool {
        match state {
            Ok(ValidationState::Valid) => true,
            Ok(state) => {
                warn!(block = %block.hash, check, %state, "block failed validation");
                false
            }
            Err(e) => {
                warn!(block = %block.hash, check, error = %e, "block validation errored");
                false
            }
        }
    }

    /// Whether the validators that signed `block` hold at least 67% of the
    /// weight of `connected` peers.
    pub async fn multi_signature_quorum_reached(&self, block: &Block, connected: &[NodeId]) -> bool {
        self.evaluate_block_quorum(block, connected).await.reached
    }

    /// Gather weights for `connected` and for `block.validator_signatures`
    /// and evaluate quorum over them.
    pub async fn evaluate_block_quorum(&self, block: &Block, connected: &[NodeId]) -> QuorumOutcome {
        let online = self.weights_of(connected.iter()).await;
        let voted = self.weights_of(block.validator_signatures.keys()).await;
        let outcome = evaluate_quorum(&online, &voted);

        info!(
            block = %block.hash,
            online = %outcome.online,
            voted = %outcome.voted,
            threshold = %outcome.threshold,
            percentage = ?outcome.percentage,
            reached = outcome.reached,
            "quorum evaluated"
        );
        outcome
    }

    async fn weights_of<'a>(&self, nodes: impl Iterator<Item = &'a NodeId>) -> Vec<Weight> {
        join_all(nodes.map(|node| self.weight_of(node))).await
    }

    async fn weight_of(&self, node: &NodeId) -> Weight {
        match self.ledger.vote_weight(node).await {
            Ok(Some(weight)) => weight,
            Ok(None) => {
                debug!(%node, "no weight recorded, counting zero");
                Weight::ZERO
            }
            Err(e) => {
                warn!(%node, error = %e, "weight lookup failed, counting zero");
                Weight::ZERO
            }
        }
    }
}
