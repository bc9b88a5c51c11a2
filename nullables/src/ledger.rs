//! Nullable ledger — an in-memory chain that records what was applied.
//!
//! Implements all three ledger collaborator traits so one instance can play
//! the ledger, the block manager and the container processor in a test.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use conclave_ledger::{
    BlockManager, ContainerAddState, ContainerProcessor, Ledger, LedgerError, ValidateOptions,
    ValidationState,
};
use conclave_types::{AccountId, Block, Container, Hash256, NodeId, Weight};

#[derive(Default)]
struct LedgerState {
    /// Applied containers in chain order.
    chain: Vec<Container>,
    by_hash: HashMap<Hash256, Container>,
    weights: HashMap<NodeId, Weight>,
    blocks: HashMap<Hash256, Block>,
    /// Every hash passed to `add_container`, accepted or not.
    add_calls: Vec<Hash256>,
    rejected: HashSet<Hash256>,
    block_verdict: Option<ValidationState>,
    finalization_verdict: Option<ValidationState>,
    container_valid: bool,
    fail_reads: bool,
}

/// An in-memory ledger for testing.
pub struct NullLedger {
    state: Mutex<LedgerState>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                container_valid: true,
                ..LedgerState::default()
            }),
        }
    }

    /// A ledger whose chain already holds `containers`, in order.
    pub fn with_chain(containers: impl IntoIterator<Item = Container>) -> Self {
        let ledger = Self::new();
        for container in containers {
            ledger.push(container);
        }
        ledger
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a container without any linkage check.
    pub fn push(&self, container: Container) {
        let mut state = self.lock();
        for block in &container.blocks {
            state.blocks.insert(block.hash, block.clone());
        }
        state.by_hash.insert(container.hash, container.clone());
        state.chain.push(container);
    }

    pub fn set_weight(&self, node: impl Into<NodeId>, weight: u128) {
        self.lock().weights.insert(node.into(), Weight::new(weight));
    }

    /// Make `add_container` refuse this hash.
    pub fn reject_container(&self, hash: Hash256) {
        self.lock().rejected.insert(hash);
    }

    /// Verdict for `validate_block`. Defaults to valid.
    pub fn set_block_verdict(&self, verdict: ValidationState) {
        self.lock().block_verdict = Some(verdict);
    }

    /// Verdict for `validate_block_finalization`. Defaults to valid.
    pub fn set_finalization_verdict(&self, verdict: ValidationState) {
        self.lock().finalization_verdict = Some(verdict);
    }

    /// Result of `validate_container`. Defaults to `true`.
    pub fn set_container_valid(&self, valid: bool) {
        self.lock().container_valid = valid;
    }

    /// Make every read fail with a storage error.
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Hashes of the applied chain, in order.
    pub fn chain_hashes(&self) -> Vec<Hash256> {
        self.lock().chain.iter().map(|c| c.hash).collect()
    }

    /// Every hash handed to `add_container`, in call order.
    pub fn add_calls(&self) -> Vec<Hash256> {
        self.lock().add_calls.clone()
    }

    fn readable(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        let state = self.lock();
        if state.fail_reads {
            return Err(LedgerError::Storage("null ledger read failure".to_string()));
        }
        Ok(state)
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for NullLedger {
    async fn last_container_hash(&self) -> Result<Option<Hash256>, LedgerError> {
        Ok(self.readable()?.chain.last().map(|c| c.hash))
    }

    async fn container_with_blocks(
        &self,
        hash: &Hash256,
    ) -> Result<Option<Container>, LedgerError> {
        Ok(self.readable()?.by_hash.get(hash).cloned())
    }

    async fn vote_weight(&self, node: &NodeId) -> Result<Option<Weight>, LedgerError> {
        Ok(self.readable()?.weights.get(node).copied())
    }

    async fn action(&self, hash: &Hash256) -> Result<Option<Block>, LedgerError> {
        Ok(self.readable()?.blocks.get(hash).cloned())
    }

    async fn account_history(&self, account: &AccountId) -> Result<Vec<Block>, LedgerError> {
        let state = self.readable()?;
        Ok(state
            .chain
            .iter()
            .flat_map(|c| c.blocks.iter())
            .filter(|b| &b.account == account)
            .cloned()
            .collect())
    }

    async fn containers_after(
        &self,
        start: &Hash256,
        limit: usize,
    ) -> Result<Vec<Container>, LedgerError> {
        let state = self.readable()?;
        let Some(position) = state.chain.iter().position(|c| &c.hash == start) else {
            return Err(LedgerError::ContainerNotFound(start.to_hex()));
        };
        Ok(state.chain[position + 1..].iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl BlockManager for NullLedger {
    async fn validate_block(&self, _block: &Block) -> Result<ValidationState, LedgerError> {
        Ok(self.readable()?.block_verdict.clone().unwrap_or(ValidationState::Valid))
    }

    async fn validate_block_finalization(
        &self,
        _block: &Block,
    ) -> Result<ValidationState, LedgerError> {
        Ok(self
            .readable()?
            .finalization_verdict
            .clone()
            .unwrap_or(ValidationState::Valid))
    }
}

#[async_trait]
impl ContainerProcessor for NullLedger {
    async fn validate_container(
        &self,
        _container: &Container,
        _options: ValidateOptions,
    ) -> Result<bool, LedgerError> {
        Ok(self.readable()?.container_valid)
    }

    async fn add_container(&self, container: Container) -> Result<ContainerAddState, LedgerError> {
        let verdict = {
            let mut state = self.lock();
            state.add_calls.push(container.hash);
            let tip = state.chain.last().map(|c| c.hash);
            if state.by_hash.contains_key(&container.hash) {
                ContainerAddState::AlreadyExists
            } else if state.rejected.contains(&container.hash) {
                ContainerAddState::Invalid("rejected by null ledger".to_string())
            } else if container.previous_container_hash != tip {
                ContainerAddState::PreviousMismatch
            } else {
                ContainerAddState::ContainerAdded
            }
        };
        if verdict.is_added() {
            self.push(container);
        }
        Ok(verdict)
    }
}
