use async_trait::async_trait;

use conclave_types::{AccountId, Block, Container, Hash256, NodeId, Weight};

use crate::{ContainerAddState, LedgerError, ValidateOptions, ValidationState};

/// Read access to the confirmed chain.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Hash of the newest applied container, `None` before genesis.
    async fn last_container_hash(&self) -> Result<Option<Hash256>, LedgerError>;

    async fn container_with_blocks(&self, hash: &Hash256)
        -> Result<Option<Container>, LedgerError>;

    /// Voting weight delegated to `node`, `None` if the node is unknown.
    async fn vote_weight(&self, node: &NodeId) -> Result<Option<Weight>, LedgerError>;

    /// A confirmed block by its hash.
    async fn action(&self, hash: &Hash256) -> Result<Option<Block>, LedgerError>;

    async fn account_history(&self, account: &AccountId) -> Result<Vec<Block>, LedgerError>;

    /// Up to `limit` containers following `start` in chain order, `start`
    /// itself excluded.
    async fn containers_after(
        &self,
        start: &Hash256,
        limit: usize,
    ) -> Result<Vec<Container>, LedgerError>;
}

/// Ledger rule checks for client blocks.
#[async_trait]
pub trait BlockManager: Send + Sync {
    async fn validate_block(&self, block: &Block) -> Result<ValidationState, LedgerError>;

    /// Checks a block after circulation, once validator signatures are attached.
    async fn validate_block_finalization(
        &self,
        block: &Block,
    ) -> Result<ValidationState, LedgerError>;
}

/// Validation and application of containers.
#[async_trait]
pub trait ContainerProcessor: Send + Sync {
    async fn validate_container(
        &self,
        container: &Container,
        options: ValidateOptions,
    ) -> Result<bool, LedgerError>;

    async fn add_container(&self, container: Container) -> Result<ContainerAddState, LedgerError>;
}
