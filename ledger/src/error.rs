use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("invalid container: {reason}")]
    InvalidContainer { reason: String },

    #[error("storage error: {0}")]
    Storage(String),
}
