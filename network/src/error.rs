use thiserror::Error;

use conclave_ledger::LedgerError;

/// Transport-level failures. Transient by nature.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("no connected peers")]
    NoPeers,

    #[error("peer {0} not found")]
    PeerNotFound(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timed out: {0}")]
    Timeout(String),
}

/// Failures of one synchronization step.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("peer error: {0}")]
    Remote(String),

    #[error("unexpected response to {request}: got {got}")]
    UnexpectedResponse { request: &'static str, got: &'static str },

    #[error("no peer has a genesis container")]
    GenesisUnavailable,

    #[error("genesis container rejected by processor: {0}")]
    GenesisRejected(String),

    #[error("peers returned none of {0} requested containers")]
    NothingReturned(usize),

    #[error("chain gap: {0} received containers do not link to the tip")]
    ChainGap(usize),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl SyncError {
    /// Whether this failure counts against the retry budget. Network failures
    /// do not.
    pub fn consumes_retry(&self) -> bool {
        !matches!(self, SyncError::Network(_))
    }
}
