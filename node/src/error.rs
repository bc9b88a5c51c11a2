use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] conclave_ledger::LedgerError),

    #[error("network error: {0}")]
    Network(#[from] conclave_network::NetworkError),

    #[error("sync error: {0}")]
    Sync(#[from] conclave_network::SyncError),

    #[error("consensus error: {0}")]
    Consensus(#[from] conclave_consensus::ConsensusError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("logging already initialised: {0}")]
    Logging(String),
}
