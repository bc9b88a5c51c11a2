use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("election {election} rejected vote from {voter}: {reason}")]
    VoteRejected {
        election: String,
        voter: String,
        reason: String,
    },

    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] conclave_ledger::LedgerError),
}
