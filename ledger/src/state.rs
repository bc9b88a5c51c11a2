//! Outcomes reported by the ledger's validation and application services.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of the block manager on a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationState {
    Valid,
    /// Rejected, with the rule that failed.
    Invalid(String),
}

impl ValidationState {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationState::Valid)
    }
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationState::Valid => write!(f, "VALID"),
            ValidationState::Invalid(reason) => write!(f, "INVALID({reason})"),
        }
    }
}

/// Result of handing a container to the processor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerAddState {
    ContainerAdded,
    /// Already part of the chain.
    AlreadyExists,
    /// `previous_container_hash` is not the current tip.
    PreviousMismatch,
    Invalid(String),
}

impl ContainerAddState {
    pub fn is_added(&self) -> bool {
        matches!(self, ContainerAddState::ContainerAdded)
    }
}

impl fmt::Display for ContainerAddState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerAddState::ContainerAdded => write!(f, "CONTAINER_ADDED"),
            ContainerAddState::AlreadyExists => write!(f, "ALREADY_EXISTS"),
            ContainerAddState::PreviousMismatch => write!(f, "PREVIOUS_MISMATCH"),
            ContainerAddState::Invalid(reason) => write!(f, "INVALID({reason})"),
        }
    }
}

/// Knobs for [`ContainerProcessor::validate_container`](crate::ContainerProcessor::validate_container).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Check the header only; skip per-block validation.
    pub ignore_block_check: bool,
}

impl ValidateOptions {
    pub fn header_only() -> Self {
        Self {
            ignore_block_check: true,
        }
    }
}
