//! Delegate-election votes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{NodeId, Signature};

/// Identifies a round of delegate voting.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElectionId(String);

impl ElectionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ElectionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A signed ballot cast by `voter` for `candidate` in `election`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub election: ElectionId,
    pub voter: NodeId,
    pub candidate: NodeId,
    pub signature: Signature,
}
