//! Network identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Hash256, TypesError};

/// Identifies which network a node belongs to.
///
/// A network is named by the hash of its genesis container, so a genesis
/// container is self-certifying: its hash must equal the network id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkId(Hash256);

impl NetworkId {
    pub fn new(genesis_hash: Hash256) -> Self {
        Self(genesis_hash)
    }

    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        Hash256::from_hex(s).map(Self)
    }

    /// Hash the genesis container of this network must carry.
    pub fn genesis_hash(&self) -> Hash256 {
        self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
