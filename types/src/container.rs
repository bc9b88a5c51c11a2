//! Containers — hash-chained batches of confirmed blocks.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

use crate::{Block, Hash256, NodeId, Timestamp};

type Blake2b256 = Blake2b<U32>;

/// A batch of confirmed blocks linked to its predecessor.
///
/// The hash covers the header only (previous hash, timestamp, creator), so a
/// header fetched without its blocks carries the same hash as the full
/// container. The genesis container has no predecessor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub hash: Hash256,
    pub previous_container_hash: Option<Hash256>,
    pub timestamp: Timestamp,
    pub creator: NodeId,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Container {
    /// Build a container and stamp its header hash.
    pub fn new(
        previous_container_hash: Option<Hash256>,
        timestamp: Timestamp,
        creator: NodeId,
        blocks: Vec<Block>,
    ) -> Self {
        let mut container = Self {
            hash: Hash256::ZERO,
            previous_container_hash,
            timestamp,
            creator,
            blocks,
        };
        container.hash = container.compute_hash();
        container
    }

    pub fn compute_hash(&self) -> Hash256 {
        let mut hasher = Blake2b256::new();
        match &self.previous_container_hash {
            Some(prev) => {
                hasher.update([1u8]);
                hasher.update(prev.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update(self.timestamp.as_millis().to_le_bytes());
        hasher.update(self.creator.as_str().as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Hash256::new(out)
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_container_hash.is_none()
    }

    /// Copy of this container with its blocks stripped (chain listings).
    pub fn header(&self) -> Self {
        Self {
            hash: self.hash,
            previous_container_hash: self.previous_container_hash,
            timestamp: self.timestamp,
            creator: self.creator.clone(),
            blocks: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_keeps_hash() {
        let genesis = Container::new(None, Timestamp::new(1), NodeId::new("g"), Vec::new());
        let next = Container::new(Some(genesis.hash), Timestamp::new(2), NodeId::new("g"), Vec::new());
        assert_eq!(next.header().hash, next.compute_hash());
        assert!(genesis.is_genesis());
        assert!(!next.is_genesis());
    }

    #[test]
    fn link_changes_hash() {
        let a = Container::new(None, Timestamp::new(1), NodeId::new("g"), Vec::new());
        let b = Container::new(Some(Hash256::ZERO), Timestamp::new(1), NodeId::new("g"), Vec::new());
        assert_ne!(a.hash, b.hash);
    }
}
