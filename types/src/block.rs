//! Client blocks.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{AccountId, Hash256, NodeId, Signature, Timestamp};

type Blake2b256 = Blake2b<U32>;

/// Application payload carried by a block.
///
/// The node never interprets it; per-application instruction handling lives
/// with the ledger's block manager.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub kind: String,
    pub payload: Vec<u8>,
}

impl Instruction {
    pub fn new(kind: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }
}

/// A client block.
///
/// Produced by clients, validated, then circulated among validators which add
/// their signatures to `validator_signatures`. Immutable once confirmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: Hash256,
    pub account: AccountId,
    pub delegator: AccountId,
    pub instruction: Instruction,
    /// Account signatures authorising the instruction.
    pub signatures: BTreeMap<AccountId, Signature>,
    /// Validator signatures collected during circulation; the quorum input.
    pub validator_signatures: BTreeMap<NodeId, Signature>,
    pub timestamp: Timestamp,
    pub nonce: u64,
    /// Most recent confirmed block the client had seen when building this one.
    pub last_seen_block_hash: Option<Hash256>,
    /// Hash of the confirmed block this one was finalized into, once known.
    pub block_hash: Option<Hash256>,
}

impl Block {
    /// Build an unsigned block and stamp its content hash.
    pub fn new(
        account: AccountId,
        delegator: AccountId,
        instruction: Instruction,
        timestamp: Timestamp,
        nonce: u64,
        last_seen_block_hash: Option<Hash256>,
    ) -> Self {
        let mut block = Self {
            hash: Hash256::ZERO,
            account,
            delegator,
            instruction,
            signatures: BTreeMap::new(),
            validator_signatures: BTreeMap::new(),
            timestamp,
            nonce,
            last_seen_block_hash,
            block_hash: None,
        };
        block.hash = block.compute_hash();
        block
    }

    /// Blake2b-256 over the signed content.
    ///
    /// Signatures and `block_hash` are excluded: they are attached after the
    /// hash is fixed.
    pub fn compute_hash(&self) -> Hash256 {
        let mut hasher = Blake2b256::new();
        hasher.update(self.account.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.delegator.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.instruction.kind.as_bytes());
        hasher.update([0u8]);
        hasher.update(&self.instruction.payload);
        hasher.update(self.timestamp.as_millis().to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        match &self.last_seen_block_hash {
            Some(h) => hasher.update(h.as_bytes()),
            None => hasher.update([0u8; 32]),
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Hash256::new(out)
    }

    /// Whether the stamped hash matches the content.
    pub fn hash_is_consistent(&self) -> bool {
        self.hash == self.compute_hash()
    }
}
