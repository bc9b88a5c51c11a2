//! Cryptographic capabilities for the Conclave node.
//!
//! - **Blake2b** for fingerprints (vote hashes) behind the [`Hasher`] trait
//! - **Ed25519** signing and (batch) verification behind the [`Signer`] trait
//!
//! Components receive these as injected `Arc<dyn …>` capabilities; nothing in
//! the consensus core reaches for process-wide crypto state.

pub mod hash;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi, Blake2bHasher, Hasher};
pub use sign::{Ed25519Signer, SignedMessage, Signer};
