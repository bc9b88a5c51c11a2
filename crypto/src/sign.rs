//! Ed25519 signing capability.

use conclave_types::{PrivateKey, PublicKey, Signature};
use ed25519_dalek::{Signer as _, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// One entry of a batch verification.
#[derive(Clone, Copy, Debug)]
pub struct SignedMessage<'a> {
    pub message: &'a [u8],
    pub signature: &'a Signature,
    pub public_key: &'a PublicKey,
}

/// Signing and verification capability handed to components that need it.
pub trait Signer: Send + Sync {
    /// Public half of the key this signer signs with.
    fn public_key(&self) -> PublicKey;

    fn sign(&self, message: &[u8]) -> Signature;

    /// Returns `false` for malformed keys as well as bad signatures.
    fn verify(&self, message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool;

    /// All-or-nothing verification of a batch. An empty batch verifies.
    fn batch_verify(&self, items: &[SignedMessage<'_>]) -> bool;
}

/// [`Signer`] backed by a single Ed25519 key.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Generate a fresh key from the OS random source.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic key from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn from_private(private: &PrivateKey) -> Self {
        Self::from_seed(&private.0)
    }
}

impl Signer for Ed25519Signer {
    fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    fn verify(&self, message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
            return false;
        };
        let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    fn batch_verify(&self, items: &[SignedMessage<'_>]) -> bool {
        if items.is_empty() {
            return true;
        }
        let mut messages = Vec::with_capacity(items.len());
        let mut signatures = Vec::with_capacity(items.len());
        let mut keys = Vec::with_capacity(items.len());
        for item in items {
            let Ok(key) = VerifyingKey::from_bytes(&item.public_key.0) else {
                return false;
            };
            messages.push(item.message);
            signatures.push(ed25519_dalek::Signature::from_bytes(&item.signature.0));
            keys.push(key);
        }
        ed25519_dalek::verify_batch(&messages, &signatures, &keys).is_ok()
    }
}
