//! Access key generation and registration records.

use std::collections::BTreeMap;

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::{AccountId, PublicKey};

/// An issued credential: an ed25519 keypair whose possession authorizes a
/// bounded number of claims.
///
/// The signing half stays with the issuing process until the bearer link is
/// handed out; it is never part of a [`KeyRecord`] and never reaches the
/// ledger.
#[derive(Clone)]
pub struct KeyPair {
    public_key: PublicKey,
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a single random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = PublicKey::from_bytes(signing_key.verifying_key().as_bytes());
        Self {
            public_key,
            signing_key,
        }
    }

    /// The canonical public key string for this pair.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Sign an arbitrary message with the credential.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// Hex-encoded secret key, for bearer-link export only.
    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Raw secret key bytes, used to derive vault key material.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the signing half through Debug.
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Stateless factory for independent signing keypairs.
///
/// Safe under concurrent invocation; every call draws fresh entropy from the
/// OS generator.
pub struct KeyPairFactory;

impl KeyPairFactory {
    /// Generate `n` independent keypairs.
    pub fn generate(n: usize) -> Vec<KeyPair> {
        (0..n).map(|_| KeyPair::generate()).collect()
    }
}

/// What registration submits to the ledger for one access key.
///
/// Carries the public half, per-use password hashes, an optional owner and an
/// optional encrypted attendee metadata blob (hex-encoded vault output). The
/// private key is deliberately absent.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyRecord {
    /// Public key the ledger will index this key under.
    pub public_key: PublicKey,
    /// Password hash per 1-based use index; uses without an entry are
    /// password-free.
    #[serde(default)]
    pub password_by_use: BTreeMap<u32, String>,
    /// Account that owns this key, if pre-assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_owner: Option<AccountId>,
    /// Hex-encoded encrypted attendee metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl KeyRecord {
    /// A bare record with no passwords, owner or metadata.
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            password_by_use: BTreeMap::new(),
            key_owner: None,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_independent_keypairs() {
        let pairs = KeyPairFactory::generate(8);
        assert_eq!(pairs.len(), 8);
        let seen: std::collections::HashSet<_> =
            pairs.iter().map(|p| p.public_key().clone()).collect();
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn signature_verifies_against_own_public_key() {
        use ed25519_dalek::{Signature, Verifier};

        let pair = KeyPair::generate();
        let message = b"attendee.test";
        let signature = pair.sign(message);

        let vk = pair.public_key().verifying_key().unwrap();
        let sig = Signature::from_slice(&signature).unwrap();
        assert!(vk.verify(message, &sig).is_ok());
    }

    #[test]
    fn debug_output_hides_secret() {
        let pair = KeyPair::generate();
        let rendered = format!("{:?}", pair);
        assert!(!rendered.contains(&pair.secret_key_hex()));
    }

    #[test]
    fn record_serializes_without_empty_options() {
        let record = KeyRecord::new(PublicKey::new("ed25519:aa"));
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("key_owner").is_none());
        assert!(json.get("metadata").is_none());
    }
}
