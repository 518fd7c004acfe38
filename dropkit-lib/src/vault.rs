//! Encrypted attendee metadata, bound to a single credential.
//!
//! Attendee PII travels alongside its ticket as an opaque blob. The AES-256-GCM
//! key is derived from the credential's own signing key via HKDF-SHA256, so
//! only the ticket holder (or the issuer, who minted the key) can read the
//! record. That keeps ticket distribution decoupled from PII exposure: the
//! ledger stores ciphertext it can never open.
//!
//! # Wire Format
//!
//! ```text
//! [1 byte version][12 bytes nonce][N bytes ciphertext][16 bytes auth tag]
//! ```
//!
//! Version 1 uses AES-256-GCM with random nonces.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;

use crate::errors::VaultError;
use crate::keys::KeyPair;

/// Current blob format version.
const VAULT_VERSION: u8 = 1;

/// Size of the nonce in bytes (96 bits for GCM).
const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes.
const TAG_SIZE: usize = 16;

/// Domain separation for the credential-to-vault key derivation.
const VAULT_KDF_INFO: &[u8] = b"dropkit-attendee-metadata-v1";

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Attendee PII bound 1:1 to an access key. Only ever persisted encrypted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttendeeRecord {
    /// Attendee display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Any additional fields the event collected.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl AttendeeRecord {
    /// A record with just the required fields.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Encrypts and decrypts one credential's attendee record.
#[derive(Clone)]
pub struct MetadataVault {
    key: [u8; 32],
}

impl MetadataVault {
    /// Derive the vault for a credential from its raw secret key bytes.
    pub fn for_secret_key(secret: &[u8]) -> VaultResult<Self> {
        let hk = Hkdf::<Sha256>::new(None, secret);
        let mut key = [0u8; 32];
        hk.expand(VAULT_KDF_INFO, &mut key)
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
        Ok(Self { key })
    }

    /// Derive the vault for an issued keypair.
    pub fn for_credential(pair: &KeyPair) -> VaultResult<Self> {
        Self::for_secret_key(&pair.secret_key_bytes())
    }

    /// Encrypt an attendee record into the wire blob.
    pub fn encrypt(&self, record: &AttendeeRecord) -> VaultResult<Vec<u8>> {
        let plaintext =
            serde_json::to_vec(record).map_err(|e| VaultError::EncryptFailed(e.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| VaultError::EncryptFailed(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| VaultError::EncryptFailed(e.to_string()))?;

        let mut blob = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
        blob.push(VAULT_VERSION);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypt a wire blob back into the attendee record.
    ///
    /// Fails with [`VaultError::DecryptionFailed`] on mismatched key material
    /// or tampering, and with [`VaultError::InvalidFormat`] /
    /// [`VaultError::UnsupportedVersion`] on malformed input.
    pub fn decrypt(&self, blob: &[u8]) -> VaultResult<AttendeeRecord> {
        let min_len = 1 + NONCE_SIZE + TAG_SIZE;
        if blob.len() < min_len {
            return Err(VaultError::InvalidFormat);
        }

        let version = blob[0];
        if version != VAULT_VERSION {
            return Err(VaultError::UnsupportedVersion(version));
        }

        let nonce = Nonce::from_slice(&blob[1..1 + NONCE_SIZE]);
        let encrypted = &blob[1 + NONCE_SIZE..];

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;

        let plaintext = cipher
            .decrypt(nonce, encrypted)
            .map_err(|_| VaultError::DecryptionFailed("authentication failed".to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| VaultError::DecryptionFailed(e.to_string()))
    }
}

impl Drop for MetadataVault {
    fn drop(&mut self) {
        self.key.iter_mut().for_each(|b| *b = 0);
    }
}
