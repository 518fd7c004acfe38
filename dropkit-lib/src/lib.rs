//! Dropkit core library.
//!
//! Implements the credential/claim protocol for event drops: per-use password
//! derivation, keypair issuance, encrypted attendee metadata, drop modelling,
//! claim state transitions and scavenger-hunt completion tracking.
//!
//! The crate holds no transport of its own. On-ledger submission goes through
//! the [`ledger::Ledger`] trait so callers inject their own client, and the
//! claim protocol itself is pure state-transition logic that the ledger's
//! serialized per-account processing is expected to wrap.
//!
//! # Example
//!
//! ```
//! use dropkit_lib::{AccountId, DropKind, DropParams};
//! use dropkit_lib::claim::ClaimProtocol;
//!
//! let mut protocol = ClaimProtocol::new();
//! let funder = AccountId::new("sponsor.test");
//! let drop_id = protocol
//!     .create_drop(&funder, DropParams {
//!         name: "welcome tokens".into(),
//!         kind: DropKind::Token { amount: 100 },
//!         ..DropParams::default()
//!     })
//!     .unwrap()
//!     .drop_id;
//! assert!(protocol.drop(&drop_id).is_some());
//! ```

pub mod catalog;
pub mod claim;
pub mod errors;
pub mod keys;
pub mod ledger;
pub mod passwords;
pub mod scavenger;
pub mod vault;

/// Test utilities (in-memory mock ledger).
///
/// Only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use catalog::{Drop, DropCatalog, DropConfig, DropCreation, DropKind, DropParams, NftMetadata};
pub use claim::{
    AccessKey, ClaimOutcome, ClaimProtocol, ClaimReceipt, ClaimRequest, RequestedEffect, Reward,
};
pub use errors::{CatalogError, ClaimError, ScavengerError, VaultError};
pub use keys::{KeyPair, KeyPairFactory, KeyRecord};
pub use ledger::{Call, CallError, Credential, Ledger, ReturnValue};
pub use vault::{AttendeeRecord, MetadataVault};

/// An ed25519 public key in its canonical `ed25519:<hex>` string form.
///
/// The string form is what gets registered on the ledger and mixed into
/// password derivation; [`PublicKey::verifying_key`] recovers the key material
/// for signature checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct PublicKey(pub String);

impl PublicKey {
    /// Prefix carried by every canonical key string.
    pub const PREFIX: &'static str = "ed25519:";

    /// Create a public key from its canonical string form.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Build the canonical string form from raw key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(format!("{}{}", Self::PREFIX, hex::encode(bytes)))
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the key material, if the string form is well-formed.
    pub fn verifying_key(&self) -> Option<ed25519_dalek::VerifyingKey> {
        let raw = hex::decode(self.0.strip_prefix(Self::PREFIX)?).ok()?;
        let raw: [u8; 32] = raw.try_into().ok()?;
        ed25519_dalek::VerifyingKey::from_bytes(&raw).ok()
    }
}

impl From<&str> for PublicKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PublicKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for PublicKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a ledger account (funder, attendee or contract).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    /// Create a new account id from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the account id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a drop, unique per funder.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct DropId(pub String);

impl DropId {
    /// Create a new drop id from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the drop id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DropId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DropId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for DropId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
