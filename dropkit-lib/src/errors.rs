//! Error types for Dropkit operations.
//!
//! Grouped per concern so callers can match precisely: catalog validation,
//! claim-time credential failures, scavenger completion guards and vault
//! crypto failures. Validation and credential errors are raised before any
//! state mutation.

use crate::{AccountId, DropId, PublicKey};

/// Errors raised while creating or deleting drops.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The tagged asset config is missing a field its kind requires.
    #[error("invalid asset config: {0}")]
    InvalidAssetConfig(String),

    /// A drop with this id already exists for the funder.
    #[error("drop id already exists: {0}")]
    DuplicateDropId(DropId),

    /// No drop with this id is known.
    #[error("drop not found: {0}")]
    UnknownDrop(DropId),

    /// Only the creator of a drop may delete it.
    #[error("{caller} is not the creator of drop {drop_id}")]
    NotDropCreator {
        /// Account that attempted the deletion.
        caller: AccountId,
        /// Drop it tried to delete.
        drop_id: DropId,
    },
}

/// Errors raised by a single claim attempt or key registration.
///
/// Every variant rejects exactly one attempt and leaves `uses_remaining`
/// and all other state untouched.
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// No access key registered under this public key.
    #[error("no key registered for {0}")]
    UnknownKey(PublicKey),

    /// The key has no uses left.
    #[error("key {0} is exhausted")]
    KeyExhausted(PublicKey),

    /// The provided password hash does not match the one registered for the
    /// current use (or none was provided).
    #[error("invalid password for current key use")]
    InvalidPassword,

    /// The claim requires a signature and none verified against the key.
    #[error("invalid signature over claim message")]
    InvalidSignature,

    /// The key's drop no longer exists.
    #[error("drop not found: {0}")]
    UnknownDrop(DropId),

    /// This drop is a scavenger hunt; its reward is only reachable through
    /// its piece keys.
    #[error("drop {0} requires claims through scavenger piece keys")]
    ScavengerPieceRequired(DropId),

    /// A key with this public key is already registered.
    #[error("key already registered: {0}")]
    KeyAlreadyRegistered(PublicKey),

    /// Attempted to register more keys than a single ledger call allows.
    #[error("registration batch of {got} exceeds the per-call maximum of {max}")]
    BatchTooLarge {
        /// Records in the rejected batch.
        got: usize,
        /// Per-call ceiling.
        max: usize,
    },

    /// Account creation reused the ticket's own public key.
    #[error("new accounts must use a fresh public key, not the ticket's")]
    CredentialReuse,

    /// `create_account_and_claim` was requested without new-account key
    /// material.
    #[error("claim effect requires a new account public key")]
    MissingNewAccountKey,

    /// The drop's funder cannot cover the token amount.
    #[error("funder has {available} tokens, claim needs {required}")]
    InsufficientFunds {
        /// Amount the claim would transfer.
        required: u128,
        /// Funder's current balance.
        available: u128,
    },

    /// Scavenger bookkeeping rejected the piece.
    #[error(transparent)]
    Scavenger(#[from] ScavengerError),
}

/// Errors raised by scavenger-hunt completion tracking.
#[derive(Debug, thiserror::Error)]
pub enum ScavengerError {
    /// The drop has no registered hunt.
    #[error("no scavenger hunt registered for drop {0}")]
    UnknownHunt(DropId),

    /// The piece does not belong to the hunt.
    #[error("piece {0} is not part of this hunt")]
    UnknownPiece(PublicKey),

    /// Another identity already claimed this piece; the first claimant is
    /// permanent.
    #[error("piece {piece} already claimed by {claimant}")]
    PieceAlreadyClaimed {
        /// The contested piece.
        piece: PublicKey,
        /// Identity that claimed it first.
        claimant: AccountId,
    },

    /// The identity has not yet claimed every piece of the hunt.
    #[error("hunt for drop {0} is not complete")]
    HuntIncomplete(DropId),

    /// The aggregate reward was already released.
    #[error("reward for drop {0} already released")]
    AlreadyReleased(DropId),
}

/// Errors raised by the attendee metadata vault.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("encryption failed: {0}")]
    EncryptFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid ciphertext format")]
    InvalidFormat,
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}
