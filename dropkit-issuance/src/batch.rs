//! Batch issuance of bearer credentials.
//!
//! One [`IssuedTicket`] per attendee: a fresh keypair, the per-use password
//! hashes derived from the event's base password, and the attendee's record
//! encrypted under the credential itself. The plaintext PII never reaches the
//! ledger; what travels in the key record is the hex-encoded vault blob.

use std::collections::HashMap;

use dropkit_lib::keys::{KeyPair, KeyRecord};
use dropkit_lib::vault::{AttendeeRecord, MetadataVault};
use dropkit_lib::{passwords, AccountId, PublicKey, VaultError};

/// Errors raised while building or reading back an issuance batch.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    /// Attendee metadata could not be encrypted or decrypted.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// A metadata field was not valid hex.
    #[error("metadata is not valid hex: {0}")]
    MalformedMetadata(#[from] hex::FromHexError),
}

/// Inputs for one ticket of a batch.
#[derive(Clone, Debug, Default)]
pub struct BatchEntry {
    /// PII to encrypt into the ticket, if collected.
    pub attendee: Option<AttendeeRecord>,
    /// Account the key should be pre-assigned to, if known.
    pub owner: Option<AccountId>,
}

impl BatchEntry {
    /// An anonymous ticket.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A ticket carrying attendee PII.
    pub fn for_attendee(attendee: AttendeeRecord) -> Self {
        Self {
            attendee: Some(attendee),
            owner: None,
        }
    }

    /// Pre-assign the ticket to an account.
    pub fn owned_by(mut self, owner: AccountId) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// One issued credential: the only place its secret half lives.
pub struct IssuedTicket {
    /// The bearer keypair.
    pub keypair: KeyPair,
    /// The ledger-side record to register.
    pub key_record: KeyRecord,
    /// The plaintext attendee record, kept issuer-side for export.
    pub attendee: Option<AttendeeRecord>,
}

/// A built batch of tickets, indexed by public key.
pub struct IssuanceBatch {
    tickets: Vec<IssuedTicket>,
    by_key: HashMap<PublicKey, usize>,
}

impl IssuanceBatch {
    /// Issue one ticket per entry.
    ///
    /// With a base password, every use `1..=uses_total` gets its own derived
    /// hash; without one, the tickets are registered password-less. Attendee
    /// records are vault-encrypted under the ticket's own credential.
    pub fn build(
        entries: Vec<BatchEntry>,
        base_password: Option<&str>,
        uses_total: u32,
    ) -> Result<Self, IssuanceError> {
        let uses: Vec<u32> = (1..=uses_total).collect();
        let mut tickets = Vec::with_capacity(entries.len());
        let mut by_key = HashMap::with_capacity(entries.len());

        for entry in entries {
            let keypair = KeyPair::generate();
            let mut key_record = KeyRecord::new(keypair.public_key().clone());
            if let Some(base) = base_password {
                key_record.password_by_use =
                    passwords::passwords_for_key(base, keypair.public_key().as_str(), &uses);
            }
            key_record.key_owner = entry.owner;
            if let Some(attendee) = &entry.attendee {
                let vault = MetadataVault::for_credential(&keypair)?;
                key_record.metadata = Some(hex::encode(vault.encrypt(attendee)?));
            }

            by_key.insert(keypair.public_key().clone(), tickets.len());
            tickets.push(IssuedTicket {
                keypair,
                key_record,
                attendee: entry.attendee,
            });
        }
        Ok(Self { tickets, by_key })
    }

    /// Number of tickets in the batch.
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// All tickets, in issuance order.
    pub fn tickets(&self) -> &[IssuedTicket] {
        &self.tickets
    }

    /// The ledger-side records, ready for registration.
    pub fn key_records(&self) -> Vec<KeyRecord> {
        self.tickets.iter().map(|t| t.key_record.clone()).collect()
    }

    /// Look a ticket up by its public key.
    pub fn ticket(&self, public_key: &PublicKey) -> Option<&IssuedTicket> {
        self.by_key.get(public_key).map(|&i| &self.tickets[i])
    }
}

/// Decrypt a ledger-side metadata field with the ticket's own credential.
///
/// This is the read-back path: fetch the key record from the ledger, then
/// open its metadata with the secret key from the bearer link.
pub fn decrypt_attendee(
    keypair: &KeyPair,
    metadata_hex: &str,
) -> Result<AttendeeRecord, IssuanceError> {
    let blob = hex::decode(metadata_hex)?;
    let vault = MetadataVault::for_credential(keypair)?;
    Ok(vault.decrypt(&blob)?)
}
