//! Chunked, resumable key registration.
//!
//! Ledgers cap how many keys one call may carry, so a batch is split into
//! fixed-size chunks and submitted strictly in order. A failed chunk aborts
//! the run and reports its offset; a later run resumes from that offset
//! without re-submitting the chunks that already landed.

use dropkit_lib::keys::KeyRecord;
use dropkit_lib::ledger::{Call, CallError, Credential, Ledger};
use dropkit_lib::{AccountId, DropId};
use tracing::{debug, info};

/// Keys per registration call. The ledger caps a single call below 100; the
/// per-use password maps riding along with each record take up the rest.
pub const MAX_KEYS_PER_CALL: usize = 50;

/// A chunked registration run that stopped early.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// The chunk starting at `failed_offset` did not land; everything before
    /// it did.
    #[error("registration chunk at offset {failed_offset} failed")]
    ChunkFailed {
        /// Offset into the record slice to resume from.
        failed_offset: usize,
        /// The underlying call failure.
        #[source]
        source: CallError,
    },
}

impl RegistrationError {
    /// Offset to pass to [`Registrar::register_from`] on the next attempt.
    pub fn resume_offset(&self) -> usize {
        match self {
            Self::ChunkFailed { failed_offset, .. } => *failed_offset,
        }
    }
}

/// Registers issued keys with the event contract on the ledger.
pub struct Registrar<'a> {
    ledger: &'a dyn Ledger,
    signer: Credential,
    contract: AccountId,
}

impl<'a> Registrar<'a> {
    /// A registrar submitting as `signer` to the event contract.
    pub fn new(ledger: &'a dyn Ledger, signer: Credential, contract: AccountId) -> Self {
        Self {
            ledger,
            signer,
            contract,
        }
    }

    /// Register all records under `drop_id`, in order, chunk by chunk.
    pub async fn register(
        &self,
        drop_id: &DropId,
        records: &[KeyRecord],
        uses_total: u32,
    ) -> Result<(), RegistrationError> {
        self.register_from(drop_id, records, uses_total, 0).await
    }

    /// Resume a registration run from `start_offset`.
    ///
    /// The offset comes from [`RegistrationError::resume_offset`] and must be
    /// passed with the same record slice; records before it are assumed to be
    /// on the ledger already.
    pub async fn register_from(
        &self,
        drop_id: &DropId,
        records: &[KeyRecord],
        uses_total: u32,
        start_offset: usize,
    ) -> Result<(), RegistrationError> {
        let mut offset = start_offset;
        while offset < records.len() {
            let end = usize::min(offset + MAX_KEYS_PER_CALL, records.len());
            let chunk = &records[offset..end];
            debug!(%drop_id, offset, len = chunk.len(), "submitting key chunk");

            let call = Call::function(
                self.contract.clone(),
                "add_keys",
                serde_json::json!({
                    "drop_id": drop_id,
                    "key_data": chunk,
                    "uses_total": uses_total,
                }),
            );
            self.ledger
                .submit(&self.signer, call)
                .await
                .map_err(|source| RegistrationError::ChunkFailed {
                    failed_offset: offset,
                    source,
                })?;
            offset = end;
        }
        info!(
            %drop_id,
            registered = records.len().saturating_sub(start_offset),
            "key registration complete"
        );
        Ok(())
    }
}
