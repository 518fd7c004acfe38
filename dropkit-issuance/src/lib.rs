//! Issuer-side tooling for event drops.
//!
//! Builds batches of bearer credentials ([`batch`]), registers them on the
//! ledger in resumable chunks ([`registrar`]) and renders distribution
//! artifacts such as bearer links ([`export`]).
//!
//! The issuer holds every secret exactly once, at issuance time: piece and
//! ticket secret keys exist in an [`batch::IssuanceBatch`] until exported, and
//! attendee PII only ever leaves this crate encrypted.

pub mod batch;
pub mod export;
pub mod registrar;

pub use batch::{BatchEntry, IssuanceBatch, IssuanceError, IssuedTicket};
pub use export::{bearer_link, export_rows, ExportRow, LinkConfig};
pub use registrar::{Registrar, RegistrationError, MAX_KEYS_PER_CALL};
