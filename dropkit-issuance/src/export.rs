//! Distribution artifacts: bearer links and export rows.
//!
//! A bearer link is the whole credential. Anyone holding the URL holds the
//! secret key, so export output is handled like the secrets it contains.

use dropkit_lib::keys::KeyPair;
use dropkit_lib::AccountId;
use serde::Serialize;

use crate::batch::IssuanceBatch;

/// Where bearer links point.
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// Claim-page URL up to and including its fixed query parameters.
    pub base_url: String,
    /// Event contract the claim page should talk to.
    pub contract_id: AccountId,
}

impl LinkConfig {
    /// A link config for a claim page and event contract.
    pub fn new(base_url: impl Into<String>, contract_id: AccountId) -> Self {
        Self {
            base_url: base_url.into(),
            contract_id,
        }
    }
}

/// Render the bearer link for one credential.
pub fn bearer_link(config: &LinkConfig, keypair: &KeyPair) -> String {
    format!(
        "{}&secretKey={}&contractId={}",
        config.base_url,
        keypair.secret_key_hex(),
        config.contract_id
    )
}

/// One row of a ticket export, ready for a mail merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    /// The bearer link for this ticket.
    pub link: String,
    /// Attendee name, when the ticket carries PII.
    pub name: Option<String>,
    /// Attendee email, when the ticket carries PII.
    pub email: Option<String>,
}

/// Render one export row per ticket, in issuance order.
pub fn export_rows(config: &LinkConfig, batch: &IssuanceBatch) -> Vec<ExportRow> {
    batch
        .tickets()
        .iter()
        .map(|ticket| ExportRow {
            link: bearer_link(config, &ticket.keypair),
            name: ticket.attendee.as_ref().map(|a| a.name.clone()),
            email: ticket.attendee.as_ref().map(|a| a.email.clone()),
        })
        .collect()
}
