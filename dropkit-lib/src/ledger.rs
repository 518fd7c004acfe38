//! The ledger call boundary.
//!
//! Everything that reaches the chain goes through [`Ledger::submit`] with an
//! explicit signing credential; there is no ambient "current signer" anywhere
//! in this workspace. Wire serialization of the call itself is the
//! implementor's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Default compute budget attached to a call, in the ledger's gas units.
pub const DEFAULT_COMPUTE_BUDGET: u64 = 300_000_000_000_000;

/// Value a successful call returns, as loosely-typed JSON.
pub type ReturnValue = serde_json::Value;

/// A single method call destined for the ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Call {
    /// Account the call is addressed to.
    pub receiver: AccountId,
    /// Method to invoke on the receiver.
    pub method_name: String,
    /// JSON-encoded arguments.
    pub args_json: serde_json::Value,
    /// Native value attached to the call.
    pub attached_value: u128,
    /// Compute budget for the call.
    pub compute_budget: u64,
}

impl Call {
    /// A call with no attached value and the default compute budget.
    pub fn function(
        receiver: AccountId,
        method_name: impl Into<String>,
        args_json: serde_json::Value,
    ) -> Self {
        Self {
            receiver,
            method_name: method_name.into(),
            args_json,
            attached_value: 0,
            compute_budget: DEFAULT_COMPUTE_BUDGET,
        }
    }

    /// Attach native value to the call.
    pub fn with_attached_value(mut self, value: u128) -> Self {
        self.attached_value = value;
        self
    }

    /// Override the compute budget.
    pub fn with_compute_budget(mut self, budget: u64) -> Self {
        self.compute_budget = budget;
        self
    }
}

/// Failure modes of a submitted call.
///
/// `ActionFailure` means the ledger accepted the transaction and the method
/// itself rejected; `NetworkFailure` means the submission never resolved.
/// Retries are the caller's responsibility either way.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The receiving method rejected the call.
    #[error("action failed: {0}")]
    ActionFailure(String),
    /// The call could not be delivered or its outcome observed.
    #[error("network failure: {0}")]
    NetworkFailure(String),
}

/// A signing credential: the account submitting a call plus its secret key.
///
/// Passed explicitly on every [`Ledger::submit`] so that no implementation is
/// tempted to keep a mutable "current signer".
#[derive(Clone)]
pub struct Credential {
    /// Account the call is signed as.
    pub account_id: AccountId,
    /// Hex-encoded ed25519 secret key.
    pub secret_key: String,
}

impl Credential {
    /// Create a credential from an account id and its hex secret key.
    pub fn new(account_id: AccountId, secret_key: impl Into<String>) -> Self {
        Self {
            account_id,
            secret_key: secret_key.into(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

/// Trait describing submission of signed calls to the ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit one call signed by `signer` and wait for its outcome.
    async fn submit(&self, signer: &Credential, call: Call) -> Result<ReturnValue, CallError>;
}
