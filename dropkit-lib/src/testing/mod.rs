//! In-memory ledger mock for tests.
//!
//! [`MockLedger`] wraps a [`ClaimProtocol`] behind the [`Ledger`] trait and
//! dispatches submitted calls to it by method name, the way the real event
//! contract would. Submissions can be made to fail after a configurable
//! number of calls to exercise retry and resume paths.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use crate::catalog::{DropConfig, DropKind, DropParams};
use crate::claim::{ClaimProtocol, ClaimRequest, RequestedEffect};
use crate::keys::KeyRecord;
use crate::ledger::{Call, CallError, Credential, Ledger, ReturnValue};
use crate::{AccountId, ClaimError, DropId, PublicKey};

#[derive(Deserialize)]
struct CreateDropArgs {
    #[serde(default)]
    drop_id: Option<DropId>,
    name: String,
    #[serde(default)]
    image: Option<String>,
    kind: DropKind,
    #[serde(default)]
    scavenger_spec: Option<Vec<String>>,
    #[serde(default)]
    config: DropConfig,
}

#[derive(Deserialize)]
struct AddKeysArgs {
    drop_id: DropId,
    key_data: Vec<KeyRecord>,
    uses_total: u32,
}

#[derive(Deserialize)]
struct DeleteDropArgs {
    drop_id: DropId,
}

#[derive(Deserialize)]
struct ClaimArgs {
    public_key: PublicKey,
    #[serde(default)]
    password: Option<String>,
    /// Hex-encoded signature over the canonical claim message.
    #[serde(default)]
    signature: Option<String>,
    target_account_id: AccountId,
    #[serde(default)]
    new_public_key: Option<PublicKey>,
}

/// A [`Ledger`] that executes calls against an in-memory [`ClaimProtocol`].
pub struct MockLedger {
    state: Mutex<ClaimProtocol>,
    calls: Mutex<Vec<Call>>,
    fail_after: Mutex<Option<usize>>,
}

impl MockLedger {
    /// A mock over a fresh, empty protocol state.
    pub fn new() -> Self {
        Self::with_protocol(ClaimProtocol::new())
    }

    /// A mock over pre-seeded protocol state.
    pub fn with_protocol(protocol: ClaimProtocol) -> Self {
        Self {
            state: Mutex::new(protocol),
            calls: Mutex::new(Vec::new()),
            fail_after: Mutex::new(None),
        }
    }

    /// Let the first `n` submissions through, then fail every later one with
    /// a network failure before it reaches the protocol.
    pub fn fail_after(&self, n: usize) {
        *self.fail_after.lock().expect("mock lock") = Some(n);
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        *self.fail_after.lock().expect("mock lock") = None;
    }

    /// Every call submitted so far, including failed ones, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("mock lock").clone()
    }

    /// Inspect the protocol state.
    pub fn with_state<R>(&self, f: impl FnOnce(&ClaimProtocol) -> R) -> R {
        f(&self.state.lock().expect("mock lock"))
    }

    /// Mutate the protocol state directly, bypassing the call interface.
    pub fn with_state_mut<R>(&self, f: impl FnOnce(&mut ClaimProtocol) -> R) -> R {
        f(&mut self.state.lock().expect("mock lock"))
    }

    fn dispatch(&self, signer: &Credential, call: &Call) -> Result<ReturnValue, CallError> {
        let mut state = self.state.lock().expect("mock lock");
        match call.method_name.as_str() {
            "create_drop" => {
                let args: CreateDropArgs = parse_args(&call.args_json)?;
                let creation = state
                    .create_drop(
                        &signer.account_id,
                        DropParams {
                            drop_id: args.drop_id,
                            name: args.name,
                            image: args.image,
                            kind: args.kind,
                            scavenger_spec: args.scavenger_spec,
                            config: args.config,
                        },
                    )
                    .map_err(|e| CallError::ActionFailure(e.to_string()))?;
                Ok(serde_json::json!(creation.drop_id.as_str()))
            }
            "add_keys" => {
                let args: AddKeysArgs = parse_args(&call.args_json)?;
                state
                    .register_keys(&args.drop_id, args.key_data, args.uses_total)
                    .map_err(|e| CallError::ActionFailure(e.to_string()))?;
                Ok(ReturnValue::Null)
            }
            "delete_drop" => {
                let args: DeleteDropArgs = parse_args(&call.args_json)?;
                state
                    .delete_drop(&signer.account_id, &args.drop_id)
                    .map_err(|e| CallError::ActionFailure(e.to_string()))?;
                Ok(ReturnValue::Null)
            }
            "claim" | "create_account_and_claim" => {
                let args: ClaimArgs = parse_args(&call.args_json)?;
                let effect = if call.method_name == "create_account_and_claim" {
                    let new_public_key = args
                        .new_public_key
                        .ok_or(ClaimError::MissingNewAccountKey)
                        .map_err(|e| CallError::ActionFailure(e.to_string()))?;
                    RequestedEffect::CreateAccountAndClaim { new_public_key }
                } else {
                    RequestedEffect::Claim
                };
                let signature = match args.signature {
                    Some(sig) => Some(
                        hex::decode(&sig)
                            .map_err(|e| CallError::ActionFailure(e.to_string()))?,
                    ),
                    None => None,
                };
                let receipt = state
                    .claim(&ClaimRequest {
                        public_key: args.public_key,
                        password: args.password,
                        signature,
                        target_account_id: args.target_account_id,
                        effect,
                    })
                    .map_err(|e| CallError::ActionFailure(e.to_string()))?;
                Ok(serde_json::json!({
                    "receiver_id": receipt.receiver_id.as_str(),
                    "account_created": receipt.account_created,
                    "uses_remaining": receipt.uses_remaining,
                }))
            }
            other => Err(CallError::ActionFailure(format!(
                "unknown method: {other}"
            ))),
        }
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: &serde_json::Value) -> Result<T, CallError> {
    serde_json::from_value(args.clone())
        .map_err(|e| CallError::ActionFailure(format!("bad args: {e}")))
}

#[async_trait]
impl Ledger for MockLedger {
    async fn submit(&self, signer: &Credential, call: Call) -> Result<ReturnValue, CallError> {
        {
            let mut calls = self.calls.lock().expect("mock lock");
            let seen = calls.len();
            calls.push(call.clone());
            if let Some(limit) = *self.fail_after.lock().expect("mock lock") {
                if seen >= limit {
                    return Err(CallError::NetworkFailure("injected failure".into()));
                }
            }
        }
        self.dispatch(signer, &call)
    }
}
