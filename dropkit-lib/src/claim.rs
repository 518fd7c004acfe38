//! The claim protocol: per-key state transitions and reward effects.
//!
//! An access key is Active while `uses_remaining > 0` and Exhausted (terminal)
//! at zero; exhausted keys are deleted when the drop's `delete_empty_drop`
//! config asks for it. Every rejection is local to one claim attempt and
//! mutates nothing, so retrying after a wrong password never burns a use.
//!
//! [`ClaimProtocol`] owns the ledger-serialized event state. Atomicity of a
//! single key's transition under concurrent claimants is delegated to the
//! ledger's serialized per-account processing; there are no locks here.

use std::collections::{BTreeSet, HashMap};

use ed25519_dalek::Signature;

use crate::catalog::{Drop, DropCatalog, DropCreation, DropKind, DropParams};
use crate::errors::{CatalogError, ClaimError};
use crate::keys::KeyRecord;
use crate::scavenger::{ScavengerProgress, ScavengerTracker};
use crate::{AccountId, DropId, PublicKey};

/// Ledger-side ceiling on keys per registration call.
pub const MAX_KEYS_PER_REGISTRATION: usize = 100;

/// The canonical message a signature-gated claim signs: the target account id.
pub fn claim_message(target: &AccountId) -> Vec<u8> {
    target.as_str().as_bytes().to_vec()
}

/// Ledger-side state of one registered access key.
///
/// The private half never appears here; it stays with the bearer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessKey {
    /// Public key the key is indexed under.
    pub public_key: PublicKey,
    /// Drop the key claims against.
    pub drop_id: DropId,
    /// Total uses the key was registered with.
    pub uses_total: u32,
    /// Uses left; mutated only by successful claims.
    pub uses_remaining: u32,
    /// Password hash per 1-based use index.
    pub password_by_use: std::collections::BTreeMap<u32, String>,
    /// Pre-assigned owner, if any.
    pub owner: Option<AccountId>,
    /// Hex-encoded encrypted attendee metadata, if any.
    pub metadata: Option<String>,
}

impl AccessKey {
    /// Whether the key has no uses left.
    pub fn is_exhausted(&self) -> bool {
        self.uses_remaining == 0
    }

    /// The 1-based index the next claim would consume.
    pub fn current_use(&self) -> u32 {
        self.uses_total - self.uses_remaining + 1
    }
}

/// The effect a claim requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestedEffect {
    /// Transfer or mint to the existing target account.
    Claim,
    /// Create a new account first, owned by a caller-supplied fresh key,
    /// then apply the reward to it.
    CreateAccountAndClaim {
        /// Full-access key for the new account. Never the ticket's own key.
        new_public_key: PublicKey,
    },
}

/// One claim attempt. Transient; never persisted.
#[derive(Clone, Debug)]
pub struct ClaimRequest {
    /// Key the claim spends a use of.
    pub public_key: PublicKey,
    /// Password hash for the current use, when the use is password-gated.
    pub password: Option<String>,
    /// Signature over [`claim_message`], when the claim is signature-gated.
    pub signature: Option<Vec<u8>>,
    /// Receiving account, or the preferred name when creating one.
    pub target_account_id: AccountId,
    /// What the claim should do.
    pub effect: RequestedEffect,
}

impl ClaimRequest {
    /// A password-gated claim to an existing account.
    pub fn with_password(
        public_key: PublicKey,
        password: impl Into<String>,
        target_account_id: AccountId,
    ) -> Self {
        Self {
            public_key,
            password: Some(password.into()),
            signature: None,
            target_account_id,
            effect: RequestedEffect::Claim,
        }
    }

    /// A signature-gated claim to an existing account, signed by the bearer's
    /// keypair over the canonical claim message.
    pub fn signed(pair: &crate::keys::KeyPair, target_account_id: AccountId) -> Self {
        let signature = pair.sign(&claim_message(&target_account_id));
        Self {
            public_key: pair.public_key().clone(),
            password: None,
            signature: Some(signature),
            target_account_id,
            effect: RequestedEffect::Claim,
        }
    }

    /// Switch the request to `create_account_and_claim` with a fresh key.
    pub fn creating_account(mut self, new_public_key: PublicKey) -> Self {
        self.effect = RequestedEffect::CreateAccountAndClaim { new_public_key };
        self
    }
}

/// The reward a successful claim applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reward {
    /// Fungible tokens moved from the funder to the receiver.
    TokensTransferred {
        /// Amount transferred.
        amount: u128,
    },
    /// An NFT was minted locally.
    NftMinted {
        /// Id of the minted token.
        token_id: String,
    },
    /// A remote mint was requested on another chain; the outbound call is the
    /// caller's to deliver.
    RemoteMintRequested {
        /// Destination chain.
        chain_id: u64,
        /// Remote NFT contract.
        contract_id: String,
        /// Remote series to mint from.
        series_id: u64,
    },
}

/// What a successful claim did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The drop's reward was applied directly.
    Reward(Reward),
    /// A scavenger piece was recorded; the aggregate reward rides along on
    /// the completing piece.
    PieceRecorded {
        /// Pieces the identity has found, including this one.
        found: u16,
        /// Pieces the hunt requires.
        required: u16,
        /// The aggregate reward, present only on completion.
        reward: Option<Reward>,
    },
}

/// Receipt of one successful claim.
#[derive(Clone, Debug)]
pub struct ClaimReceipt {
    /// Account that received the effect (newly created when
    /// `account_created`).
    pub receiver_id: AccountId,
    /// Whether the claim created the receiving account.
    pub account_created: bool,
    /// Uses left on the key after this claim.
    pub uses_remaining: u32,
    /// What the claim did.
    pub outcome: ClaimOutcome,
}

/// The event's claim-side state: drops, registered keys, accounts, balances
/// and scavenger bookkeeping.
#[derive(Default)]
pub struct ClaimProtocol {
    catalog: DropCatalog,
    keys: HashMap<PublicKey, AccessKey>,
    keys_by_owner: HashMap<AccountId, BTreeSet<PublicKey>>,
    tracker: ScavengerTracker,
    accounts: BTreeSet<AccountId>,
    balances: HashMap<AccountId, u128>,
    next_token_id: u64,
}

impl ClaimProtocol {
    /// Empty event state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a drop for `funder`; scavenger specs mint and register one
    /// single-use piece key per piece.
    pub fn create_drop(
        &mut self,
        funder: &AccountId,
        params: DropParams,
    ) -> Result<DropCreation, CatalogError> {
        let creation = self.catalog.create_drop(funder, params)?;
        self.accounts.insert(funder.clone());

        if !creation.piece_keys.is_empty() {
            self.tracker.register_hunt(
                creation.drop_id.clone(),
                creation.piece_keys.iter().map(|p| p.public_key().clone()),
            );
            for pair in &creation.piece_keys {
                self.keys.insert(
                    pair.public_key().clone(),
                    AccessKey {
                        public_key: pair.public_key().clone(),
                        drop_id: creation.drop_id.clone(),
                        uses_total: 1,
                        uses_remaining: 1,
                        password_by_use: Default::default(),
                        owner: None,
                        metadata: None,
                    },
                );
            }
        }
        Ok(creation)
    }

    /// Delete a drop (creator only) and every key still registered under it.
    pub fn delete_drop(
        &mut self,
        caller: &AccountId,
        drop_id: &DropId,
    ) -> Result<(), CatalogError> {
        self.catalog.delete_drop(caller, drop_id)?;
        self.tracker.forget_hunt(drop_id);
        let removed: Vec<PublicKey> = self
            .keys
            .values()
            .filter(|k| &k.drop_id == drop_id)
            .map(|k| k.public_key.clone())
            .collect();
        for pk in removed {
            self.remove_key(&pk);
        }
        Ok(())
    }

    /// Credit `account` with fungible tokens, creating it if needed. This is
    /// how funders are seeded before their token drops pay out.
    pub fn fund(&mut self, account: &AccountId, amount: u128) {
        self.accounts.insert(account.clone());
        *self.balances.entry(account.clone()).or_insert(0) += amount;
    }

    /// Register an existing account so claims can target it.
    pub fn register_account(&mut self, account: AccountId) {
        self.accounts.insert(account);
    }

    /// Register a batch of access keys under a drop.
    ///
    /// Validates the whole batch before touching state: a rejected batch
    /// registers nothing.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, records), fields(drop_id = %drop_id, count = records.len()))
    )]
    pub fn register_keys(
        &mut self,
        drop_id: &DropId,
        records: Vec<KeyRecord>,
        uses_total: u32,
    ) -> Result<(), ClaimError> {
        if records.len() > MAX_KEYS_PER_REGISTRATION {
            return Err(ClaimError::BatchTooLarge {
                got: records.len(),
                max: MAX_KEYS_PER_REGISTRATION,
            });
        }
        if self.catalog.get(drop_id).is_none() {
            return Err(ClaimError::UnknownDrop(drop_id.clone()));
        }
        let mut batch_keys = BTreeSet::new();
        for record in &records {
            if self.keys.contains_key(&record.public_key)
                || !batch_keys.insert(record.public_key.clone())
            {
                return Err(ClaimError::KeyAlreadyRegistered(record.public_key.clone()));
            }
        }

        for record in records {
            if let Some(owner) = &record.key_owner {
                self.keys_by_owner
                    .entry(owner.clone())
                    .or_default()
                    .insert(record.public_key.clone());
            }
            self.keys.insert(
                record.public_key.clone(),
                AccessKey {
                    public_key: record.public_key,
                    drop_id: drop_id.clone(),
                    uses_total,
                    uses_remaining: uses_total,
                    password_by_use: record.password_by_use,
                    owner: record.key_owner,
                    metadata: record.metadata,
                },
            );
        }
        Ok(())
    }

    /// Run one claim attempt.
    ///
    /// Transition order follows the protocol: resolve, exhaustion check,
    /// authentication, effect, decrement, scavenger recording. Any failure
    /// leaves the state exactly as it was.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, request), fields(key = %request.public_key))
    )]
    pub fn claim(&mut self, request: &ClaimRequest) -> Result<ClaimReceipt, ClaimError> {
        let key = self
            .keys
            .get(&request.public_key)
            .ok_or_else(|| ClaimError::UnknownKey(request.public_key.clone()))?;
        if key.is_exhausted() {
            return Err(ClaimError::KeyExhausted(request.public_key.clone()));
        }
        let use_index = key.current_use();
        let drop_id = key.drop_id.clone();
        let drop = self
            .catalog
            .get(&drop_id)
            .ok_or_else(|| ClaimError::UnknownDrop(drop_id.clone()))?
            .clone();
        let piece = drop.piece(&request.public_key).cloned();

        if let Some(expected) = key.password_by_use.get(&use_index) {
            match &request.password {
                Some(provided) if provided == expected => {}
                _ => return Err(ClaimError::InvalidPassword),
            }
        } else if piece.is_some() || drop.kind.is_multichain() {
            verify_claim_signature(
                &request.public_key,
                &request.target_account_id,
                request.signature.as_deref(),
            )?;
        }

        if piece.is_none() && drop.is_scavenger() {
            return Err(ClaimError::ScavengerPieceRequired(drop_id));
        }

        let (receiver, account_created) = match &request.effect {
            RequestedEffect::Claim => (request.target_account_id.clone(), false),
            RequestedEffect::CreateAccountAndClaim { new_public_key } => {
                if new_public_key == &request.public_key {
                    return Err(ClaimError::CredentialReuse);
                }
                (
                    self.next_available_account_id(&request.target_account_id),
                    true,
                )
            }
        };

        // Will this claim pay the drop's reward out?
        let completing = match &piece {
            None => true,
            Some(_) => {
                let found = self
                    .tracker
                    .progress(&drop_id, &receiver)
                    .map(|p| p.found)
                    .unwrap_or(0);
                usize::from(found) + 1 == drop.scavenger_pieces.as_ref().map_or(0, Vec::len)
            }
        };

        if completing {
            if let DropKind::Token { amount } = &drop.kind {
                let available = self.balances.get(&drop.funder_id).copied().unwrap_or(0);
                if available < *amount {
                    return Err(ClaimError::InsufficientFunds {
                        required: *amount,
                        available,
                    });
                }
            }
        }

        // All fallible checks are done except piece recording, which is the
        // first mutation and fails without side effects itself.
        let outcome = match &piece {
            Some(p) => {
                let progress = self.tracker.record_piece_claimed(&drop_id, &p.key, &receiver)?;
                if account_created {
                    self.accounts.insert(receiver.clone());
                }
                let reward = if completing {
                    self.tracker.release_reward(&drop_id, &receiver)?;
                    Some(self.apply_reward(&drop, &receiver))
                } else {
                    None
                };
                ClaimOutcome::PieceRecorded {
                    found: progress.found,
                    required: progress.required,
                    reward,
                }
            }
            None => {
                if account_created {
                    self.accounts.insert(receiver.clone());
                }
                ClaimOutcome::Reward(self.apply_reward(&drop, &receiver))
            }
        };

        let uses_remaining = self.consume_use(&request.public_key, &drop_id, &drop);

        Ok(ClaimReceipt {
            receiver_id: receiver,
            account_created,
            uses_remaining,
            outcome,
        })
    }

    fn apply_reward(&mut self, drop: &Drop, receiver: &AccountId) -> Reward {
        match &drop.kind {
            DropKind::Token { amount } => {
                // Funder balance was checked before any mutation.
                if let Some(balance) = self.balances.get_mut(&drop.funder_id) {
                    *balance -= amount;
                }
                *self.balances.entry(receiver.clone()).or_insert(0) += amount;
                Reward::TokensTransferred { amount: *amount }
            }
            DropKind::Nft { .. } => {
                let token_id = format!("{}:{}", drop.drop_id, self.next_token_id);
                self.next_token_id += 1;
                Reward::NftMinted { token_id }
            }
            DropKind::Multichain {
                chain_id,
                contract_id,
                series_id,
                ..
            } => Reward::RemoteMintRequested {
                chain_id: *chain_id,
                contract_id: contract_id.clone(),
                series_id: *series_id,
            },
        }
    }

    /// Spend one use and handle the Exhausted transition. Returns the uses
    /// left afterwards.
    fn consume_use(&mut self, public_key: &PublicKey, drop_id: &DropId, drop: &Drop) -> u32 {
        if let Some(stored) = self.catalog.get_mut(drop_id) {
            stored.num_claimed += 1;
        }
        let Some(key) = self.keys.get_mut(public_key) else {
            return 0;
        };
        key.uses_remaining -= 1;
        let remaining = key.uses_remaining;
        if remaining == 0 && drop.config.delete_empty_drop {
            self.remove_key(public_key);
        }
        remaining
    }

    fn remove_key(&mut self, public_key: &PublicKey) {
        if let Some(key) = self.keys.remove(public_key) {
            if let Some(owner) = key.owner {
                if let Some(owned) = self.keys_by_owner.get_mut(&owner) {
                    owned.remove(public_key);
                }
            }
        }
    }

    /// Resolve the first free name in `base`, `base-1`, `base-2`, …
    ///
    /// The suffix scan assumes the ledger serializes claims; two concurrent
    /// claimants resolving the same base would race on the same suffix.
    fn next_available_account_id(&self, preferred: &AccountId) -> AccountId {
        if !self.accounts.contains(preferred) {
            return preferred.clone();
        }
        let mut counter = 1u64;
        loop {
            let candidate = AccountId::new(format!("{}-{}", preferred, counter));
            if !self.accounts.contains(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    // ------------------------------ queries ------------------------------ //

    /// Ledger-side state of a key, if still registered.
    pub fn key_information(&self, public_key: &PublicKey) -> Option<&AccessKey> {
        self.keys.get(public_key)
    }

    /// Public keys pre-assigned to `owner`, in key order.
    pub fn keys_for_owner(&self, owner: &AccountId) -> Vec<PublicKey> {
        self.keys_by_owner
            .get(owner)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Fungible token balance of an account.
    pub fn ft_balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Whether an account exists.
    pub fn account_exists(&self, account: &AccountId) -> bool {
        self.accounts.contains(account)
    }

    /// Look up a drop.
    pub fn drop(&self, drop_id: &DropId) -> Option<&Drop> {
        self.catalog.get(drop_id)
    }

    /// Ids of every drop a funder created.
    pub fn drops_for_funder(&self, funder: &AccountId) -> Vec<DropId> {
        self.catalog.drops_for_funder(funder)
    }

    /// Scavenger progress of an identity through a hunt.
    pub fn scavenger_progress(
        &self,
        drop_id: &DropId,
        identity: &AccountId,
    ) -> Option<ScavengerProgress> {
        self.tracker.progress(drop_id, identity)
    }
}

fn verify_claim_signature(
    public_key: &PublicKey,
    target: &AccountId,
    signature: Option<&[u8]>,
) -> Result<(), ClaimError> {
    let signature = signature.ok_or(ClaimError::InvalidSignature)?;
    let verifying_key = public_key
        .verifying_key()
        .ok_or(ClaimError::InvalidSignature)?;
    let signature = Signature::from_slice(signature).map_err(|_| ClaimError::InvalidSignature)?;
    verifying_key
        .verify_strict(&claim_message(target), &signature)
        .map_err(|_| ClaimError::InvalidSignature)
}
