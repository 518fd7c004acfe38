//! Drop modelling and the per-funder catalog.
//!
//! A drop is a funded reward definition: a fungible token amount, an NFT, or a
//! cross-chain NFT minted remotely at claim time. The reward kind is a tagged
//! union validated at construction; it never changes afterwards. A drop may be
//! decomposed into a scavenger hunt, in which case one single-use piece key is
//! minted per piece and the aggregate reward is only releasable once one
//! identity has claimed every piece.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;
use crate::keys::{KeyPair, KeyPairFactory};
use crate::{AccountId, DropId, PublicKey};

/// Separates the funder from the sequence number in generated drop ids.
pub const DROP_DELIMITER: &str = "||";

/// Metadata for NFT and multichain rewards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NftMetadata {
    /// Display title of the minted token.
    pub title: String,
    /// Longer description, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Media URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

impl NftMetadata {
    /// Metadata with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            media: None,
        }
    }
}

/// The reward a drop pays out per completed claim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DropKind {
    /// A fungible token amount per claim.
    Token {
        /// Amount transferred per claim.
        amount: u128,
    },
    /// An NFT minted on the local ledger.
    Nft {
        /// Metadata of the minted token.
        metadata: NftMetadata,
    },
    /// An NFT minted on a remote chain through an external signer.
    Multichain {
        /// Destination chain.
        chain_id: u64,
        /// Receiving NFT contract on the remote chain.
        contract_id: String,
        /// Series to mint from; must exist on the remote contract already.
        series_id: u64,
        /// Metadata of the minted token.
        metadata: NftMetadata,
    },
}

impl DropKind {
    /// Whether this is a fungible token drop.
    pub fn is_token(&self) -> bool {
        matches!(self, Self::Token { .. })
    }

    /// Whether this is a local NFT drop.
    pub fn is_nft(&self) -> bool {
        matches!(self, Self::Nft { .. })
    }

    /// Whether this is a cross-chain NFT drop.
    pub fn is_multichain(&self) -> bool {
        matches!(self, Self::Multichain { .. })
    }

    /// Check the kind-required fields at construction time.
    pub(crate) fn validate(&self) -> Result<(), CatalogError> {
        match self {
            Self::Token { amount } => {
                if *amount == 0 {
                    return Err(CatalogError::InvalidAssetConfig(
                        "token drop amount must be non-zero".into(),
                    ));
                }
            }
            Self::Nft { metadata } => {
                if metadata.title.is_empty() {
                    return Err(CatalogError::InvalidAssetConfig(
                        "nft drop requires a title".into(),
                    ));
                }
            }
            Self::Multichain {
                contract_id,
                metadata,
                ..
            } => {
                if contract_id.is_empty() {
                    return Err(CatalogError::InvalidAssetConfig(
                        "multichain drop requires a remote contract id".into(),
                    ));
                }
                if metadata.title.is_empty() {
                    return Err(CatalogError::InvalidAssetConfig(
                        "multichain drop requires a title".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// One piece of a scavenger hunt, keyed by its own single-use keypair.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScavengerPiece {
    /// Public key of the piece's single-use access key.
    pub key: PublicKey,
    /// What the attendee has to find.
    pub description: String,
}

/// Per-drop behaviour toggles.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DropConfig {
    /// Delete access keys from the ledger once exhausted, instead of keeping
    /// them queryable in their terminal state.
    #[serde(default)]
    pub delete_empty_drop: bool,
}

/// A funded reward definition claimable via registered access keys.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Drop {
    /// Unique id, `funder || sequence` when generated.
    pub drop_id: DropId,
    /// Account that created and funds the drop.
    pub funder_id: AccountId,
    /// Display name.
    pub name: String,
    /// Optional image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// The reward kind; immutable after creation.
    pub kind: DropKind,
    /// Ordered scavenger pieces, if this drop is a hunt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scavenger_pieces: Option<Vec<ScavengerPiece>>,
    /// Number of successful claims so far.
    #[serde(default)]
    pub num_claimed: u64,
    /// Behaviour toggles.
    #[serde(default)]
    pub config: DropConfig,
}

impl Drop {
    /// Whether the drop is decomposed into scavenger pieces.
    pub fn is_scavenger(&self) -> bool {
        self.scavenger_pieces.is_some()
    }

    /// Find the piece registered under `key`, if any.
    pub fn piece(&self, key: &PublicKey) -> Option<&ScavengerPiece> {
        self.scavenger_pieces
            .as_ref()?
            .iter()
            .find(|p| &p.key == key)
    }
}

/// Inputs to drop creation.
#[derive(Clone, Debug, Default)]
pub struct DropParams {
    /// Explicit drop id; generated from the funder and a sequence number
    /// when absent.
    pub drop_id: Option<DropId>,
    /// Display name.
    pub name: String,
    /// Optional image URL.
    pub image: Option<String>,
    /// The reward kind.
    pub kind: DropKind,
    /// Ordered piece descriptions; presence turns the drop into a hunt.
    pub scavenger_spec: Option<Vec<String>>,
    /// Behaviour toggles.
    pub config: DropConfig,
}

impl Default for DropKind {
    fn default() -> Self {
        Self::Token { amount: 1 }
    }
}

/// What `create_drop` hands back: the id plus the freshly minted piece
/// keypairs (empty for non-hunt drops). The piece secrets exist only here;
/// the catalog keeps the public halves.
#[derive(Debug)]
pub struct DropCreation {
    /// Id of the new drop.
    pub drop_id: DropId,
    /// One single-use keypair per scavenger piece, in spec order.
    pub piece_keys: Vec<KeyPair>,
}

/// Owns every drop, indexed by id and by funder.
#[derive(Default)]
pub struct DropCatalog {
    drops: HashMap<DropId, Drop>,
    drops_by_funder: HashMap<AccountId, BTreeSet<DropId>>,
    created_by_funder: HashMap<AccountId, u64>,
}

impl DropCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a drop for `funder`, minting piece keys when a scavenger spec
    /// is present.
    ///
    /// Validation happens before any state changes; a rejected config leaves
    /// the catalog untouched.
    pub fn create_drop(
        &mut self,
        funder: &AccountId,
        params: DropParams,
    ) -> Result<DropCreation, CatalogError> {
        params.kind.validate()?;
        if let Some(spec) = &params.scavenger_spec {
            if spec.is_empty() {
                return Err(CatalogError::InvalidAssetConfig(
                    "scavenger hunt needs at least one piece".into(),
                ));
            }
        }

        let drop_id = match params.drop_id {
            Some(id) => id,
            None => {
                let seq = self.created_by_funder.get(funder).copied().unwrap_or(0);
                DropId::new(format!("{}{}{}", funder, DROP_DELIMITER, seq))
            }
        };
        if self.drops.contains_key(&drop_id) {
            return Err(CatalogError::DuplicateDropId(drop_id));
        }

        let (pieces, piece_keys) = match params.scavenger_spec {
            Some(descriptions) => {
                let keys = KeyPairFactory::generate(descriptions.len());
                let pieces = descriptions
                    .into_iter()
                    .zip(keys.iter())
                    .map(|(description, pair)| ScavengerPiece {
                        key: pair.public_key().clone(),
                        description,
                    })
                    .collect();
                (Some(pieces), keys)
            }
            None => (None, Vec::new()),
        };

        self.drops.insert(
            drop_id.clone(),
            Drop {
                drop_id: drop_id.clone(),
                funder_id: funder.clone(),
                name: params.name,
                image: params.image,
                kind: params.kind,
                scavenger_pieces: pieces,
                num_claimed: 0,
                config: params.config,
            },
        );
        self.drops_by_funder
            .entry(funder.clone())
            .or_default()
            .insert(drop_id.clone());
        *self.created_by_funder.entry(funder.clone()).or_insert(0) += 1;

        Ok(DropCreation {
            drop_id,
            piece_keys,
        })
    }

    /// Delete a drop; only its creator may do so.
    pub fn delete_drop(&mut self, caller: &AccountId, drop_id: &DropId) -> Result<Drop, CatalogError> {
        let drop = self
            .drops
            .remove(drop_id)
            .ok_or_else(|| CatalogError::UnknownDrop(drop_id.clone()))?;
        if &drop.funder_id != caller {
            self.drops.insert(drop_id.clone(), drop);
            return Err(CatalogError::NotDropCreator {
                caller: caller.clone(),
                drop_id: drop_id.clone(),
            });
        }
        if let Some(ids) = self.drops_by_funder.get_mut(caller) {
            ids.remove(drop_id);
        }
        Ok(drop)
    }

    /// Look up a drop by id.
    pub fn get(&self, drop_id: &DropId) -> Option<&Drop> {
        self.drops.get(drop_id)
    }

    pub(crate) fn get_mut(&mut self, drop_id: &DropId) -> Option<&mut Drop> {
        self.drops.get_mut(drop_id)
    }

    /// Ids of every drop a funder created, in id order.
    pub fn drops_for_funder(&self, funder: &AccountId) -> Vec<DropId> {
        self.drops_by_funder
            .get(funder)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funder() -> AccountId {
        AccountId::new("sponsor.test")
    }

    #[test]
    fn generates_sequential_drop_ids_per_funder() {
        let mut catalog = DropCatalog::new();
        let first = catalog
            .create_drop(&funder(), DropParams::default())
            .unwrap();
        let second = catalog
            .create_drop(&funder(), DropParams::default())
            .unwrap();

        assert_eq!(first.drop_id.as_str(), "sponsor.test||0");
        assert_eq!(second.drop_id.as_str(), "sponsor.test||1");
        assert_eq!(catalog.drops_for_funder(&funder()).len(), 2);
    }

    #[test]
    fn explicit_drop_id_collision_is_rejected() {
        let mut catalog = DropCatalog::new();
        let params = DropParams {
            drop_id: Some(DropId::new("gala2026")),
            ..DropParams::default()
        };
        catalog.create_drop(&funder(), params.clone()).unwrap();

        let err = catalog.create_drop(&funder(), params).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateDropId(_)));
    }

    #[test]
    fn kind_required_fields_are_validated_before_insertion() {
        let mut catalog = DropCatalog::new();

        let zero_amount = DropParams {
            kind: DropKind::Token { amount: 0 },
            ..DropParams::default()
        };
        assert!(matches!(
            catalog.create_drop(&funder(), zero_amount),
            Err(CatalogError::InvalidAssetConfig(_))
        ));

        let untitled_nft = DropParams {
            kind: DropKind::Nft {
                metadata: NftMetadata::titled(""),
            },
            ..DropParams::default()
        };
        assert!(matches!(
            catalog.create_drop(&funder(), untitled_nft),
            Err(CatalogError::InvalidAssetConfig(_))
        ));

        let no_remote_contract = DropParams {
            kind: DropKind::Multichain {
                chain_id: 1,
                contract_id: String::new(),
                series_id: 7,
                metadata: NftMetadata::titled("poap"),
            },
            ..DropParams::default()
        };
        assert!(matches!(
            catalog.create_drop(&funder(), no_remote_contract),
            Err(CatalogError::InvalidAssetConfig(_))
        ));

        assert!(catalog.drops_for_funder(&funder()).is_empty());
    }

    #[test]
    fn scavenger_spec_mints_one_piece_key_per_description() {
        let mut catalog = DropCatalog::new();
        let creation = catalog
            .create_drop(
                &funder(),
                DropParams {
                    scavenger_spec: Some(vec!["lobby".into(), "stage".into(), "booth".into()]),
                    ..DropParams::default()
                },
            )
            .unwrap();

        assert_eq!(creation.piece_keys.len(), 3);
        let drop = catalog.get(&creation.drop_id).unwrap();
        let pieces = drop.scavenger_pieces.as_ref().unwrap();
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].description, "lobby");
        for (piece, pair) in pieces.iter().zip(&creation.piece_keys) {
            assert_eq!(&piece.key, pair.public_key());
        }
    }

    #[test]
    fn empty_scavenger_spec_is_invalid() {
        let mut catalog = DropCatalog::new();
        let err = catalog
            .create_drop(
                &funder(),
                DropParams {
                    scavenger_spec: Some(vec![]),
                    ..DropParams::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidAssetConfig(_)));
    }

    #[test]
    fn only_the_creator_may_delete() {
        let mut catalog = DropCatalog::new();
        let creation = catalog
            .create_drop(&funder(), DropParams::default())
            .unwrap();

        let other = AccountId::new("other.test");
        assert!(matches!(
            catalog.delete_drop(&other, &creation.drop_id),
            Err(CatalogError::NotDropCreator { .. })
        ));

        catalog.delete_drop(&funder(), &creation.drop_id).unwrap();
        assert!(catalog.get(&creation.drop_id).is_none());
    }
}
