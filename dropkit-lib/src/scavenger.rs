//! Scavenger-hunt completion tracking.
//!
//! Tracks which identity claimed which piece of a hunt and gates the
//! aggregate reward behind full completion by a single identity. The first
//! claimant of a piece is permanent: a later claim by someone else neither
//! overwrites the record nor counts toward their own hunt.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::errors::ScavengerError;
use crate::{AccountId, DropId, PublicKey};

/// How far an identity has gotten through a hunt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScavengerProgress {
    /// Pieces this identity has claimed.
    pub found: u16,
    /// Pieces the hunt requires.
    pub required: u16,
}

impl ScavengerProgress {
    /// Whether every required piece has been found.
    pub fn is_complete(&self) -> bool {
        self.found == self.required
    }
}

/// Tracks per-piece claims and reward release for every registered hunt.
#[derive(Default)]
pub struct ScavengerTracker {
    /// Pieces each hunt requires.
    pieces_by_drop: HashMap<DropId, BTreeSet<PublicKey>>,
    /// First (and only) claimant per piece.
    claimant_by_piece: HashMap<(DropId, PublicKey), AccountId>,
    /// Pieces found per identity.
    found: HashMap<(DropId, AccountId), BTreeSet<PublicKey>>,
    /// Hunts whose aggregate reward has been released.
    released: HashSet<DropId>,
}

impl ScavengerTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hunt's pieces, discarding anything a previous hunt under
    /// the same drop id left behind. A deleted drop's id may be reused; its
    /// old pieces, claimants and release flag must not leak into the new
    /// hunt.
    pub fn register_hunt(&mut self, drop_id: DropId, pieces: impl IntoIterator<Item = PublicKey>) {
        self.forget_hunt(&drop_id);
        self.pieces_by_drop
            .insert(drop_id, pieces.into_iter().collect());
    }

    /// Drop every trace of a hunt: piece set, per-piece claimants,
    /// per-identity progress and the release flag.
    pub fn forget_hunt(&mut self, drop_id: &DropId) {
        self.pieces_by_drop.remove(drop_id);
        self.claimant_by_piece.retain(|(d, _), _| d != drop_id);
        self.found.retain(|(d, _), _| d != drop_id);
        self.released.remove(drop_id);
    }

    /// Record that `identity` claimed `piece` of `drop_id`.
    ///
    /// Fails without mutating anything when the hunt or piece is unknown, or
    /// when another identity already holds the piece.
    pub fn record_piece_claimed(
        &mut self,
        drop_id: &DropId,
        piece: &PublicKey,
        identity: &AccountId,
    ) -> Result<ScavengerProgress, ScavengerError> {
        let required = self
            .pieces_by_drop
            .get(drop_id)
            .ok_or_else(|| ScavengerError::UnknownHunt(drop_id.clone()))?;
        if !required.contains(piece) {
            return Err(ScavengerError::UnknownPiece(piece.clone()));
        }

        let slot = (drop_id.clone(), piece.clone());
        if let Some(claimant) = self.claimant_by_piece.get(&slot) {
            if claimant != identity {
                return Err(ScavengerError::PieceAlreadyClaimed {
                    piece: piece.clone(),
                    claimant: claimant.clone(),
                });
            }
            // Same identity re-recording a piece is a no-op at this level;
            // the single-use piece key already prevents it upstream.
        } else {
            self.claimant_by_piece.insert(slot, identity.clone());
        }

        let found = self
            .found
            .entry((drop_id.clone(), identity.clone()))
            .or_default();
        found.insert(piece.clone());

        Ok(ScavengerProgress {
            found: found.len() as u16,
            required: required.len() as u16,
        })
    }

    /// Whether `identity` has claimed every piece of `drop_id`.
    pub fn is_complete(&self, drop_id: &DropId, identity: &AccountId) -> bool {
        let Some(required) = self.pieces_by_drop.get(drop_id) else {
            return false;
        };
        self.found
            .get(&(drop_id.clone(), identity.clone()))
            .map(|found| found.len() == required.len())
            .unwrap_or(false)
    }

    /// Progress of `identity` through `drop_id`, if the hunt exists.
    pub fn progress(&self, drop_id: &DropId, identity: &AccountId) -> Option<ScavengerProgress> {
        let required = self.pieces_by_drop.get(drop_id)?;
        let found = self
            .found
            .get(&(drop_id.clone(), identity.clone()))
            .map(|set| set.len())
            .unwrap_or(0);
        Some(ScavengerProgress {
            found: found as u16,
            required: required.len() as u16,
        })
    }

    /// Release the aggregate reward to `identity`.
    ///
    /// Callable exactly once per hunt, and only once [`Self::is_complete`]
    /// holds for the caller.
    pub fn release_reward(
        &mut self,
        drop_id: &DropId,
        identity: &AccountId,
    ) -> Result<(), ScavengerError> {
        if !self.pieces_by_drop.contains_key(drop_id) {
            return Err(ScavengerError::UnknownHunt(drop_id.clone()));
        }
        if self.released.contains(drop_id) {
            return Err(ScavengerError::AlreadyReleased(drop_id.clone()));
        }
        if !self.is_complete(drop_id, identity) {
            return Err(ScavengerError::HuntIncomplete(drop_id.clone()));
        }
        self.released.insert(drop_id.clone());
        Ok(())
    }
}
