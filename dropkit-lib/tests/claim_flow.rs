//! End-to-end claim flows against the in-memory protocol state.

use dropkit_lib::claim::{claim_message, ClaimOutcome, ClaimProtocol, ClaimRequest, Reward};
use dropkit_lib::keys::{KeyPair, KeyPairFactory, KeyRecord};
use dropkit_lib::{
    passwords, AccountId, ClaimError, DropConfig, DropKind, DropParams, NftMetadata, PublicKey,
};

fn funder() -> AccountId {
    AccountId::new("sponsor.test")
}

fn seeded_protocol() -> ClaimProtocol {
    let mut protocol = ClaimProtocol::new();
    protocol.fund(&funder(), 1_000_000);
    protocol
}

fn password_record(pair: &KeyPair, base: &str, uses_total: u32) -> KeyRecord {
    let uses: Vec<u32> = (1..=uses_total).collect();
    let mut record = KeyRecord::new(pair.public_key().clone());
    record.password_by_use = passwords::passwords_for_key(base, pair.public_key().as_str(), &uses);
    record
}

fn password_claim(pair: &KeyPair, base: &str, use_index: u32, target: &AccountId) -> ClaimRequest {
    ClaimRequest::with_password(
        pair.public_key().clone(),
        passwords::derive(base, pair.public_key().as_str(), use_index),
        target.clone(),
    )
}

#[test]
fn multi_use_key_exhausts_exactly_at_its_limit() {
    let mut protocol = seeded_protocol();
    let drop_id = protocol
        .create_drop(
            &funder(),
            DropParams {
                name: "three sessions".into(),
                kind: DropKind::Token { amount: 10 },
                ..DropParams::default()
            },
        )
        .unwrap()
        .drop_id;

    let pair = KeyPair::generate();
    protocol
        .register_keys(&drop_id, vec![password_record(&pair, "base", 3)], 3)
        .unwrap();
    let alice = AccountId::new("alice.test");

    for use_index in 1..=3 {
        let receipt = protocol
            .claim(&password_claim(&pair, "base", use_index, &alice))
            .unwrap();
        assert_eq!(receipt.uses_remaining, 3 - use_index);
    }
    assert_eq!(protocol.ft_balance_of(&alice), 30);
    assert_eq!(protocol.drop(&drop_id).unwrap().num_claimed, 3);

    // The fourth attempt hits the terminal state, even with a password that
    // would otherwise be derivable.
    let err = protocol
        .claim(&password_claim(&pair, "base", 4, &alice))
        .unwrap_err();
    assert!(matches!(err, ClaimError::KeyExhausted(_)));
}

#[test]
fn exhausted_keys_stay_queryable_unless_the_drop_deletes_them() {
    for delete_empty_drop in [false, true] {
        let mut protocol = seeded_protocol();
        let drop_id = protocol
            .create_drop(
                &funder(),
                DropParams {
                    name: "one shot".into(),
                    kind: DropKind::Token { amount: 1 },
                    config: DropConfig { delete_empty_drop },
                    ..DropParams::default()
                },
            )
            .unwrap()
            .drop_id;

        let pair = KeyPair::generate();
        protocol
            .register_keys(&drop_id, vec![password_record(&pair, "base", 1)], 1)
            .unwrap();
        protocol
            .claim(&password_claim(&pair, "base", 1, &AccountId::new("a.test")))
            .unwrap();

        let info = protocol.key_information(pair.public_key());
        if delete_empty_drop {
            assert!(info.is_none());
        } else {
            let info = info.unwrap();
            assert!(info.is_exhausted());
            assert_eq!(info.uses_total, 1);
        }
    }
}

#[test]
fn nft_claims_mint_distinct_token_ids() {
    let mut protocol = seeded_protocol();
    let drop_id = protocol
        .create_drop(
            &funder(),
            DropParams {
                name: "poster".into(),
                kind: DropKind::Nft {
                    metadata: NftMetadata::titled("poster"),
                },
                ..DropParams::default()
            },
        )
        .unwrap()
        .drop_id;

    let pairs = KeyPairFactory::generate(2);
    let records = pairs
        .iter()
        .map(|p| password_record(p, "base", 1))
        .collect();
    protocol.register_keys(&drop_id, records, 1).unwrap();

    let mut token_ids = Vec::new();
    for (i, pair) in pairs.iter().enumerate() {
        let target = AccountId::new(format!("guest{i}.test"));
        let receipt = protocol
            .claim(&password_claim(pair, "base", 1, &target))
            .unwrap();
        match receipt.outcome {
            ClaimOutcome::Reward(Reward::NftMinted { token_id }) => token_ids.push(token_id),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_ne!(token_ids[0], token_ids[1]);
}

#[test]
fn account_creation_claims_land_on_the_fresh_account() {
    let mut protocol = seeded_protocol();
    let drop_id = protocol
        .create_drop(
            &funder(),
            DropParams {
                name: "onboarding".into(),
                kind: DropKind::Token { amount: 40 },
                ..DropParams::default()
            },
        )
        .unwrap()
        .drop_id;

    let pair = KeyPair::generate();
    protocol
        .register_keys(&drop_id, vec![password_record(&pair, "base", 1)], 1)
        .unwrap();

    let wallet_key = KeyPair::generate();
    let preferred = AccountId::new("newbie.test");
    let receipt = protocol
        .claim(
            &password_claim(&pair, "base", 1, &preferred)
                .creating_account(wallet_key.public_key().clone()),
        )
        .unwrap();

    assert!(receipt.account_created);
    assert_eq!(receipt.receiver_id, preferred);
    assert!(protocol.account_exists(&preferred));
    assert_eq!(protocol.ft_balance_of(&preferred), 40);
}

#[test]
fn owner_index_only_returns_that_owners_keys() {
    let mut protocol = seeded_protocol();
    let drop_id = protocol
        .create_drop(
            &funder(),
            DropParams {
                name: "tickets".into(),
                kind: DropKind::Token { amount: 1 },
                ..DropParams::default()
            },
        )
        .unwrap()
        .drop_id;

    let owner = AccountId::new("owner.test");
    let pairs = KeyPairFactory::generate(75);
    let mut owned: Vec<PublicKey> = Vec::new();
    let records = pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| {
            let mut record = KeyRecord::new(pair.public_key().clone());
            if i % 3 == 0 {
                record.key_owner = Some(owner.clone());
                owned.push(pair.public_key().clone());
            }
            record
        })
        .collect();
    protocol.register_keys(&drop_id, records, 1).unwrap();

    let mut keys = protocol.keys_for_owner(&owner);
    assert_eq!(keys.len(), 25);
    owned.sort();
    keys.sort();
    assert_eq!(keys, owned);
    assert!(protocol
        .keys_for_owner(&AccountId::new("nobody.test"))
        .is_empty());
}

#[test]
fn scavenger_reward_goes_to_the_identity_finishing_the_hunt() {
    let mut protocol = seeded_protocol();
    let creation = protocol
        .create_drop(
            &funder(),
            DropParams {
                name: "venue hunt".into(),
                kind: DropKind::Token { amount: 500 },
                scavenger_spec: Some(vec!["lobby".into(), "stage".into(), "booth".into()]),
                ..DropParams::default()
            },
        )
        .unwrap();
    let piece_keys = creation.piece_keys;
    assert_eq!(piece_keys.len(), 3);

    let alice = AccountId::new("alice.test");
    let bob = AccountId::new("bob.test");

    // The drop's reward is unreachable without a piece key.
    let stray = KeyPair::generate();
    protocol
        .register_keys(
            &creation.drop_id,
            vec![password_record(&stray, "base", 1)],
            1,
        )
        .unwrap();
    assert!(matches!(
        protocol.claim(&password_claim(&stray, "base", 1, &alice)),
        Err(ClaimError::ScavengerPieceRequired(_))
    ));

    // Bob grabs a piece first; it is his forever.
    let receipt = protocol
        .claim(&ClaimRequest::signed(&piece_keys[0], bob.clone()))
        .unwrap();
    assert!(matches!(
        receipt.outcome,
        ClaimOutcome::PieceRecorded {
            found: 1,
            required: 3,
            reward: None,
        }
    ));

    // Alice collects the remaining two; neither identity has all three, so
    // the reward never fires.
    for key in &piece_keys[1..] {
        let receipt = protocol
            .claim(&ClaimRequest::signed(key, alice.clone()))
            .unwrap();
        assert!(matches!(
            receipt.outcome,
            ClaimOutcome::PieceRecorded { reward: None, .. }
        ));
    }
    assert_eq!(protocol.ft_balance_of(&alice), 0);
    assert_eq!(protocol.ft_balance_of(&bob), 0);
    assert_eq!(
        protocol
            .scavenger_progress(&creation.drop_id, &alice)
            .unwrap()
            .found,
        2
    );
}

#[test]
fn completing_every_piece_releases_the_aggregate_reward_once() {
    let mut protocol = seeded_protocol();
    let creation = protocol
        .create_drop(
            &funder(),
            DropParams {
                name: "venue hunt".into(),
                kind: DropKind::Token { amount: 500 },
                scavenger_spec: Some(vec!["lobby".into(), "stage".into()]),
                ..DropParams::default()
            },
        )
        .unwrap();
    let alice = AccountId::new("alice.test");

    let receipt = protocol
        .claim(&ClaimRequest::signed(&creation.piece_keys[0], alice.clone()))
        .unwrap();
    assert!(matches!(
        receipt.outcome,
        ClaimOutcome::PieceRecorded { reward: None, .. }
    ));

    let receipt = protocol
        .claim(&ClaimRequest::signed(&creation.piece_keys[1], alice.clone()))
        .unwrap();
    match receipt.outcome {
        ClaimOutcome::PieceRecorded {
            found: 2,
            required: 2,
            reward: Some(Reward::TokensTransferred { amount: 500 }),
        } => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(protocol.ft_balance_of(&alice), 500);

    // Piece keys are single-use; replaying the completing claim fails.
    let replay = ClaimRequest::signed(&creation.piece_keys[1], alice.clone());
    assert!(matches!(
        protocol.claim(&replay),
        Err(ClaimError::KeyExhausted(_))
    ));
}

#[test]
fn recreated_hunt_under_a_reused_drop_id_starts_fresh() {
    let mut protocol = seeded_protocol();
    let drop_id = dropkit_lib::DropId::new("gala2026");
    let hunt_params = || DropParams {
        drop_id: Some(drop_id.clone()),
        name: "venue hunt".into(),
        kind: DropKind::Token { amount: 100 },
        scavenger_spec: Some(vec!["lobby".into()]),
        ..DropParams::default()
    };

    // First edition of the hunt runs to completion and pays out.
    let first = protocol.create_drop(&funder(), hunt_params()).unwrap();
    let alice = AccountId::new("alice.test");
    protocol
        .claim(&ClaimRequest::signed(&first.piece_keys[0], alice.clone()))
        .unwrap();
    assert_eq!(protocol.ft_balance_of(&alice), 100);

    protocol.delete_drop(&funder(), &drop_id).unwrap();

    // The second edition must not inherit the first one's pieces, progress
    // or released flag.
    let second = protocol.create_drop(&funder(), hunt_params()).unwrap();
    let bob = AccountId::new("bob.test");
    assert_eq!(
        protocol.scavenger_progress(&drop_id, &bob).unwrap().required,
        1
    );

    let receipt = protocol
        .claim(&ClaimRequest::signed(&second.piece_keys[0], bob.clone()))
        .unwrap();
    match receipt.outcome {
        ClaimOutcome::PieceRecorded {
            found: 1,
            required: 1,
            reward: Some(Reward::TokensTransferred { amount: 100 }),
        } => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(protocol.ft_balance_of(&bob), 100);

    // The first edition's piece key died with its drop.
    assert!(matches!(
        protocol.claim(&ClaimRequest::signed(&first.piece_keys[0], bob.clone())),
        Err(ClaimError::UnknownKey(_))
    ));
}

#[test]
fn piece_claims_sign_the_target_account_id() {
    let mut protocol = seeded_protocol();
    let creation = protocol
        .create_drop(
            &funder(),
            DropParams {
                name: "hunt".into(),
                kind: DropKind::Token { amount: 5 },
                scavenger_spec: Some(vec!["lobby".into()]),
                ..DropParams::default()
            },
        )
        .unwrap();
    let alice = AccountId::new("alice.test");
    let mallory = AccountId::new("mallory.test");

    // A signature over Alice's account cannot be redirected to Mallory.
    let pair = &creation.piece_keys[0];
    let redirected = ClaimRequest {
        public_key: pair.public_key().clone(),
        password: None,
        signature: Some(pair.sign(&claim_message(&alice))),
        target_account_id: mallory.clone(),
        effect: dropkit_lib::RequestedEffect::Claim,
    };
    assert!(matches!(
        protocol.claim(&redirected),
        Err(ClaimError::InvalidSignature)
    ));

    protocol
        .claim(&ClaimRequest::signed(pair, alice.clone()))
        .unwrap();
    assert_eq!(protocol.ft_balance_of(&alice), 5);
}
