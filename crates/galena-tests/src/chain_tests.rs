//! Chain scenario tests: genesis, accounting, verification, snapshots.

use crate::generators::{funded_genesis, seal_block, sealed_chain, secret, transfer};
use galena_chain::{difficulty, params, Chain, ChainError, ValidationError};
use num_bigint::BigInt;

// ============ S1: genesis creation ============

#[test]
fn test_genesis_creation() {
    let (_, address, _) = funded_genesis(1);

    let chain = Chain::new();
    chain.init_genesis(&address).unwrap();

    assert_eq!(chain.len(), 1);
    assert_eq!(
        chain.balance_of(&address),
        BigInt::from(params::GENESIS_REWARD)
    );
    assert_eq!(chain.tip().unwrap().difficulty, difficulty::initial());
}

// ============ Accounting over a multi-block chain ============

#[test]
fn test_balances_across_blocks() {
    let (alice_key, alice, genesis) = funded_genesis(1);
    let bob = crate::generators::address(2);
    let chain = Chain::from_blocks(vec![genesis.clone()]);

    let b1 = seal_block(&genesis, vec![transfer(&alice_key, &bob, 100, 0)], &alice);
    chain.try_extend(&b1).unwrap();
    let b2 = seal_block(&b1, vec![transfer(&alice_key, &bob, 50, 1)], &alice);
    chain.try_extend(&b2).unwrap();

    // Alice: seed reward, minus two transfers, plus two coinbases (base
    // reward plus the unit fee each).
    let expected_alice =
        BigInt::from(params::GENESIS_REWARD) - 150 + BigInt::from(2 * (params::BASE_BLOCK_REWARD + 1));
    assert_eq!(chain.balance_of(&alice), expected_alice);
    assert_eq!(chain.balance_of(&bob), BigInt::from(150));
    assert_eq!(chain.nonce_of(&alice, 0), 2);
    assert_eq!(chain.nonce_of(&bob, 0), 0);
}

// ============ S4: replay rejection ============

#[test]
fn test_replay_same_nonce_rejected() {
    let (alice_key, alice, genesis) = funded_genesis(1);
    let chain = Chain::from_blocks(vec![genesis.clone()]);

    // Same (sender, nonce), different recipients.
    let block = seal_block(
        &genesis,
        vec![
            transfer(&alice_key, &crate::generators::address(2), 10, 0),
            transfer(&alice_key, &crate::generators::address(3), 10, 0),
        ],
        &alice,
    );

    assert!(matches!(
        chain.try_extend(&block),
        Err(ChainError::Validation(ValidationError::NonceMismatch {
            got: 0,
            expected: 1,
            ..
        }))
    ));
    assert_eq!(chain.len(), 1);
}

// ============ S5: insufficient balance ============

#[test]
fn test_insufficient_balance_rejected() {
    let (_, alice, genesis) = funded_genesis(1);
    let chain = Chain::from_blocks(vec![genesis.clone()]);

    // The sender holds nothing on this chain.
    let broke = secret(9);
    let block = seal_block(
        &genesis,
        vec![transfer(&broke, &alice, 100, 0)],
        &alice,
    );

    assert!(matches!(
        chain.try_extend(&block),
        Err(ChainError::Validation(
            ValidationError::InsufficientBalance { .. }
        ))
    ));
}

// ============ Whole-chain verification ============

#[test]
fn test_verify_full_accepts_sealed_chain() {
    let (_, alice, genesis) = funded_genesis(1);
    let blocks = sealed_chain(&genesis, &alice, 6);

    Chain::verify_full(&blocks, &genesis).unwrap();
}

#[test]
fn test_verify_full_rejects_tampered_block() {
    let (_, alice, genesis) = funded_genesis(1);
    let mut blocks = sealed_chain(&genesis, &alice, 6);

    // Inflate a middle coinbase after sealing.
    blocks[3].transactions[0].amount += 1u8;

    assert!(matches!(
        Chain::verify_full(&blocks, &genesis),
        Err(ValidationError::MerkleMismatch { .. })
    ));
}

#[test]
fn test_verify_full_rejects_wrong_genesis() {
    let (_, alice, genesis) = funded_genesis(1);
    let (_, _, other_genesis) = funded_genesis(2);
    let blocks = sealed_chain(&genesis, &alice, 3);

    assert!(matches!(
        Chain::verify_full(&blocks, &other_genesis),
        Err(ValidationError::GenesisMismatch)
    ));
}

// ============ Wallet integration ============

#[test]
fn test_wallet_derived_key_signs_valid_transfers() {
    let (_, master) = galena_wallet::generate_master().unwrap();
    let (wallet_key, wallet_addr) = galena_wallet::derive_key(&master, 0).unwrap();

    let chain = Chain::new();
    chain.init_genesis(&wallet_addr).unwrap();
    let genesis = chain.tip().unwrap();

    let block = seal_block(
        &genesis,
        vec![transfer(&wallet_key, &crate::generators::address(2), 10, 0)],
        &wallet_addr,
    );
    chain.try_extend(&block).unwrap();
    assert_eq!(chain.nonce_of(&wallet_addr, 0), 1);
}

// ============ Snapshot round trip ============

#[test]
fn test_snapshot_round_trip_preserves_state() {
    let (alice_key, alice, genesis) = funded_genesis(1);
    let bob = crate::generators::address(2);
    let chain = Chain::from_blocks(vec![genesis.clone()]);
    let b1 = seal_block(&genesis, vec![transfer(&alice_key, &bob, 25, 0)], &alice);
    chain.try_extend(&b1).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    chain.save(&path).unwrap();

    let restored = Chain::load(&path).unwrap();
    Chain::verify_full(&restored.blocks(), &genesis).unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(restored.balance_of(&bob), BigInt::from(25));
    assert_eq!(restored.nonce_of(&alice, 0), 1);

    // The snapshot is readable JSON with the block list at the top.
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"blocks\""));
}
