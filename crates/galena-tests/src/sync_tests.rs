//! Gossip reconciliation scenario tests over the in-process mesh.

use crate::generators::{funded_genesis, seal_block, sealed_chain, transfer};
use crate::harness::{settle, wait_until, TestNode};
use galena_sync::{publish_block, publish_transaction, GossipHub};
use std::sync::Arc;

// ============ S3: transaction admission ============

#[tokio::test]
async fn test_transaction_admission_is_idempotent() {
    let hub = GossipHub::new();
    let (alice_key, _, genesis) = funded_genesis(1);
    let node = TestNode::start(&hub, vec![genesis]);

    let tx = transfer(&alice_key, &crate::generators::address(2), 10, 0);
    tx.verify_signature().unwrap();

    publish_transaction(&node.tx_topic, &tx).unwrap();
    let mempool = Arc::clone(&node.mempool);
    wait_until("first admission", move || mempool.len() == 1).await;

    // Redelivery of the same signature changes nothing.
    publish_transaction(&node.tx_topic, &tx).unwrap();
    settle().await;
    assert_eq!(node.mempool.len(), 1);
}

// ============ Block propagation ============

#[tokio::test]
async fn test_mined_block_propagates_to_peer() {
    let hub = GossipHub::new();
    let (_, address, genesis) = funded_genesis(1);
    let miner_node = TestNode::start(&hub, vec![genesis.clone()]);
    let observer = TestNode::start(&hub, vec![genesis]);

    let block = miner_node.miner.mine_next(&address).unwrap();
    miner_node.chain.try_extend(&block).unwrap();
    publish_block(&miner_node.block_topic, &block).unwrap();

    let chain = Arc::clone(&observer.chain);
    wait_until("peer extension", move || chain.len() == 2).await;
    assert!(observer
        .chain
        .tip()
        .unwrap()
        .structural_eq(&miner_node.chain.tip().unwrap()));
}

#[tokio::test]
async fn test_confirmed_transactions_evicted_from_peer_mempools() {
    let hub = GossipHub::new();
    let (alice_key, address, genesis) = funded_genesis(1);
    let node_a = TestNode::start(&hub, vec![genesis.clone()]);
    let node_b = TestNode::start(&hub, vec![genesis.clone()]);

    let tx = transfer(&alice_key, &crate::generators::address(2), 10, 0);
    publish_transaction(&node_a.tx_topic, &tx).unwrap();

    let (pool_a, pool_b) = (Arc::clone(&node_a.mempool), Arc::clone(&node_b.mempool));
    wait_until("both mempools", move || {
        pool_a.len() == 1 && pool_b.len() == 1
    })
    .await;

    // A sealed block confirming the tx evicts it wherever it is pending.
    let block = seal_block(&genesis, vec![tx.clone()], &address);
    node_a.chain.try_extend(&block).unwrap();
    publish_block(&node_a.block_topic, &block).unwrap();

    let pool_b = Arc::clone(&node_b.mempool);
    wait_until("eviction on b", move || pool_b.is_empty()).await;
    assert_eq!(node_b.chain.len(), 2);
}

// ============ S6: catch-up via REQ/RESP ============

#[tokio::test]
async fn test_catch_up_after_gap() {
    let hub = GossipHub::new();
    let (_, address, genesis) = funded_genesis(1);

    // The peer is five blocks ahead of the fresh node.
    let peer_blocks = sealed_chain(&genesis, &address, 6);
    let fresh = TestNode::start(&hub, vec![genesis.clone()]);
    let ahead = TestNode::start(&hub, peer_blocks.clone());

    // The peer announces its tip; the fresh node cannot connect it,
    // requests history, and adopts the full verified sequence.
    publish_block(&ahead.block_topic, &peer_blocks[5]).unwrap();

    let chain = Arc::clone(&fresh.chain);
    wait_until("catch-up", move || chain.len() == 6).await;
    assert!(fresh
        .chain
        .tip()
        .unwrap()
        .structural_eq(&peer_blocks[5]));
    assert_eq!(
        fresh.chain.balance_of(&address),
        ahead.chain.balance_of(&address)
    );
}

// ============ Fork policy ============

#[tokio::test]
async fn test_equal_length_competitor_is_not_adopted() {
    let hub = GossipHub::new();
    let (_, address, genesis) = funded_genesis(1);

    let local_tip = seal_block(&genesis, Vec::new(), &address);
    let node = TestNode::start(&hub, vec![genesis.clone(), local_tip.clone()]);

    // A same-length fork from another miner.
    let competitor = vec![
        genesis.clone(),
        seal_block(&genesis, Vec::new(), &crate::generators::address(2)),
    ];
    let peer = TestNode::start(&hub, competitor.clone());
    publish_block(&peer.block_topic, &competitor[1]).unwrap();

    settle().await;
    assert_eq!(node.chain.len(), 2);
    assert!(node.chain.tip().unwrap().structural_eq(&local_tip));
}

#[tokio::test]
async fn test_foreign_genesis_chain_is_rejected() {
    let hub = GossipHub::new();
    let (_, _, genesis) = funded_genesis(1);
    let (_, foreign_addr, foreign_genesis) = funded_genesis(2);

    let node = TestNode::start(&hub, vec![genesis.clone()]);
    let foreign_blocks = sealed_chain(&foreign_genesis, &foreign_addr, 4);
    let foreign = TestNode::start(&hub, foreign_blocks.clone());

    publish_block(&foreign.block_topic, &foreign_blocks[3]).unwrap();

    // The node requests history, receives the foreign chain, and keeps its
    // own state because the genesis does not match.
    settle().await;
    settle().await;
    assert_eq!(node.chain.len(), 1);
    assert!(node.chain.tip().unwrap().structural_eq(&genesis));
}
