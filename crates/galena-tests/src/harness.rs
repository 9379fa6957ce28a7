//! Test harness: full in-process nodes over a shared gossip hub.

use galena_chain::{Block, Chain};
use galena_mempool::Mempool;
use galena_mining::Miner;
use galena_sync::{GossipHub, PeerId, SyncHandler, Topic};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A node wired like the binary: chain, mempool, miner, and the two ingest
/// loops, joined to a shared hub under its own peer identity.
pub struct TestNode {
    /// Shared chain handle.
    pub chain: Arc<Chain>,
    /// Shared mempool handle.
    pub mempool: Arc<Mempool>,
    /// Shared miner handle.
    pub miner: Arc<Miner>,
    /// Sync handler handle.
    pub handler: Arc<SyncHandler>,
    /// The node's tx topic handle.
    pub tx_topic: Topic,
    /// The node's block topic handle.
    pub block_topic: Topic,
    shutdown: CancellationToken,
}

impl TestNode {
    /// Start a node seeded with `blocks` (empty for a pre-genesis node).
    pub fn start(hub: &GossipHub, blocks: Vec<Block>) -> Self {
        let chain = Arc::new(Chain::from_blocks(blocks));
        let mempool = Arc::new(Mempool::new());
        let miner = Arc::new(Miner::new(Arc::clone(&chain), Arc::clone(&mempool)));
        let (tx_topic, block_topic) = hub.join(PeerId::random());

        let handler = SyncHandler::new(
            Arc::clone(&chain),
            Arc::clone(&mempool),
            tx_topic.clone(),
            block_topic.clone(),
        );
        let shutdown = CancellationToken::new();
        handler.spawn(shutdown.clone());

        Self {
            chain,
            mempool,
            miner,
            handler,
            tx_topic,
            block_topic,
            shutdown,
        }
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Poll `condition` until it holds or a few seconds elapse.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Sleep long enough for in-flight frames to settle, for negative checks.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}
