//! Node wiring and lifecycle.

use crate::config::{NodeConfig, NodeMode};
use crate::shell::Session;
use anyhow::Result;
use galena_chain::Chain;
use galena_mempool::Mempool;
use galena_mining::Miner;
use galena_sync::{GossipHub, PeerId, SyncHandler, Topic};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The assembled node: shared components plus the shutdown context every
/// long-lived task observes.
pub struct Node {
    config: NodeConfig,
    peer_id: PeerId,
    /// The transport seam. In-process until a real transport joins it.
    _hub: GossipHub,
    chain: Arc<Chain>,
    mempool: Arc<Mempool>,
    miner: Arc<Miner>,
    handler: Arc<SyncHandler>,
    tx_topic: Topic,
    block_topic: Topic,
    shutdown: CancellationToken,
}

impl Node {
    /// Wire up the node components.
    pub fn new(config: NodeConfig) -> Arc<Self> {
        let peer_id = PeerId::random();
        let hub = GossipHub::new();
        let (tx_topic, block_topic) = hub.join(peer_id.clone());

        let chain = Arc::new(Chain::new());
        let mempool = Arc::new(Mempool::new());
        let miner = Arc::new(Miner::new(Arc::clone(&chain), Arc::clone(&mempool)));
        let handler = SyncHandler::new(
            Arc::clone(&chain),
            Arc::clone(&mempool),
            tx_topic.clone(),
            block_topic.clone(),
        );

        Arc::new(Self {
            config,
            peer_id,
            _hub: hub,
            chain,
            mempool,
            miner,
            handler,
            tx_topic,
            block_topic,
            shutdown: CancellationToken::new(),
        })
    }

    /// Run until the shell exits or a shutdown signal arrives.
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        let (tx_loop, block_loop) = self.handler.spawn(self.shutdown.clone());
        info!(peer = %self.peer_id, mode = %self.config.mode, "node started");

        if self.config.mode == NodeMode::Boot {
            // Boot nodes serve discovery only: no chain, no shell.
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown signal received");
        } else {
            let mut session = Session::new(Arc::clone(self));
            tokio::select! {
                result = session.run() => result?,
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                }
            }
        }

        // Cancel the shared context; loops exit at their next suspension
        // and an in-flight nonce search abandons.
        self.shutdown.cancel();
        self.miner.cancel_flag().store(true, Ordering::SeqCst);
        let _ = tx_loop.await;
        let _ = block_loop.await;

        info!("node stopped");
        Ok(())
    }

    /// Node configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Local peer identity.
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Shared chain handle.
    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    /// Shared mempool handle.
    pub fn mempool(&self) -> &Arc<Mempool> {
        &self.mempool
    }

    /// Shared miner handle.
    pub fn miner(&self) -> &Arc<Miner> {
        &self.miner
    }

    /// Sync handler handle.
    pub fn handler(&self) -> &Arc<SyncHandler> {
        &self.handler
    }

    /// Transaction topic handle.
    pub fn tx_topic(&self) -> &Topic {
        &self.tx_topic
    }

    /// Block topic handle.
    pub fn block_topic(&self) -> &Topic {
        &self.block_topic
    }
}
