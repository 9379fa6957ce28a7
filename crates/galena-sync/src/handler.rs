//! The sync handler: gossip ingest and chain repair.
//!
//! Two long-lived loops, one per topic. The transaction loop feeds the
//! mempool after validation against the chain; the block loop drives chain
//! extension and, on sync gaps, the REQ/RESP catch-up exchange. Lock order
//! across the shared state is fixed Mempool → Chain and no code path holds
//! both locks at once; the loops call into each component in sequence.

use crate::bus::{Frame, PeerId, Topic};
use crate::error::{SyncError, SyncResult};
use crate::message::{BlockMessage, BlockMessageKind};
use galena_chain::{Adoption, Block, Chain, Transaction};
use galena_mempool::Mempool;
use num_bigint::BigInt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Minimum spacing between chain requests for the same index.
pub const REQUEST_COOLDOWN: Duration = Duration::from_secs(5);

/// Ingests gossip frames and reconciles the local chain with peers.
pub struct SyncHandler {
    chain: Arc<Chain>,
    mempool: Arc<Mempool>,
    tx_topic: Topic,
    block_topic: Topic,
    local_peer: PeerId,
    recent_requests: Mutex<HashMap<u64, Instant>>,
}

impl SyncHandler {
    /// Create a handler over shared chain and mempool handles.
    pub fn new(
        chain: Arc<Chain>,
        mempool: Arc<Mempool>,
        tx_topic: Topic,
        block_topic: Topic,
    ) -> Arc<Self> {
        let local_peer = block_topic.local_peer().clone();
        Arc::new(Self {
            chain,
            mempool,
            tx_topic,
            block_topic,
            local_peer,
            recent_requests: Mutex::new(HashMap::new()),
        })
    }

    /// Spawn both ingest loops. Each exits at its next suspension point
    /// after `shutdown` fires.
    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> (JoinHandle<()>, JoinHandle<()>) {
        let tx_loop = {
            let handler = Arc::clone(self);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { handler.run_tx_loop(shutdown).await })
        };
        let block_loop = {
            let handler = Arc::clone(self);
            tokio::spawn(async move { handler.run_block_loop(shutdown).await })
        };
        (tx_loop, block_loop)
    }

    /// Transaction ingest loop.
    pub async fn run_tx_loop(self: Arc<Self>, shutdown: CancellationToken) {
        let mut sub = self.tx_topic.subscribe();
        info!("transaction ingest loop started");

        loop {
            let frame = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = sub.recv() => match received {
                    Ok(frame) => frame,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "transaction subscription lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            // Own frames are not filtered: the local publisher relies on
            // this loop for its own mempool admission, and the
            // signature-keyed pool makes redelivery idempotent.
            self.handle_tx_frame(frame);
        }

        debug!("transaction ingest loop stopped");
    }

    fn handle_tx_frame(&self, frame: Frame) {
        let tx: Transaction = match serde_json::from_slice(&frame.data) {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, "invalid tx: failed to decode");
                return;
            }
        };

        if let Err(e) = tx.verify_signature() {
            warn!(error = %e, "invalid tx: signature verification failed");
            return;
        }

        if self.chain.is_initialized() {
            let required = BigInt::from(&tx.amount + &tx.price);
            let available = self.chain.balance_of(&tx.from);
            if available < required {
                warn!(
                    from = %tx.from,
                    required = %required,
                    available = %available,
                    "invalid tx: insufficient balance"
                );
                return;
            }
        }

        if self.mempool.add(tx.clone()) {
            info!(
                from = %tx.from,
                to = %tx.to,
                amount = %tx.amount,
                "transaction admitted to mempool"
            );
        } else {
            debug!("transaction already in mempool, skipping");
        }
    }

    /// Block ingest loop.
    pub async fn run_block_loop(self: Arc<Self>, shutdown: CancellationToken) {
        let mut sub = self.block_topic.subscribe();
        info!("block ingest loop started");

        loop {
            let frame = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = sub.recv() => match received {
                    Ok(frame) => frame,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "block subscription lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            if frame.from == self.local_peer {
                debug!("ignoring own block frame");
                continue;
            }

            let msg = match BlockMessage::decode(&frame.data) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(error = %e, "invalid block message");
                    continue;
                }
            };

            match msg.kind {
                BlockMessageKind::Block => self.handle_block(msg),
                BlockMessageKind::Req => self.handle_request(msg),
                BlockMessageKind::Resp => self.handle_response(msg),
            }
        }

        debug!("block ingest loop stopped");
    }

    fn handle_block(&self, msg: BlockMessage) {
        let Some(block) = msg.blocks.and_then(|mut blocks| {
            if blocks.is_empty() {
                None
            } else {
                Some(blocks.remove(0))
            }
        }) else {
            warn!("BLOCK message without payload");
            return;
        };

        if !self.chain.is_initialized() {
            debug!(index = block.index, "ignoring block before genesis");
            return;
        }

        info!(
            index = block.index,
            miner = %block.miner,
            hash = %hex::encode(&block.hash),
            "received block"
        );

        match self.chain.try_extend(&block) {
            Ok(()) => {
                for tx in &block.transactions {
                    self.mempool.remove(tx);
                }
            }
            Err(e) => {
                warn!(index = block.index, error = %e, "incoming block rejected");
                self.recover_from_gap(&block);
            }
        }
    }

    /// A rejected block that is ahead of our tip signals a sync gap: stash
    /// it for hash lookups and ask the network for history.
    fn recover_from_gap(&self, block: &Block) {
        let tip_index = match self.chain.tip() {
            Some(tip) => tip.index,
            None => return,
        };

        if block.index > tip_index {
            self.chain.stash_pending(block);
            if let Err(e) = self.request_chain() {
                warn!(error = %e, "chain request failed");
            }
        }
    }

    fn handle_request(&self, msg: BlockMessage) {
        let Some(idx) = msg.idx else {
            warn!("REQ message without index");
            return;
        };

        if !self.chain.is_initialized() {
            debug!(idx, "ignoring chain request before genesis");
            return;
        }

        let len = self.chain.len() as u64;
        if idx >= len {
            // The requester is at least as advanced as we are; we need
            // catch-up too.
            debug!(idx, len, "chain request beyond our tip");
            if let Err(e) = self.request_chain() {
                warn!(error = %e, "chain request failed");
            }
            return;
        }

        // Replies always carry the whole sequence.
        let blocks = self.chain.blocks();
        info!(idx, tip = len - 1, "answering chain request with full sequence");

        match BlockMessage::response(blocks).encode() {
            Ok(data) => {
                if let Err(e) = self.block_topic.publish(data) {
                    warn!(error = %e, "failed to publish chain response");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode chain response"),
        }
    }

    fn handle_response(&self, msg: BlockMessage) {
        let Some(blocks) = msg.blocks.filter(|blocks| !blocks.is_empty()) else {
            warn!("received empty block response");
            return;
        };

        if !self.chain.is_initialized() {
            debug!("ignoring chain response before genesis");
            return;
        }

        match self.chain.adopt_if_longer(blocks) {
            Ok(Adoption::Adopted { tip }) => {
                info!(tip, "chain replaced from peer response");
            }
            Ok(Adoption::Ignored { offered, local }) => {
                debug!(offered, local, "chain response not ahead of local tip");
            }
            Err(e) => warn!(error = %e, "chain response rejected"),
        }
    }

    /// Publish a REQ carrying our tail index, rate-limited per index.
    pub fn request_chain(&self) -> SyncResult<()> {
        let tip = self.chain.tip().ok_or(SyncError::NotInitialized)?;

        if !self.should_request(tip.index) {
            debug!(idx = tip.index, "chain request suppressed by cooldown");
            return Ok(());
        }

        let data = BlockMessage::request(tip.index).encode()?;
        self.block_topic.publish(data)?;
        info!(idx = tip.index, "chain request published");
        Ok(())
    }

    fn should_request(&self, idx: u64) -> bool {
        let mut recent = self.recent_requests.lock();
        if let Some(at) = recent.get(&idx) {
            if at.elapsed() < REQUEST_COOLDOWN {
                return false;
            }
        }
        recent.insert(idx, Instant::now());
        true
    }
}
