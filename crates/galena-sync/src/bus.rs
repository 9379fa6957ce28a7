//! The pub/sub seam the core consumes.
//!
//! Two named topics carry JSON frames between peers. This module provides
//! the in-process realization: a broadcast hub every local "peer" joins
//! with its own identity. Subscribers receive their own publications, as a
//! gossip mesh delivers them; consumers decide whether to filter by the
//! sender id carried on each frame. A real transport implements the same
//! surface and the core never sees past it.

use crate::error::SyncResult;
use rand::RngCore;
use std::fmt;
use tokio::sync::broadcast;

/// Name of the transaction topic.
pub const TX_TOPIC: &str = "tx";

/// Name of the block topic.
pub const BLOCK_TOPIC: &str = "block";

/// Frames buffered per topic before slow subscribers start lagging.
const TOPIC_CAPACITY: usize = 256;

/// Opaque peer identity, random per process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(String);

impl PeerId {
    /// A fresh random identity.
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A frame delivered by a topic subscription.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Identity of the publisher.
    pub from: PeerId,
    /// Opaque payload bytes.
    pub data: Vec<u8>,
}

/// Handle to a topic, tagged with the local peer identity.
///
/// Cheap to clone; clones publish under the same identity.
#[derive(Debug, Clone)]
pub struct Topic {
    name: &'static str,
    local_peer: PeerId,
    sender: broadcast::Sender<Frame>,
}

impl Topic {
    /// Topic name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The identity frames published through this handle carry.
    pub fn local_peer(&self) -> &PeerId {
        &self.local_peer
    }

    /// Publish a frame. Best-effort: a frame published while nobody is
    /// subscribed is simply dropped.
    pub fn publish(&self, data: Vec<u8>) -> SyncResult<()> {
        let _ = self.sender.send(Frame {
            from: self.local_peer.clone(),
            data,
        });
        Ok(())
    }

    /// Open a subscription delivering every frame published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.sender.subscribe()
    }
}

/// In-process gossip mesh: the `tx` and `block` topics shared by every
/// joined peer.
#[derive(Debug, Clone)]
pub struct GossipHub {
    tx: broadcast::Sender<Frame>,
    block: broadcast::Sender<Frame>,
}

impl GossipHub {
    /// A mesh with empty topics.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(TOPIC_CAPACITY);
        let (block, _) = broadcast::channel(TOPIC_CAPACITY);
        Self { tx, block }
    }

    /// Join the mesh under an identity, receiving the `(tx, block)` topic
    /// handles.
    pub fn join(&self, peer: PeerId) -> (Topic, Topic) {
        (
            Topic {
                name: TX_TOPIC,
                local_peer: peer.clone(),
                sender: self.tx.clone(),
            },
            Topic {
                name: BLOCK_TOPIC,
                local_peer: peer,
                sender: self.block.clone(),
            },
        )
    }
}

impl Default for GossipHub {
    fn default() -> Self {
        Self::new()
    }
}
