//! # galena-sync
//!
//! Gossip reconciliation for the Galena node.
//!
//! This crate provides:
//! - The pub/sub seam the core consumes (two named topics, publish and
//!   subscribe with sender identity)
//! - The BLOCK / REQ / RESP wire messages of the block topic
//! - The two long-lived ingest loops feeding the mempool and the chain
//! - Rate-limited chain requests for catch-up after sync gaps

mod bus;
mod error;
mod handler;
mod message;

pub use bus::{Frame, GossipHub, PeerId, Topic, BLOCK_TOPIC, TX_TOPIC};
pub use error::{SyncError, SyncResult};
pub use handler::{SyncHandler, REQUEST_COOLDOWN};
pub use message::{publish_block, publish_transaction, BlockMessage, BlockMessageKind};
