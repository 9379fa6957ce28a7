//! Wire messages of the block topic.

use crate::bus::Topic;
use crate::error::SyncResult;
use galena_chain::{Block, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Discriminant of a [`BlockMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockMessageKind {
    /// A freshly mined block.
    #[serde(rename = "BLOCK")]
    Block,
    /// Request for history from a given index.
    #[serde(rename = "REQ")]
    Req,
    /// Reply carrying a full block sequence.
    #[serde(rename = "RESP")]
    Resp,
}

/// Envelope of every frame on the block topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockMessage {
    /// Message discriminant.
    #[serde(rename = "type")]
    pub kind: BlockMessageKind,
    /// Payload of BLOCK (exactly one) and RESP (the full sequence).
    #[serde(default)]
    pub blocks: Option<Vec<Block>>,
    /// Payload of REQ: the requester's tail index.
    #[serde(default)]
    pub idx: Option<u64>,
}

impl BlockMessage {
    /// Announce a single block.
    pub fn block(block: Block) -> Self {
        Self {
            kind: BlockMessageKind::Block,
            blocks: Some(vec![block]),
            idx: None,
        }
    }

    /// Request history; `idx` is the requester's tail index.
    pub fn request(idx: u64) -> Self {
        Self {
            kind: BlockMessageKind::Req,
            blocks: None,
            idx: Some(idx),
        }
    }

    /// Answer a request with the full local sequence.
    pub fn response(blocks: Vec<Block>) -> Self {
        Self {
            kind: BlockMessageKind::Resp,
            blocks: Some(blocks),
            idx: None,
        }
    }

    /// JSON encode.
    pub fn encode(&self) -> SyncResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// JSON decode.
    pub fn decode(data: &[u8]) -> SyncResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Wrap a block in a BLOCK message and publish it.
pub fn publish_block(topic: &Topic, block: &Block) -> SyncResult<()> {
    let data = BlockMessage::block(block.clone()).encode()?;
    topic.publish(data)?;
    debug!(
        index = block.index,
        miner = %block.miner,
        hash = %hex::encode(&block.hash),
        "block published"
    );
    Ok(())
}

/// Publish a transaction's canonical encoding on the tx topic.
pub fn publish_transaction(topic: &Topic, tx: &Transaction) -> SyncResult<()> {
    let data = tx.canonical_bytes()?;
    topic.publish(data)?;
    debug!(from = %tx.from, to = %tx.to, amount = %tx.amount, "transaction published");
    Ok(())
}
