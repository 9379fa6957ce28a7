//! Transaction pool implementation.

use galena_chain::Transaction;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Pending transactions keyed by signature bytes.
///
/// One guard serializes mutation; read-only queries take the shared side.
/// Admission is idempotent: re-adding a known signature is a no-op.
pub struct Mempool {
    pool: RwLock<HashMap<Vec<u8>, Transaction>>,
}

impl Mempool {
    /// An empty pool.
    pub fn new() -> Self {
        Self {
            pool: RwLock::new(HashMap::new()),
        }
    }

    /// Admit a transaction. Returns false when the signature is already
    /// present or the transaction carries none (coinbase rewards never
    /// enter the pool).
    pub fn add(&self, tx: Transaction) -> bool {
        let Some(key) = tx.signature.clone() else {
            debug!(from = %tx.from, "refusing unsigned transaction");
            return false;
        };

        let mut pool = self.pool.write();
        if pool.contains_key(&key) {
            return false;
        }
        pool.insert(key, tx);
        true
    }

    /// Drop a transaction, keyed by its signature.
    pub fn remove(&self, tx: &Transaction) {
        if let Some(key) = tx.signature.as_ref() {
            self.pool.write().remove(key);
        }
    }

    /// Whether the transaction's signature is present.
    pub fn contains(&self, tx: &Transaction) -> bool {
        match tx.signature.as_ref() {
            Some(key) => self.pool.read().contains_key(key),
            None => false,
        }
    }

    /// Take up to `count` transactions ordered by price descending.
    ///
    /// The selected transactions leave the pool; they are the candidates
    /// for the next block body.
    pub fn pick_top(&self, count: usize) -> Vec<Transaction> {
        let mut pool = self.pool.write();

        let mut txs: Vec<Transaction> = pool.values().cloned().collect();
        txs.sort_by(|a, b| b.price.cmp(&a.price));
        txs.truncate(count);

        for tx in &txs {
            if let Some(key) = tx.signature.as_ref() {
                pool.remove(key);
            }
        }

        txs
    }

    /// Count of pending transactions sent by `address`; the nonce offset
    /// beyond what the chain has absorbed.
    pub fn pending_from(&self, address: &str) -> usize {
        self.pool
            .read()
            .values()
            .filter(|tx| tx.from == address)
            .count()
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.pool.read().len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.pool.read().is_empty()
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}
