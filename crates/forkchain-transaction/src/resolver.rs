//! Lookup of the outputs that inputs spend.
//!
//! Verification and signing need the amount and locking script of every
//! spent output. Where they come from (a node, an indexer, a local
//! database) is up to the caller, who passes a [`UtxoResolver`] to the
//! operations that need one. Retry and timeout policy belong in the
//! resolver.

use std::collections::HashMap;

use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Source of previous outputs, keyed by display-order txid and index.
pub trait UtxoResolver {
    /// Fetch output `index` of transaction `prev_tx_id`.
    ///
    /// # Returns
    /// The output, or an error (conventionally `MissingUtxoData`) when it
    /// is unknown or unreachable.
    fn resolve(&self, prev_tx_id: &[u8; 32], index: u32) -> Result<TransactionOutput, TransactionError>;
}

/// An in-memory resolver backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    outputs: HashMap<([u8; 32], u32), TransactionOutput>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        MemoryResolver::default()
    }

    /// Register a single output.
    pub fn insert(&mut self, prev_tx_id: [u8; 32], index: u32, output: TransactionOutput) {
        self.outputs.insert((prev_tx_id, index), output);
    }

    /// Register every output of a known transaction under its id.
    pub fn insert_transaction(&mut self, tx: &Transaction) {
        let id = tx.id();
        for (index, output) in tx.outputs.iter().enumerate() {
            self.outputs.insert((id, index as u32), output.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl UtxoResolver for MemoryResolver {
    fn resolve(&self, prev_tx_id: &[u8; 32], index: u32) -> Result<TransactionOutput, TransactionError> {
        self.outputs.get(&(*prev_tx_id, index)).cloned().ok_or_else(|| {
            TransactionError::MissingUtxoData(format!("{}:{} not found", hex::encode(prev_tx_id), index))
        })
    }
}
