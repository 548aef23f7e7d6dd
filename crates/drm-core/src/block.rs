use drm_crypto::sha256_bytes;
use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

/// One entry in the ledger: an ordered container of transactions with a
/// cryptographic link to its parent. Mirrors spec.md §3 field-for-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub prev_hash: String,
    pub hash: String,
    pub validator_id: u32,
}

impl Block {
    pub fn genesis(timestamp: u64) -> Self {
        let mut block = Self {
            index: 0,
            timestamp,
            transactions: Vec::new(),
            prev_hash: String::new(),
            hash: String::new(),
            validator_id: 0,
        };
        block.hash = block.compute_hash();
        block
    }

    pub fn new(prev: &Block, transactions: Vec<Transaction>, validator_id: u32, timestamp: u64) -> Self {
        let mut block = Self {
            index: prev.index + 1,
            timestamp,
            transactions,
            prev_hash: prev.hash.clone(),
            hash: String::new(),
            validator_id,
        };
        block.hash = block.compute_hash();
        block
    }

    /// `sha256(index_ascii || timestamp_ascii || serialize(transactions) ||
    /// prev_hash || validator_id)`, hex-encoded. See spec.md §4.4.
    pub fn compute_hash(&self) -> String {
        let mut data = Vec::new();
        data.extend_from_slice(self.index.to_string().as_bytes());
        data.extend_from_slice(self.timestamp.to_string().as_bytes());
        data.extend_from_slice(
            &serde_json::to_vec(&self.transactions).unwrap_or_default(),
        );
        data.extend_from_slice(self.prev_hash.as_bytes());
        data.extend_from_slice(self.validator_id.to_string().as_bytes());
        hex::encode(sha256_bytes(&data))
    }

    pub fn is_hash_valid(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// `prev.hash == self.prev_hash` and `self.index == prev.index + 1`.
    pub fn links_to(&self, prev: &Block) -> bool {
        self.prev_hash == prev.hash && self.index == prev.index + 1
    }
}
