use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use drm_crypto::Identity;
use drm_storage::KvStore;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::block::Block;
use crate::error::{BlockchainError, Result};
use crate::transaction::{Transaction, TxType};

const LATEST_BLOCK_KEY: &[u8] = b"latest-block";

fn block_key(hash: &str) -> Vec<u8> {
    format!("block-{hash}").into_bytes()
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

/// In-memory view of confirmed state, rebuilt by replaying the chain.
/// Guarded by the same lock as the block sequence itself: the spec forbids
/// acquiring the registry lock while holding the ledger lock, which this
/// trivially satisfies by not having a second lock at all.
#[derive(Default)]
struct ChainState {
    blocks: Vec<Block>,
    confirmed_nonces: HashMap<Identity, u64>,
    licenses: HashMap<String, Vec<Transaction>>,
}

impl ChainState {
    fn record_confirmed(&mut self, tx: &Transaction) {
        let entry = self.confirmed_nonces.entry(tx.owner.clone()).or_insert(0);
        if tx.nonce > *entry {
            *entry = tx.nonce;
        }
        self.licenses
            .entry(tx.asset_hash.clone())
            .or_default()
            .push(tx.clone());
    }

    fn replay(&mut self) {
        self.confirmed_nonces.clear();
        self.licenses.clear();
        for block in &self.blocks {
            for tx in &block.transactions {
                let entry = self.confirmed_nonces.entry(tx.owner.clone()).or_insert(0);
                if tx.nonce > *entry {
                    *entry = tx.nonce;
                }
                self.licenses
                    .entry(tx.asset_hash.clone())
                    .or_default()
                    .push(tx.clone());
            }
        }
    }
}

/// The hash-linked chain plus its persistence. See spec.md §4.4.
pub struct Ledger {
    kv: Arc<KvStore>,
    state: Mutex<ChainState>,
}

impl Ledger {
    /// Load the chain from `kv` by walking backward from `latest-block`,
    /// or synthesise a genesis block if no chain exists yet.
    pub fn new(kv: Arc<KvStore>) -> Result<Self> {
        let mut blocks = match kv.load(LATEST_BLOCK_KEY)? {
            Some(tip_hash_bytes) => {
                let mut hash = String::from_utf8_lossy(&tip_hash_bytes).to_string();
                let mut collected = Vec::new();
                loop {
                    let raw = kv.load(&block_key(&hash))?.ok_or_else(|| BlockchainError::InvalidChain {
                        reason: format!("missing block for hash {hash} while walking prev_hash links"),
                    })?;
                    let block: Block = serde_json::from_slice(&raw)?;
                    let prev_hash = block.prev_hash.clone();
                    collected.push(block);
                    if prev_hash.is_empty() {
                        break;
                    }
                    hash = prev_hash;
                }
                collected.reverse();
                collected
            }
            None => {
                let genesis = Block::genesis(current_timestamp());
                Self::persist_block(&kv, &genesis);
                vec![genesis]
            }
        };

        blocks.sort_by_key(|b| b.index);
        let mut state = ChainState {
            blocks,
            confirmed_nonces: HashMap::new(),
            licenses: HashMap::new(),
        };
        state.replay();

        Ok(Self {
            kv,
            state: Mutex::new(state),
        })
    }

    /// `block-<hash>` then `latest-block`. The two writes are not
    /// transactional; a crash between them leaves a dangling orphan block
    /// that the next `new` call simply never reaches (spec.md §4.4).
    fn persist_block(kv: &KvStore, block: &Block) {
        let Ok(bytes) = serde_json::to_vec(block) else {
            warn!(hash = %block.hash, "failed to serialize block for persistence");
            return;
        };
        if let Err(e) = kv.save(&block_key(&block.hash), &bytes) {
            warn!(hash = %block.hash, error = %e, "failed to persist block");
            return;
        }
        if let Err(e) = kv.save(LATEST_BLOCK_KEY, block.hash.as_bytes()) {
            warn!(hash = %block.hash, error = %e, "failed to advance latest-block pointer");
        }
    }

    async fn persist_tx_index(&self, tx: &Transaction) {
        if tx.tx_type != TxType::Upload {
            return;
        }
        match tx.serialize() {
            Ok(bytes) => {
                if let Err(e) = self.kv.save(tx.asset_hash.as_bytes(), &bytes) {
                    warn!(asset = %tx.asset_hash, error = %e, "failed to index upload transaction");
                }
            }
            Err(e) => warn!(asset = %tx.asset_hash, error = %e, "failed to serialize upload transaction"),
        }
    }

    /// Append a confirmed transaction as a new block on the current tip.
    /// Called only by the validator elected as proposer.
    pub async fn append(&self, tx: Transaction) -> Block {
        let mut state = self.state.lock().await;
        let tip = state.blocks.last().expect("chain always has a genesis block");
        let block = Block::new(tip, vec![tx.clone()], tx.validator_id, current_timestamp());

        Self::persist_block(&self.kv, &block);
        state.blocks.push(block.clone());
        state.record_confirmed(&tx);
        drop(state);

        self.persist_tx_index(&tx).await;
        debug!(index = block.index, hash = %block.hash, "appended block");
        block
    }

    /// Accept a block formed by another validator. Rewrites `prev_hash` to
    /// this node's own tip and recomputes `hash` — see spec.md §4.4 and
    /// Open Question 3 in SPEC_FULL.md: this trades global content
    /// addressing for liveness, by design.
    ///
    /// Returns `true` if the block was appended, `false` if it was a
    /// duplicate or malformed and was dropped.
    pub async fn accept_remote_block(&self, mut block: Block) -> bool {
        let mut state = self.state.lock().await;

        if state.blocks.iter().any(|b| b.hash == block.hash) {
            debug!(hash = %block.hash, "dropping duplicate remote block");
            return false;
        }
        if let Some(tx) = block.transactions.iter().find(|tx| !tx.verify()) {
            let err = BlockchainError::InvalidBlock {
                reason: format!("transaction {} carries an invalid signature", tx.tx_id),
            };
            warn!(hash = %block.hash, error = %err, "dropping remote block");
            return false;
        }

        let tip = state.blocks.last().expect("chain always has a genesis block");
        block.prev_hash = tip.hash.clone();
        block.index = tip.index + 1;
        block.hash = block.compute_hash();

        Self::persist_block(&self.kv, &block);
        for tx in &block.transactions {
            state.record_confirmed(tx);
        }
        state.blocks.push(block.clone());
        drop(state);

        self.persist_tx_index(
            block
                .transactions
                .first()
                .expect("sealed blocks carry at least one transaction"),
        )
        .await;
        true
    }

    pub async fn tip(&self) -> Block {
        self.state
            .lock()
            .await
            .blocks
            .last()
            .expect("chain always has a genesis block")
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.blocks.len()
    }

    pub async fn blocks(&self) -> Vec<Block> {
        self.state.lock().await.blocks.clone()
    }

    pub async fn last_confirmed_nonce(&self, owner: &Identity) -> Option<u64> {
        self.state.lock().await.confirmed_nonces.get(owner).copied()
    }

    pub async fn asset_exists(&self, asset_hash: &str) -> bool {
        self.state
            .lock()
            .await
            .licenses
            .get(asset_hash)
            .map(|txs| txs.iter().any(|t| t.tx_type == TxType::Upload))
            .unwrap_or(false)
    }

    /// True if `identity` is the asset's original owner, or holds a
    /// confirmed purchase that has not expired.
    pub async fn has_valid_license(&self, asset_hash: &str, identity: &Identity) -> bool {
        let state = self.state.lock().await;
        let Some(txs) = state.licenses.get(asset_hash) else {
            return false;
        };
        let now = current_timestamp();
        txs.iter().any(|tx| match tx.tx_type {
            TxType::Upload => &tx.owner == identity,
            TxType::Purchase => {
                &tx.licensee == identity && (tx.expiry == 0 || tx.expiry > now)
            }
        })
    }

    /// The original upload transaction for `asset_hash`, if one exists.
    pub async fn find_upload(&self, asset_hash: &str) -> Option<Transaction> {
        self.state
            .lock()
            .await
            .licenses
            .get(asset_hash)
            .and_then(|txs| txs.iter().find(|t| t.tx_type == TxType::Upload).cloned())
    }
}
