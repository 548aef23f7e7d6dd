use std::collections::HashMap;

use drm_core::{Transaction, TxId};
use tokio::sync::RwLock;

use crate::state::TxState;

struct Entry {
    tx: Transaction,
    state: TxState,
}

/// Pending transactions a validator is currently voting on, keyed by
/// `tx_id`. Guarded by a single exclusive lock per spec.md §5.
#[derive(Default)]
pub struct Mempool {
    entries: RwLock<HashMap<TxId, Entry>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, tx_id: &str) -> bool {
        self.entries.read().await.contains_key(tx_id)
    }

    pub async fn insert(&self, tx: Transaction, state: TxState) {
        let mut entries = self.entries.write().await;
        entries.entry(tx.tx_id.clone()).or_insert(Entry { tx, state });
    }

    pub async fn set_state(&self, tx_id: &str, state: TxState) {
        if let Some(entry) = self.entries.write().await.get_mut(tx_id) {
            entry.state = state;
        }
    }

    pub async fn get(&self, tx_id: &str) -> Option<Transaction> {
        self.entries.read().await.get(tx_id).map(|e| e.tx.clone())
    }

    /// Remove the entry, e.g. on a terminal state transition.
    pub async fn remove(&self, tx_id: &str) -> Option<Transaction> {
        self.entries.write().await.remove(tx_id).map(|e| e.tx)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drm_core::TxType;

    fn sample_tx() -> Transaction {
        Transaction::new(
            "owner".to_string(),
            "Qm1".to_string(),
            "view".to_string(),
            serde_json::json!({}),
            TxType::Upload,
            1,
            0,
            0,
            String::new(),
        )
    }

    #[tokio::test]
    async fn insert_is_idempotent_on_tx_id() {
        let mempool = Mempool::new();
        let tx = sample_tx();
        mempool.insert(tx.clone(), TxState::Voting).await;
        mempool.insert(tx.clone(), TxState::AwaitingTally).await;
        assert_eq!(mempool.len().await, 1);
    }

    #[tokio::test]
    async fn remove_drops_the_entry() {
        let mempool = Mempool::new();
        let tx = sample_tx();
        mempool.insert(tx.clone(), TxState::Voting).await;
        assert!(mempool.remove(&tx.tx_id).await.is_some());
        assert!(!mempool.contains(&tx.tx_id).await);
    }
}
