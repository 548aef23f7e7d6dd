use drm_core::{BlockchainError, Ledger, Transaction, TxType};
use tracing::debug;

fn reject(tx: &Transaction, reason: impl Into<String>) -> bool {
    let err = BlockchainError::InvalidTransaction { reason: reason.into() };
    debug!(tx_id = %tx.tx_id, error = %err, "rejecting transaction, no vote cast");
    false
}

/// `validate(tx)` per spec.md §4.5: non-empty `owner`/`asset_hash`, a
/// verifying signature, a nonce strictly ahead of the owner's last
/// confirmed nonce, and the asset-existence rule for the transaction's
/// type. No negative vote is cast on failure — the caller simply never
/// enters `voting`.
pub async fn validate(tx: &Transaction, ledger: &Ledger) -> bool {
    if tx.owner.is_empty() || tx.asset_hash.is_empty() {
        return reject(tx, "owner or asset_hash is empty");
    }
    if !tx.verify() {
        return reject(tx, "signature does not verify against the submitting identity");
    }
    if let Some(last) = ledger.last_confirmed_nonce(&tx.owner).await {
        if tx.nonce <= last {
            return reject(tx, format!("nonce {} is not ahead of last confirmed {last}", tx.nonce));
        }
    }
    let asset_exists = ledger.asset_exists(&tx.asset_hash).await;
    match tx.tx_type {
        TxType::Upload if asset_exists => reject(tx, "asset already uploaded"),
        TxType::Purchase if !asset_exists => reject(tx, "asset was never uploaded"),
        TxType::Upload | TxType::Purchase => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drm_crypto::KeyPair;
    use std::sync::Arc;

    fn upload(owner: &KeyPair, asset_hash: &str, nonce: u64) -> Transaction {
        let mut tx = Transaction::new(
            owner.identity(),
            asset_hash.to_string(),
            "view".to_string(),
            serde_json::json!({}),
            TxType::Upload,
            nonce,
            0,
            0,
            String::new(),
        );
        let sig = owner.sign_digest(&tx.signing_digest());
        tx.sign(sig);
        tx
    }

    fn purchase(owner: &KeyPair, buyer: &KeyPair, asset_hash: &str, nonce: u64) -> Transaction {
        let mut tx = Transaction::new(
            owner.identity(),
            asset_hash.to_string(),
            "view".to_string(),
            serde_json::json!({}),
            TxType::Purchase,
            nonce,
            0,
            0,
            buyer.identity(),
        );
        let sig = buyer.sign_digest(&tx.signing_digest());
        tx.sign(sig);
        tx
    }

    async fn fresh_ledger() -> (tempfile::TempDir, Ledger) {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(drm_storage::KvStore::open(dir.path()).unwrap());
        (dir, Ledger::new(kv).unwrap())
    }

    #[tokio::test]
    async fn rejects_unsigned_transaction() {
        let (_dir, ledger) = fresh_ledger().await;
        let owner = KeyPair::generate();
        let tx = upload(&owner, "Qm1", 1);
        // wipe the signature to simulate an invalid one
        let mut bad = tx;
        bad.sign("00".repeat(64));
        assert!(!validate(&bad, &ledger).await);
    }

    #[tokio::test]
    async fn accepts_first_upload_for_a_fresh_asset() {
        let (_dir, ledger) = fresh_ledger().await;
        let owner = KeyPair::generate();
        let tx = upload(&owner, "Qm1", 1);
        assert!(validate(&tx, &ledger).await);
    }

    #[tokio::test]
    async fn rejects_nonce_not_ahead_of_confirmed() {
        let (_dir, ledger) = fresh_ledger().await;
        let owner = KeyPair::generate();
        let first = upload(&owner, "Qm1", 1);
        ledger.append(first).await;

        let replay = upload(&owner, "Qm2", 1);
        assert!(!validate(&replay, &ledger).await);
    }

    #[tokio::test]
    async fn accepts_purchase_signed_by_the_buyer_of_an_uploaded_asset() {
        let (_dir, ledger) = fresh_ledger().await;
        let owner = KeyPair::generate();
        let buyer = KeyPair::generate();
        ledger.append(upload(&owner, "Qm1", 1)).await;

        let tx = purchase(&owner, &buyer, "Qm1", 2);
        assert!(validate(&tx, &ledger).await);
    }

    #[tokio::test]
    async fn rejects_purchase_of_an_asset_that_was_never_uploaded() {
        let (_dir, ledger) = fresh_ledger().await;
        let owner = KeyPair::generate();
        let buyer = KeyPair::generate();

        let tx = purchase(&owner, &buyer, "Qm1", 1);
        assert!(!validate(&tx, &ledger).await);
    }
}
