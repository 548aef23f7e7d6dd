use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use drm_core::{Ledger, Transaction, TxType};
use drm_network::{Envelope, GossipNode, TRANSACTIONS_TOPIC};
use drm_storage::KvStore;
use drm_wallet::Wallet;

use crate::content_store::{ContentStore, IpfsContentStore};

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

fn open_ledger(data_dir: &Path) -> Result<Arc<Ledger>> {
    let kv = Arc::new(KvStore::open(data_dir).context("failed to open data directory")?);
    Ok(Arc::new(Ledger::new(kv)?))
}

/// Publish a transaction and give the gossip mesh a moment to form before
/// the short-lived client process exits, mirroring the original CLI's
/// `time.Sleep` after broadcasting.
async fn broadcast(tx: &Transaction) -> Result<()> {
    let node = GossipNode::new(TRANSACTIONS_TOPIC, false)?;
    let encoded = Envelope::Transaction(tx.clone()).encode()?;
    node.publish(TRANSACTIONS_TOPIC, encoded);
    tokio::time::sleep(Duration::from_secs(2)).await;
    Ok(())
}

pub async fn upload(data_dir: &Path, key_dir: &Path, file: &Path, license: &str) -> Result<()> {
    let wallet = Wallet::load_or_create(key_dir)?;
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let store = IpfsContentStore::local();
    let asset_hash = store.put(bytes).await?;
    println!("file uploaded to content store, cid: {asset_hash}");

    let mut tx = Transaction::new(
        wallet.identity(),
        asset_hash.clone(),
        license.to_string(),
        serde_json::json!({}),
        TxType::Upload,
        1,
        now(),
        0,
        String::new(),
    );
    let sig = wallet.sign_digest(&tx.signing_digest());
    tx.sign(sig);

    println!("broadcasting upload transaction {} for asset {asset_hash}", tx.tx_id);
    broadcast(&tx).await?;

    let _ = data_dir; // local ledger is extended asynchronously by the validator swarm
    println!("upload broadcast complete, awaiting validator confirmation");
    Ok(())
}

pub async fn purchase(data_dir: &Path, key_dir: &Path, asset: &str) -> Result<()> {
    let wallet = Wallet::load_or_create(key_dir)?;
    let ledger = open_ledger(data_dir)?;
    let original = ledger
        .find_upload(asset)
        .await
        .context("asset not found on the local ledger")?;

    let mut tx = Transaction::new(
        original.owner.clone(),
        asset.to_string(),
        original.license_kind.clone(),
        original.metadata.clone(),
        TxType::Purchase,
        original.nonce + 1,
        now(),
        0,
        wallet.identity(),
    );
    let sig = wallet.sign_digest(&tx.signing_digest());
    tx.sign(sig);

    println!("broadcasting purchase transaction {} for asset {asset}", tx.tx_id);
    broadcast(&tx).await?;
    println!("purchase broadcast complete, awaiting validator confirmation");
    Ok(())
}

pub async fn access(data_dir: &Path, key_dir: &Path, asset: &str) -> Result<()> {
    let wallet = Wallet::load_or_create(key_dir)?;
    let ledger = open_ledger(data_dir)?;

    if !ledger.has_valid_license(asset, &wallet.identity()).await {
        bail!("no valid license for asset {asset}");
    }

    let store = IpfsContentStore::local();
    println!("license verified for asset {asset}");
    println!("{}", store.gateway_url(asset));
    Ok(())
}

pub async fn list_assets(data_dir: &Path) -> Result<()> {
    let ledger = open_ledger(data_dir)?;
    let mut seen = std::collections::HashSet::new();
    for block in ledger.blocks().await.into_iter().rev() {
        for tx in block.transactions {
            if tx.tx_type == TxType::Upload && seen.insert(tx.asset_hash.clone()) {
                print_asset(&tx);
            }
        }
    }
    Ok(())
}

pub async fn my_assets(data_dir: &Path, key_dir: &Path) -> Result<()> {
    let wallet = Wallet::load_or_create(key_dir)?;
    let me = wallet.identity();
    let ledger = open_ledger(data_dir)?;
    let mut seen = std::collections::HashSet::new();
    for block in ledger.blocks().await.into_iter().rev() {
        for tx in block.transactions {
            let mine = tx.owner == me || tx.licensee == me;
            if mine && seen.insert(tx.asset_hash.clone()) {
                print_asset(&tx);
            }
        }
    }
    Ok(())
}

fn print_asset(tx: &Transaction) {
    println!("asset {} — license: {}, owner: {}", tx.asset_hash, tx.license_kind, tx.owner);
}

pub async fn blockchain(data_dir: &Path, verbose: bool) -> Result<()> {
    let ledger = open_ledger(data_dir)?;
    let blocks = ledger.blocks().await;
    println!("blockchain status — {} blocks", blocks.len());
    for block in &blocks {
        println!();
        println!("block #{}", block.index);
        println!("  hash: {}", block.hash);
        println!("  prev: {}", block.prev_hash);
        println!("  transactions: {}", block.transactions.len());
        if verbose {
            for tx in &block.transactions {
                println!("    [{}] owner: {}", tx.tx_id, tx.owner);
                println!("        asset: {}", tx.asset_hash);
                println!("        license: {}", tx.license_kind);
            }
        }
    }
    Ok(())
}

/// Default validator replica directories, as named by spec.md §6.
pub fn validator_dir(id: u32) -> PathBuf {
    PathBuf::from("./validator").join(format!("validator_{id}"))
}
