use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use drm_consensus::{ValidatorEngine, VoteResult, VALIDATOR_COUNT};
use drm_core::Ledger;
use drm_network::{Envelope, GossipNode, TRANSACTIONS_TOPIC, VOTE_TOPIC};
use drm_storage::KvStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::commands::validator_dir;

/// Fixed delay between consumption-loop iterations, bounding CPU use in
/// the pathological spinning case (spec.md §4.5).
const PACE_DELAY: Duration = Duration::from_millis(10);

/// (a) opens the KV store and ledger, (b) starts a non-validator gossip
/// node and its block-update consumer, (c) spawns `VALIDATOR_COUNT`
/// validator tasks each with their own store/ledger/gossip node, (d)
/// awaits SIGINT/SIGTERM, cancels every task, joins them, and (e) closes
/// every KV store the tasks were using. See spec.md §4.6.
pub async fn serve(data_dir: &Path) -> Result<()> {
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal, cancelling all tasks");
            cancel.cancel();
        }
    });

    // Kept alongside (not consumed by) each `Ledger` so that, once every
    // task holding the other clone has exited, `Arc::try_unwrap` succeeds
    // and the store can be closed explicitly rather than just dropped.
    let mut stores: Vec<Arc<KvStore>> = Vec::new();

    let observer_kv = Arc::new(KvStore::open(data_dir)?);
    stores.push(observer_kv.clone());
    let observer_ledger = Arc::new(Ledger::new(observer_kv)?);
    let observer_node = GossipNode::new(TRANSACTIONS_TOPIC, false)?;

    let mut tasks: Vec<JoinHandle<()>> =
        vec![spawn_block_consumer(observer_node, observer_ledger, cancel.clone())];

    for id in 0..VALIDATOR_COUNT {
        let kv = Arc::new(KvStore::open(validator_dir(id))?);
        stores.push(kv.clone());
        let ledger = Arc::new(Ledger::new(kv)?);
        let gossip = GossipNode::new(TRANSACTIONS_TOPIC, true)?;
        let engine = Arc::new(ValidatorEngine::new(id, ledger));
        tasks.push(spawn_validator(id, engine, gossip, cancel.clone()));
    }

    for task in tasks {
        let _ = task.await;
    }

    for store in stores {
        match Arc::try_unwrap(store) {
            Ok(store) => store.close(),
            Err(_) => warn!("KV store still referenced after task join, skipping explicit close"),
        }
    }
    Ok(())
}

fn spawn_block_consumer(node: GossipNode, ledger: Arc<Ledger>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                message = node.next(TRANSACTIONS_TOPIC) => {
                    let Some(bytes) = message else { break };
                    if let Some(Envelope::BlockUpdate(block)) = Envelope::decode(&bytes) {
                        ledger.accept_remote_block(block).await;
                    }
                    tokio::time::sleep(PACE_DELAY).await;
                }
            }
        }
        info!("block-update consumer stopped");
    })
}

fn spawn_validator(
    id: u32,
    engine: Arc<ValidatorEngine>,
    gossip: GossipNode,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                message = gossip.next(TRANSACTIONS_TOPIC) => {
                    let Some(bytes) = message else { break };
                    handle_transactions_message(&engine, &gossip, &bytes).await;
                    tokio::time::sleep(PACE_DELAY).await;
                }
                message = gossip.next(VOTE_TOPIC) => {
                    let Some(bytes) = message else { break };
                    handle_vote_message(&engine, &gossip, &bytes).await;
                    tokio::time::sleep(PACE_DELAY).await;
                }
            }
        }
        info!(validator = id, "validator task stopped");
    })
}

async fn handle_transactions_message(engine: &ValidatorEngine, gossip: &GossipNode, bytes: &[u8]) {
    match Envelope::decode(bytes) {
        Some(Envelope::Transaction(tx)) => {
            if let Some(vote) = engine.receive_transaction(tx).await {
                if let Ok(encoded) = serde_json::to_vec(&vote) {
                    gossip.publish(VOTE_TOPIC, encoded);
                }
                act_on_vote_result(gossip, engine.record_vote(&vote).await).await;
            }
        }
        Some(Envelope::BlockUpdate(block)) => {
            engine.accept_block(block).await;
        }
        Some(_) => {}
        None => warn!("dropping malformed gossip message"),
    }
}

async fn handle_vote_message(engine: &ValidatorEngine, gossip: &GossipNode, bytes: &[u8]) {
    if let Some(Envelope::Vote(vote)) = Envelope::decode(bytes) {
        act_on_vote_result(gossip, engine.record_vote(&vote).await).await;
    }
}

async fn act_on_vote_result(gossip: &GossipNode, result: VoteResult) {
    if let VoteResult::SealedLocally(block) = result {
        if let Ok(encoded) = Envelope::BlockUpdate(block).encode() {
            gossip.publish(TRANSACTIONS_TOPIC, encoded);
        }
    }
}
