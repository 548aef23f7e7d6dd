use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use drm_core::{Block, BlockchainError, Ledger, Transaction};
use tracing::{debug, info, warn};

use crate::mempool::Mempool;
use crate::proposer::elect_proposer;
use crate::state::TxState;
use crate::tally::{TallyOutcome, VoteTally, APPROVAL_THRESHOLD, VALIDATOR_COUNT};
use crate::validation::validate;
use crate::vote::VoteMsg;

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

/// Outcome of recording a vote against the local tally.
pub enum VoteResult {
    /// Fewer than five votes are in.
    Pending,
    /// This validator sealed a block for the transaction.
    SealedLocally(Block),
    /// Confirmed, but another validator is the proposer; the transaction
    /// is dropped from the mempool to await the `block_update` gossip.
    AwaitingBlockFromProposer,
    /// The tally failed to reach the approval threshold.
    Rejected,
}

/// One validator's view of consensus: its own id, key material stays in
/// `drm-wallet` and is passed in per call, the mempool, the vote tally,
/// and a ledger replica. Five validators per process is canonical
/// (spec.md §4.5); `validator_count` is carried explicitly rather than
/// hardcoded so tests can exercise smaller populations.
pub struct ValidatorEngine {
    pub id: u32,
    validator_count: u32,
    ledger: Arc<Ledger>,
    mempool: Mempool,
    tally: VoteTally,
}

impl ValidatorEngine {
    pub fn new(id: u32, ledger: Arc<Ledger>) -> Self {
        Self {
            id,
            validator_count: VALIDATOR_COUNT,
            ledger,
            mempool: Mempool::new(),
            tally: VoteTally::new(),
        }
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// A transaction arrives over gossip (or locally). If it is new and
    /// passes `validate`, this validator's own vote is returned for the
    /// caller to broadcast and record against the shared tally.
    pub async fn receive_transaction(&self, tx: Transaction) -> Option<VoteMsg> {
        if self.mempool.contains(&tx.tx_id).await {
            return None;
        }
        self.mempool.insert(tx.clone(), TxState::Voting).await;

        if !validate(&tx, &self.ledger).await {
            self.mempool.remove(&tx.tx_id).await;
            debug!(tx_id = %tx.tx_id, "transaction failed validation, no vote cast");
            return None;
        }

        self.mempool.set_state(&tx.tx_id, TxState::AwaitingTally).await;
        Some(VoteMsg {
            tx_id: tx.tx_id,
            validator_id: self.id,
            timestamp: now(),
            approved: true,
        })
    }

    /// Record a vote (possibly this validator's own) and act on the tally
    /// once complete.
    pub async fn record_vote(&self, vote: &VoteMsg) -> VoteResult {
        if !self.mempool.contains(&vote.tx_id).await {
            return VoteResult::Pending;
        }

        match self.tally.record(&vote.tx_id, vote.validator_id, vote.approved).await {
            TallyOutcome::Pending => VoteResult::Pending,
            TallyOutcome::Complete { approvals } => {
                self.mempool.set_state(&vote.tx_id, TxState::Decided).await;
                self.tally.clear(&vote.tx_id).await;

                if approvals < APPROVAL_THRESHOLD {
                    self.mempool.remove(&vote.tx_id).await;
                    return VoteResult::Rejected;
                }

                let Some(mut tx) = self.mempool.remove(&vote.tx_id).await else {
                    let err = BlockchainError::TransactionNotFound { tx_id: vote.tx_id.clone() };
                    warn!(tx_id = %vote.tx_id, error = %err, "tallied transaction vanished from the mempool");
                    return VoteResult::Pending;
                };

                let proposer = elect_proposer(&tx.tx_id, self.validator_count);
                if proposer != self.id {
                    return VoteResult::AwaitingBlockFromProposer;
                }

                tx.is_validated = true;
                tx.validator_id = self.id;
                let block = self.ledger.append(tx).await;
                info!(index = block.index, hash = %block.hash, validator = self.id, "sealed block");
                VoteResult::SealedLocally(block)
            }
        }
    }

    /// Extend the local ledger with a block sealed by another validator.
    pub async fn accept_block(&self, block: Block) -> bool {
        for tx in &block.transactions {
            self.mempool.remove(&tx.tx_id).await;
        }
        self.ledger.accept_remote_block(block).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drm_core::TxType;
    use drm_crypto::KeyPair;
    use std::sync::Arc;

    fn signed_upload(owner: &KeyPair, asset_hash: &str, nonce: u64) -> Transaction {
        let mut tx = Transaction::new(
            owner.identity(),
            asset_hash.to_string(),
            "view".to_string(),
            serde_json::json!({}),
            TxType::Upload,
            nonce,
            now(),
            0,
            String::new(),
        );
        let sig = owner.sign_digest(&tx.signing_digest());
        tx.sign(sig);
        tx
    }

    fn signed_purchase(owner: &KeyPair, buyer: &KeyPair, asset_hash: &str, nonce: u64) -> Transaction {
        let mut tx = Transaction::new(
            owner.identity(),
            asset_hash.to_string(),
            "view".to_string(),
            serde_json::json!({}),
            TxType::Purchase,
            nonce,
            now(),
            0,
            buyer.identity(),
        );
        let sig = buyer.sign_digest(&tx.signing_digest());
        tx.sign(sig);
        tx
    }

    async fn fresh_ledger() -> (tempfile::TempDir, Arc<Ledger>) {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(drm_storage::KvStore::open(dir.path()).unwrap());
        (dir, Arc::new(Ledger::new(kv).unwrap()))
    }

    /// Drives one transaction through a full 5-validator round: every
    /// engine votes, the elected proposer seals, and the other four
    /// accept the sealed block as if it arrived over `block_update` gossip.
    async fn run_round(engines: &[ValidatorEngine], tx: Transaction) {
        let proposer = elect_proposer(&tx.tx_id, engines.len() as u32);

        let mut votes = Vec::new();
        for engine in engines {
            if let Some(vote) = engine.receive_transaction(tx.clone()).await {
                votes.push(vote);
            }
        }

        let mut sealed_block = None;
        for engine in engines {
            for vote in &votes {
                if let VoteResult::SealedLocally(block) = engine.record_vote(vote).await {
                    sealed_block = Some(block);
                }
            }
        }

        if let Some(block) = sealed_block {
            for engine in engines {
                if engine.id != proposer {
                    engine.accept_block(block.clone()).await;
                }
            }
        }
    }

    /// Simulates a 5-validator quorum over an in-process mempool + ledger,
    /// one per validator, without a real gossip transport (spec.md §8 S2).
    #[tokio::test]
    async fn five_validator_quorum_seals_exactly_once() {
        let owner = KeyPair::generate();
        let tx = signed_upload(&owner, "Qm12345abcdef", 1);

        let mut dirs = Vec::new();
        let mut engines = Vec::new();
        for id in 0..5u32 {
            let (dir, ledger) = fresh_ledger().await;
            dirs.push(dir);
            engines.push(ValidatorEngine::new(id, ledger));
        }

        let mut votes = Vec::new();
        for engine in &engines {
            let vote = engine.receive_transaction(tx.clone()).await;
            votes.push(vote.expect("honest transaction should pass validation"));
        }

        let proposer = elect_proposer(&tx.tx_id, 5);
        let mut sealed_count = 0;
        for engine in &engines {
            for vote in &votes {
                match engine.record_vote(vote).await {
                    VoteResult::SealedLocally(_) => sealed_count += 1,
                    _ => {}
                }
            }
        }

        assert_eq!(sealed_count, 1, "exactly one validator seals the block");
        assert_eq!(
            engines[proposer as usize].ledger.len().await,
            2,
            "the proposer's own ledger is extended"
        );
    }

    /// Purchase after upload (spec.md §8 S4): a distinct keypair signs a
    /// purchase transaction naming the original owner's asset, and every
    /// validator's replica ends up granting that buyer a valid license.
    #[tokio::test]
    async fn purchase_after_upload_grants_the_buyer_a_valid_license() {
        let owner = KeyPair::generate();
        let buyer = KeyPair::generate();
        let asset_hash = "Qm12345abcdef";

        let mut dirs = Vec::new();
        let mut engines = Vec::new();
        for id in 0..5u32 {
            let (dir, ledger) = fresh_ledger().await;
            dirs.push(dir);
            engines.push(ValidatorEngine::new(id, ledger));
        }

        run_round(&engines, signed_upload(&owner, asset_hash, 1)).await;
        run_round(&engines, signed_purchase(&owner, &buyer, asset_hash, 2)).await;

        for engine in &engines {
            assert!(
                engine.ledger.has_valid_license(asset_hash, &buyer.identity()).await,
                "every validator replica should grant the buyer a license"
            );
        }
    }
}
