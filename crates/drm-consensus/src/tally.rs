use std::collections::HashMap;

use drm_core::TxId;
use tokio::sync::RwLock;

pub const VALIDATOR_COUNT: u32 = 5;
pub const APPROVAL_THRESHOLD: u32 = 4;

/// `tx_id -> (validator_id -> approved)`. Keyed on the pair so a validator
/// can cast at most one vote per transaction; redelivery is idempotent.
#[derive(Default)]
pub struct VoteTally {
    votes: RwLock<HashMap<TxId, HashMap<u32, bool>>>,
}

pub enum TallyOutcome {
    /// Fewer than `VALIDATOR_COUNT` votes recorded so far.
    Pending,
    /// All votes are in; `approvals` of them were approvals.
    Complete { approvals: u32 },
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote. Returns the tally state for `tx_id` after recording.
    /// A repeat vote from the same validator for the same transaction is
    /// ignored (first vote wins).
    pub async fn record(&self, tx_id: &str, validator_id: u32, approved: bool) -> TallyOutcome {
        let mut votes = self.votes.write().await;
        let entry = votes.entry(tx_id.to_string()).or_default();
        entry.entry(validator_id).or_insert(approved);

        if entry.len() as u32 >= VALIDATOR_COUNT {
            let approvals = entry.values().filter(|v| **v).count() as u32;
            TallyOutcome::Complete { approvals }
        } else {
            TallyOutcome::Pending
        }
    }

    pub async fn clear(&self, tx_id: &str) {
        self.votes.write().await.remove(tx_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stays_pending_until_all_votes_are_in() {
        let tally = VoteTally::new();
        for validator_id in 0..4 {
            match tally.record("tx1", validator_id, true).await {
                TallyOutcome::Pending => {}
                TallyOutcome::Complete { .. } => panic!("completed too early"),
            }
        }
    }

    #[tokio::test]
    async fn completes_on_the_fifth_vote() {
        let tally = VoteTally::new();
        for validator_id in 0..4 {
            tally.record("tx1", validator_id, true).await;
        }
        match tally.record("tx1", 4, false).await {
            TallyOutcome::Complete { approvals } => assert_eq!(approvals, 4),
            TallyOutcome::Pending => panic!("expected completion on the fifth vote"),
        }
    }

    #[tokio::test]
    async fn repeat_vote_from_same_validator_does_not_double_count() {
        let tally = VoteTally::new();
        tally.record("tx1", 0, true).await;
        tally.record("tx1", 0, false).await; // should be ignored
        for validator_id in 1..4 {
            tally.record("tx1", validator_id, true).await;
        }
        match tally.record("tx1", 4, true).await {
            TallyOutcome::Complete { approvals } => assert_eq!(approvals, 5),
            TallyOutcome::Pending => panic!("expected completion"),
        }
    }
}
