/// Per-transaction state, keyed by `tx_id`. See spec.md §4.5.
///
/// `Unseen` is never stored; a transaction exists in the mempool only once
/// it has moved past it. Terminal states (`Sealed`, `Dropped`, `Rejected`)
/// are not retained either — reaching one removes the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Voting,
    AwaitingTally,
    Decided,
}
