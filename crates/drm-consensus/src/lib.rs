pub mod engine;
pub mod mempool;
pub mod proposer;
pub mod state;
pub mod tally;
pub mod validation;
pub mod vote;

pub use engine::{ValidatorEngine, VoteResult};
pub use mempool::Mempool;
pub use proposer::{elect_proposer, fnv1a_32};
pub use state::TxState;
pub use tally::{TallyOutcome, VoteTally, APPROVAL_THRESHOLD, VALIDATOR_COUNT};
pub use validation::validate;
pub use vote::VoteMsg;
