use drm_core::TxId;
use serde::{Deserialize, Serialize};

/// Wire shape for a validator's vote: `{TxID, ValidatorID, Timestamp,
/// Approved}`. See spec.md §6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteMsg {
    #[serde(rename = "TxID")]
    pub tx_id: TxId,
    #[serde(rename = "ValidatorID")]
    pub validator_id: u32,
    #[serde(rename = "Timestamp")]
    pub timestamp: u64,
    #[serde(rename = "Approved")]
    pub approved: bool,
}
