use drm_consensus::VoteMsg;
use drm_core::{Block, Transaction};
use serde_json::Value;

/// A decoded gossip message. See spec.md §6.
#[derive(Debug, Clone)]
pub enum Envelope {
    Transaction(Transaction),
    Vote(VoteMsg),
    BlockUpdate(Block),
    PeerDiscovery { peer_id: String, addresses: Vec<String> },
}

impl Envelope {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Envelope::Transaction(tx) => serde_json::to_vec(tx),
            Envelope::Vote(vote) => serde_json::to_vec(vote),
            Envelope::BlockUpdate(block) => {
                serde_json::to_vec(&serde_json::json!({ "type": "block_update", "block": block }))
            }
            Envelope::PeerDiscovery { peer_id, addresses } => serde_json::to_vec(&serde_json::json!({
                "type": "peer_discovery",
                "peer_id": peer_id,
                "addresses": addresses,
            })),
        }
    }

    /// Try the `type` discriminator first, then fall back to shape-sniffing
    /// in the documented order: block_update, transaction, vote. A message
    /// that matches neither is `None` and the caller logs and skips it.
    pub fn decode(bytes: &[u8]) -> Option<Envelope> {
        let value: Value = serde_json::from_slice(bytes).ok()?;

        if let Some(type_field) = value.get("type").and_then(Value::as_str) {
            return match type_field {
                "block_update" => {
                    let block: Block = serde_json::from_value(value.get("block")?.clone()).ok()?;
                    Some(Envelope::BlockUpdate(block))
                }
                "peer_discovery" => {
                    let peer_id = value.get("peer_id")?.as_str()?.to_string();
                    let addresses = value
                        .get("addresses")?
                        .as_array()?
                        .iter()
                        .filter_map(|a| a.as_str().map(str::to_string))
                        .collect();
                    Some(Envelope::PeerDiscovery { peer_id, addresses })
                }
                _ => None,
            };
        }

        if let Ok(block) = serde_json::from_value::<Block>(value.clone()) {
            return Some(Envelope::BlockUpdate(block));
        }
        if let Ok(tx) = serde_json::from_value::<Transaction>(value.clone()) {
            return Some(Envelope::Transaction(tx));
        }
        if let Ok(vote) = serde_json::from_value::<VoteMsg>(value) {
            return Some(Envelope::Vote(vote));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drm_core::TxType;
    use drm_crypto::KeyPair;

    #[test]
    fn roundtrips_a_transaction() {
        let kp = KeyPair::generate();
        let tx = Transaction::new(
            kp.identity(),
            "Qm1".to_string(),
            "view".to_string(),
            serde_json::json!({}),
            TxType::Upload,
            1,
            0,
            0,
            String::new(),
        );
        let encoded = Envelope::Transaction(tx.clone()).encode().unwrap();
        match Envelope::decode(&encoded) {
            Some(Envelope::Transaction(decoded)) => assert_eq!(decoded.tx_id, tx.tx_id),
            other => panic!("expected a transaction envelope, got {other:?}"),
        }
    }

    #[test]
    fn roundtrips_a_vote() {
        let vote = VoteMsg {
            tx_id: "abc".to_string(),
            validator_id: 2,
            timestamp: 1700,
            approved: true,
        };
        let encoded = serde_json::to_vec(&vote).unwrap();
        match Envelope::decode(&encoded) {
            Some(Envelope::Vote(decoded)) => assert_eq!(decoded, vote),
            other => panic!("expected a vote envelope, got {other:?}"),
        }
    }

    #[test]
    fn roundtrips_a_block_update() {
        let block = Block::genesis(0);
        let encoded = Envelope::BlockUpdate(block.clone()).encode().unwrap();
        match Envelope::decode(&encoded) {
            Some(Envelope::BlockUpdate(decoded)) => assert_eq!(decoded, block),
            other => panic!("expected a block update envelope, got {other:?}"),
        }
    }

    #[test]
    fn garbage_decodes_to_none() {
        assert!(Envelope::decode(b"not json").is_none());
        assert!(Envelope::decode(b"{}").is_none());
    }
}
