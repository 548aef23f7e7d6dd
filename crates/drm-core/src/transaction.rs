use drm_crypto::{sha256_bytes, verify_digest, Identity};
use serde::{Deserialize, Serialize};

use crate::error::{BlockchainError, Result};

/// Identifier of a transaction: hex SHA-256 digest over its canonical fields.
pub type TxId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Upload,
    Purchase,
}

impl TxType {
    fn as_ascii(&self) -> &'static str {
        match self {
            TxType::Upload => "upload",
            TxType::Purchase => "purchase",
        }
    }
}

/// A record proposing a ledger entry: an asset upload or a license
/// purchase. Mirrors spec.md §3 field-for-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: TxId,
    pub owner: Identity,
    pub asset_hash: String,
    pub license_kind: String,
    pub metadata: serde_json::Value,
    pub signature: String,
    pub validator_id: u32,
    pub timestamp: u64,
    pub expiry: u64,
    pub licensee: Identity,
    pub is_validated: bool,
    pub nonce: u64,
    pub tx_type: TxType,
}

impl Transaction {
    /// Build an unsigned transaction, computing its deterministic `tx_id`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: Identity,
        asset_hash: String,
        license_kind: String,
        metadata: serde_json::Value,
        tx_type: TxType,
        nonce: u64,
        timestamp: u64,
        expiry: u64,
        licensee: Identity,
    ) -> Self {
        let tx_id = generate_tx_id(&owner, &asset_hash, &license_kind, tx_type, nonce, timestamp);
        Self {
            tx_id,
            owner,
            asset_hash,
            license_kind,
            metadata,
            signature: String::new(),
            validator_id: 0,
            timestamp,
            expiry,
            licensee,
            is_validated: false,
            nonce,
            tx_type,
        }
    }

    /// The digest signed over and verified against: `owner || asset_hash ||
    /// license_kind || tx_id || timestamp_ascii`, SHA-256'd.
    pub fn signing_digest(&self) -> [u8; 32] {
        let mut data = Vec::new();
        data.extend_from_slice(self.owner.as_bytes());
        data.extend_from_slice(self.asset_hash.as_bytes());
        data.extend_from_slice(self.license_kind.as_bytes());
        data.extend_from_slice(self.tx_id.as_bytes());
        data.extend_from_slice(self.timestamp.to_string().as_bytes());
        sha256_bytes(&data)
    }

    pub fn sign(&mut self, signature: String) {
        self.signature = signature;
    }

    /// The identity whose private key must produce `signature`: the
    /// uploader for an upload, the purchaser for a purchase (spec §9,
    /// Open Question — an upload is submitted and owned by the same
    /// identity, but a purchase is submitted by the licensee about
    /// someone else's asset).
    pub fn signer(&self) -> &str {
        match self.tx_type {
            TxType::Upload => &self.owner,
            TxType::Purchase => &self.licensee,
        }
    }

    pub fn verify(&self) -> bool {
        let signer = self.signer();
        if signer.is_empty() || self.signature.is_empty() {
            return false;
        }
        verify_digest(signer, &self.signing_digest(), &self.signature)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(BlockchainError::from)
    }
}

/// `sha256(owner || asset_hash || license_kind || tx_type_ascii ||
/// nonce_ascii || timestamp_ascii)`, hex-encoded. Open Question 2 (spec
/// §9) is resolved here by including `tx_type` and `nonce`.
pub fn generate_tx_id(
    owner: &str,
    asset_hash: &str,
    license_kind: &str,
    tx_type: TxType,
    nonce: u64,
    timestamp: u64,
) -> TxId {
    let mut data = Vec::new();
    data.extend_from_slice(owner.as_bytes());
    data.extend_from_slice(asset_hash.as_bytes());
    data.extend_from_slice(license_kind.as_bytes());
    data.extend_from_slice(tx_type.as_ascii().as_bytes());
    data.extend_from_slice(nonce.to_string().as_bytes());
    data.extend_from_slice(timestamp.to_string().as_bytes());
    hex::encode(sha256_bytes(&data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drm_crypto::KeyPair;

    fn sample(owner: Identity, nonce: u64) -> Transaction {
        Transaction::new(
            owner,
            "Qm12345abcdef".to_string(),
            "view".to_string(),
            serde_json::json!({"title": "Example"}),
            TxType::Upload,
            nonce,
            1_700_000_000,
            0,
            String::new(),
        )
    }

    #[test]
    fn tx_id_is_deterministic() {
        let kp = KeyPair::generate();
        let a = sample(kp.identity(), 1);
        let b = sample(kp.identity(), 1);
        assert_eq!(a.tx_id, b.tx_id);
    }

    #[test]
    fn tx_id_changes_with_tx_type_and_nonce() {
        let kp = KeyPair::generate();
        let upload = sample(kp.identity(), 1);
        let mut purchase = sample(kp.identity(), 1);
        purchase.tx_type = TxType::Purchase;
        // tx_id was computed before mutating, so recompute to compare fairly.
        let purchase_id = generate_tx_id(
            &purchase.owner,
            &purchase.asset_hash,
            &purchase.license_kind,
            TxType::Purchase,
            purchase.nonce,
            purchase.timestamp,
        );
        assert_ne!(upload.tx_id, purchase_id);

        let different_nonce = sample(kp.identity(), 2);
        assert_ne!(upload.tx_id, different_nonce.tx_id);
    }

    #[test]
    fn sign_then_verify_roundtrips() {
        let kp = KeyPair::generate();
        let mut tx = sample(kp.identity(), 1);
        let sig = kp.sign_digest(&tx.signing_digest());
        tx.sign(sig);
        assert!(tx.verify());
    }

    #[test]
    fn tampered_signature_fails_verify() {
        let kp = KeyPair::generate();
        let mut tx = sample(kp.identity(), 1);
        tx.sign("00".repeat(64));
        assert!(!tx.verify());
    }

    #[test]
    fn purchase_signed_by_licensee_verifies() {
        let owner = KeyPair::generate();
        let buyer = KeyPair::generate();
        let mut tx = Transaction::new(
            owner.identity(),
            "Qm12345abcdef".to_string(),
            "view".to_string(),
            serde_json::json!({}),
            TxType::Purchase,
            2,
            1_700_000_000,
            0,
            buyer.identity(),
        );
        let sig = buyer.sign_digest(&tx.signing_digest());
        tx.sign(sig);
        assert!(tx.verify());
    }

    #[test]
    fn purchase_signed_by_owner_fails_verify() {
        let owner = KeyPair::generate();
        let buyer = KeyPair::generate();
        let mut tx = Transaction::new(
            owner.identity(),
            "Qm12345abcdef".to_string(),
            "view".to_string(),
            serde_json::json!({}),
            TxType::Purchase,
            2,
            1_700_000_000,
            0,
            buyer.identity(),
        );
        let sig = owner.sign_digest(&tx.signing_digest());
        tx.sign(sig);
        assert!(!tx.verify());
    }
}
