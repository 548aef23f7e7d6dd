use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::EncodedPoint;
use rand_core::OsRng;

use crate::{CryptoError, Result};

/// Hex-encoded public identity: `hex(X) || hex(Y)`, each coordinate a
/// fixed 32 bytes. This is the `owner` / `licensee` wire representation.
pub type Identity = String;

/// A P-256 key pair: mints an `Identity` and signs transaction digests.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Rebuild a key pair from the raw 32-byte scalar, as unsealed from the
    /// wallet's key directory.
    pub fn from_scalar_bytes(bytes: &[u8]) -> Result<Self> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    pub fn to_scalar_bytes(&self) -> Vec<u8> {
        self.signing_key.to_bytes().to_vec()
    }

    /// The hex(X) || hex(Y) public identity for this key pair.
    pub fn identity(&self) -> Identity {
        encode_identity(self.signing_key.verifying_key())
    }

    pub fn sign_digest(&self, digest: &[u8; 32]) -> String {
        sign_digest(self, digest)
    }
}

fn encode_identity(verifying_key: &VerifyingKey) -> Identity {
    let point = verifying_key.to_encoded_point(false);
    // uncompressed point is tag || X(32) || Y(32); the sec1 accessors strip the tag.
    let x = point.x().expect("uncompressed point carries x");
    let y = point.y().expect("uncompressed point carries y");
    format!("{}{}", hex::encode(x), hex::encode(y))
}

fn decode_identity(identity: &str) -> Result<VerifyingKey> {
    if identity.len() != 128 {
        return Err(CryptoError::InvalidKey(format!(
            "expected a 64-byte (128 hex char) identity, got {} chars",
            identity.len()
        )));
    }
    let raw = hex::decode(identity).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    let (x, y) = raw.split_at(32);
    let encoded = EncodedPoint::from_affine_coordinates(x.into(), y.into(), false);
    Option::<VerifyingKey>::from(VerifyingKey::from_encoded_point(&encoded))
        .ok_or_else(|| CryptoError::InvalidKey("point not on curve".into()))
}

/// Sign a 32-byte digest, producing `hex(pad32(r) || pad32(s))`. The
/// `ecdsa` crate's fixed-width scalar encoding pads for us — see Open
/// Question 1 in SPEC_FULL.md.
pub fn sign_digest(key_pair: &KeyPair, digest: &[u8; 32]) -> String {
    let signature: Signature = key_pair
        .signing_key
        .sign_prehash(digest)
        .expect("P-256 prehash signing over a 32-byte digest cannot fail");
    hex::encode(signature.to_bytes())
}

/// Verify `signature_hex` over `digest` under the public `identity`.
pub fn verify_digest(identity: &Identity, digest: &[u8; 32], signature_hex: &str) -> bool {
    let Ok(verifying_key) = decode_identity(identity) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    verifying_key.verify_prehash(digest, &signature).is_ok()
}
