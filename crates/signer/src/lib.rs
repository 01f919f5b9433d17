//! Ed25519 keypairs, signing, and verification.
//!
//! Public keys are serialized as a Base64 SubjectPublicKeyInfo (SPKI) blob:
//! the fixed 12-byte DER prefix for an unparameterized Ed25519
//! `AlgorithmIdentifier` (RFC 8410) followed by the 32 raw public-key bytes.
//! `verify` never panics — malformed base64, a malformed SPKI blob, or a
//! wrong-length signature are verification failures, not errors.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand_core::OsRng;
use thiserror::Error;

/// `302a300506032b6570032100` — SEQUENCE { SEQUENCE { OID ed25519 }, BIT STRING }
/// with the BIT STRING header already included, leaving exactly 32 bytes for
/// the raw public key.
const SPKI_PREFIX: [u8; 12] = [0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00];
const SPKI_LEN: usize = SPKI_PREFIX.len() + 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("public key blob is not valid base64")]
    InvalidBase64,
    #[error("public key blob has length {0}, expected {SPKI_LEN}")]
    WrongSpkiLength(usize),
    #[error("public key blob does not carry the Ed25519 SPKI prefix")]
    WrongSpkiPrefix,
    #[error("SPKI bytes are not a valid Ed25519 public key")]
    InvalidPublicKey,
    #[error("key seed must be exactly 64 lowercase hex characters")]
    InvalidSeed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn to_base64_spki(&self) -> String {
        let mut blob = Vec::with_capacity(SPKI_LEN);
        blob.extend_from_slice(&SPKI_PREFIX);
        blob.extend_from_slice(self.0.as_bytes());
        BASE64.encode(blob)
    }

    pub fn from_base64_spki(s: &str) -> Result<Self, SignerError> {
        let blob = BASE64.decode(s.as_bytes()).map_err(|_| SignerError::InvalidBase64)?;
        if blob.len() != SPKI_LEN {
            return Err(SignerError::WrongSpkiLength(blob.len()));
        }
        if blob[..SPKI_PREFIX.len()] != SPKI_PREFIX {
            return Err(SignerError::WrongSpkiPrefix);
        }
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&blob[SPKI_PREFIX.len()..]);
        let vk = VerifyingKey::from_bytes(&raw).map_err(|_| SignerError::InvalidPublicKey)?;
        Ok(PublicKey(vk))
    }

    /// `SHA-256(base64_spki_bytes)`, lowercase hex — the node's fingerprint.
    pub fn node_id(&self) -> hashing::Digest {
        hashing::sha256(self.to_base64_spki().as_bytes())
    }

    pub fn node_id_hex(&self) -> String {
        hashing::to_hex(&self.node_id())
    }

    /// Verify `signature_base64` over `message`. Never panics; any structural
    /// problem with the signature is a `false` result.
    pub fn verify(&self, message: &[u8], signature_base64: &str) -> bool {
        let Ok(sig_bytes) = BASE64.decode(signature_base64.as_bytes()) else { return false };
        let Ok(sig_array): Result<[u8; 64], _> = sig_bytes.try_into() else { return false };
        let signature = Signature::from_bytes(&sig_array);
        self.0.verify(message, &signature).is_ok()
    }
}

pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Keypair { signing_key: SigningKey::generate(&mut OsRng) }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Keypair { signing_key: SigningKey::from_bytes(seed) }
    }

    /// The 32-byte seed, as lowercase hex, for persisting to a key file.
    pub fn to_seed_hex(&self) -> String {
        hashing::to_hex(&self.signing_key.to_bytes())
    }

    pub fn from_seed_hex(s: &str) -> Result<Self, SignerError> {
        let seed = hashing::from_hex(s).map_err(|_| SignerError::InvalidSeed)?;
        Ok(Keypair::from_seed(&seed))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key())
    }

    /// Sign `message`, returning the raw-Base64 signature (64 bytes decoded).
    pub fn sign(&self, message: &[u8]) -> String {
        let sig: Signature = self.signing_key.sign(message);
        BASE64.encode(sig.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_roundtrip() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"hello truthcrawl");
        assert!(kp.public_key().verify(b"hello truthcrawl", &sig));
    }

    #[test]
    fn verify_rejects_wrong_message() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"hello");
        assert!(!kp.public_key().verify(b"goodbye", &sig));
    }

    #[test]
    fn verify_rejects_garbage_signature() {
        let kp = Keypair::generate();
        assert!(!kp.public_key().verify(b"hello", "not-base64!!"));
        assert!(!kp.public_key().verify(b"hello", "aGVsbG8="));
    }

    #[test]
    fn spki_roundtrip_and_node_id_stable() {
        let kp = Keypair::generate();
        let pk = kp.public_key();
        let blob = pk.to_base64_spki();
        let decoded = PublicKey::from_base64_spki(&blob).unwrap();
        assert_eq!(pk.node_id(), decoded.node_id());
    }

    #[test]
    fn from_base64_spki_rejects_wrong_length() {
        let short = BASE64.encode([0u8; 10]);
        assert_eq!(PublicKey::from_base64_spki(&short), Err(SignerError::WrongSpkiLength(10)));
    }

    #[test]
    fn seed_hex_round_trips() {
        let kp = Keypair::generate();
        let seed_hex = kp.to_seed_hex();
        let restored = Keypair::from_seed_hex(&seed_hex).unwrap();
        assert_eq!(kp.public_key().to_base64_spki(), restored.public_key().to_base64_spki());
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [7u8; 32];
        let a = Keypair::from_seed(&seed);
        let b = Keypair::from_seed(&seed);
        assert_eq!(a.public_key().to_base64_spki(), b.public_key().to_base64_spki());
    }
}
