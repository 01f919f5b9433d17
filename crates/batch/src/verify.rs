//! `BatchVerifier` and `ChainVerifier`: recompute-and-compare, accumulating
//! every mismatch rather than short-circuiting on the first one, so callers
//! see the full failure picture (spec §7 propagation policy).

use hashing::Digest;

use crate::chain::{BatchMetadata, ChainLink};
use crate::manifest::BatchManifest;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct VerifyResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn ok() -> Self {
        VerifyResult { valid: true, errors: Vec::new() }
    }

    fn from_errors(errors: Vec<String>) -> Self {
        VerifyResult { valid: errors.is_empty(), errors }
    }
}

/// Common surface of `BatchMetadata` and `ChainLink` needed to verify a
/// published batch against its manifest.
pub trait BatchArtifact {
    fn merkle_root(&self) -> Digest;
    fn manifest_hash(&self) -> Digest;
    fn record_count(&self) -> u64;
    fn signing_input(&self) -> Vec<u8>;
}

impl BatchArtifact for BatchMetadata {
    fn merkle_root(&self) -> Digest {
        self.merkle_root
    }
    fn manifest_hash(&self) -> Digest {
        self.manifest_hash
    }
    fn record_count(&self) -> u64 {
        self.record_count
    }
    fn signing_input(&self) -> Vec<u8> {
        BatchMetadata::signing_input(self)
    }
}

impl BatchArtifact for ChainLink {
    fn merkle_root(&self) -> Digest {
        self.merkle_root
    }
    fn manifest_hash(&self) -> Digest {
        self.manifest_hash
    }
    fn record_count(&self) -> u64 {
        self.record_count
    }
    fn signing_input(&self) -> Vec<u8> {
        ChainLink::signing_input(self)
    }
}

/// Recompute `manifest_hash`, `merkle_root`, and `record_count` from
/// `manifest` and verify `signature` over `artifact`'s signing input. Every
/// check runs regardless of earlier failures.
pub fn verify_batch<A: BatchArtifact>(
    artifact: &A,
    manifest: &BatchManifest,
    signature: &str,
    publisher: &signer::PublicKey,
) -> VerifyResult {
    let mut errors = Vec::new();

    let computed_manifest_hash = manifest.manifest_hash();
    if computed_manifest_hash != artifact.manifest_hash() {
        errors.push(format!(
            "manifest_hash mismatch: expected {}, computed {}",
            hashing::to_hex(&artifact.manifest_hash()),
            hashing::to_hex(&computed_manifest_hash)
        ));
    }

    match merkle::compute_root(manifest.hashes()) {
        Ok(computed_root) if computed_root != artifact.merkle_root() => {
            errors.push(format!(
                "merkle_root mismatch: expected {}, computed {}",
                hashing::to_hex(&artifact.merkle_root()),
                hashing::to_hex(&computed_root)
            ));
        }
        Ok(_) => {}
        Err(e) => errors.push(format!("could not compute merkle root: {e}")),
    }

    if manifest.size() as u64 != artifact.record_count() {
        errors.push(format!(
            "record_count mismatch: expected {}, manifest has {}",
            artifact.record_count(),
            manifest.size()
        ));
    }

    if !publisher.verify(&artifact.signing_input(), signature) {
        errors.push("publisher signature is invalid".to_string());
    }

    if errors.is_empty() {
        tracing::debug!(record_count = manifest.size(), "batch verified clean");
        VerifyResult::ok()
    } else {
        tracing::warn!(error_count = errors.len(), "batch verification failed");
        VerifyResult::from_errors(errors)
    }
}

/// Verify genesis, link-to-link continuity, and every per-link signature.
/// A length mismatch between `links` and `signatures` fails fast (it cannot
/// even be meaningfully paired up); every other check accumulates.
pub fn verify_chain(links: &[ChainLink], signatures: &[String], publisher: &signer::PublicKey) -> VerifyResult {
    if links.len() != signatures.len() {
        return VerifyResult::from_errors(vec![format!(
            "links length {} does not match signatures length {}",
            links.len(),
            signatures.len()
        )]);
    }
    if links.is_empty() {
        return VerifyResult::from_errors(vec!["chain is empty".to_string()]);
    }

    let mut errors = Vec::new();

    if !links[0].is_genesis() {
        errors.push("link 0 is not the genesis link".to_string());
    }
    for i in 1..links.len() {
        if links[i].previous_root != links[i - 1].merkle_root {
            errors.push(format!("link {i} previous_root does not match link {}'s merkle_root", i - 1));
        }
    }
    for (i, (link, signature)) in links.iter().zip(signatures.iter()).enumerate() {
        if !publisher.verify(&link.signing_input(), signature) {
            errors.push(format!("link {i} signature is invalid"));
        }
    }

    VerifyResult::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BatchManifest;

    #[test]
    fn verify_batch_all_checks_accumulate() {
        let kp = signer::Keypair::generate();
        let manifest = BatchManifest::new(vec![hashing::sha256(b"r1"), hashing::sha256(b"r2")]).unwrap();
        let metadata = BatchMetadata::new("2024-01-15", [9u8; 32], [9u8; 32], 99).unwrap();
        let bad_signature = "not-a-real-signature";
        let result = verify_batch(&metadata, &manifest, bad_signature, &kp.public_key());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 4, "manifest_hash, merkle_root, record_count, signature");
    }

    #[test]
    fn verify_batch_clean() {
        let kp = signer::Keypair::generate();
        let manifest = BatchManifest::new(vec![hashing::sha256(b"r1"), hashing::sha256(b"r2")]).unwrap();
        let root = merkle::compute_root(manifest.hashes()).unwrap();
        let metadata = BatchMetadata::new("2024-01-15", root, manifest.manifest_hash(), manifest.size() as u64).unwrap();
        let signature = kp.sign(&metadata.signing_input());
        let result = verify_batch(&metadata, &manifest, &signature, &kp.public_key());
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn verify_chain_length_mismatch_fails_fast() {
        let kp = signer::Keypair::generate();
        let link = ChainLink::genesis("2024-01-15", [1u8; 32], [2u8; 32], 1).unwrap();
        let result = verify_chain(&[link], &[], &kp.public_key());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn verify_chain_accumulates_genesis_continuity_and_signature() {
        let kp = signer::Keypair::generate();
        let bad_first = ChainLink::new("2024-01-15", [1u8; 32], [2u8; 32], 1, [7u8; 32]).unwrap();
        let bad_second = ChainLink::new("2024-01-16", [3u8; 32], [4u8; 32], 1, [99u8; 32]).unwrap();
        let sigs = vec!["bad1".to_string(), "bad2".to_string()];
        let result = verify_chain(&[bad_first, bad_second], &sigs, &kp.public_key());
        assert!(!result.valid);
        // not-genesis + broken-link + 2 bad signatures
        assert_eq!(result.errors.len(), 4);
    }
}
