//! Deterministic, no-replacement sampling of manifest entries so any third
//! party can reproduce a given auditor's sample from public inputs alone.

use std::collections::BTreeSet;

use batch::BatchManifest;
use hashing::Digest;

/// `base_seed = SHA-256(hex(merkle_root) || user_seed)`; each round re-hashes
/// the base seed with a big-endian round counter, and the first 8 bytes of
/// that round hash (sign bit masked) select an index modulo the manifest
/// size. Output is the selected hashes in lexicographic (= manifest) order.
pub fn sample(merkle_root: &Digest, user_seed: &str, requested: usize, manifest: &BatchManifest) -> Vec<Digest> {
    let n = manifest.size();
    let target = requested.min(n);
    if target == 0 {
        return Vec::new();
    }

    let mut base_input = Vec::with_capacity(64 + user_seed.len());
    base_input.extend_from_slice(hashing::to_hex(merkle_root).as_bytes());
    base_input.extend_from_slice(user_seed.as_bytes());
    let base_seed = hashing::sha256(&base_input);

    let mut selected: BTreeSet<usize> = BTreeSet::new();
    let mut round: u32 = 0;
    while selected.len() < target {
        let mut round_input = Vec::with_capacity(32 + 4);
        round_input.extend_from_slice(&base_seed);
        round_input.extend_from_slice(&round.to_be_bytes());
        let round_seed = hashing::sha256(&round_input);

        let mut first_eight = [0u8; 8];
        first_eight.copy_from_slice(&round_seed[0..8]);
        let raw = u64::from_be_bytes(first_eight);
        let masked = raw & 0x7FFF_FFFF_FFFF_FFFF; // mask the sign bit
        let index = (masked % n as u64) as usize;

        selected.insert(index);
        round += 1;
    }

    selected.into_iter().map(|i| manifest.hashes()[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_of(n: usize) -> BatchManifest {
        let hashes: Vec<Digest> = (0..n as u8).map(|i| hashing::sha256(&[i])).collect();
        BatchManifest::new(hashes).unwrap()
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let manifest = manifest_of(20);
        let root = hashing::sha256(b"root");
        let a = sample(&root, "auditor-1", 5, &manifest);
        let b = sample(&root, "auditor-1", 5, &manifest);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_can_differ() {
        let manifest = manifest_of(50);
        let root = hashing::sha256(b"root");
        let a = sample(&root, "auditor-1", 5, &manifest);
        let b = sample(&root, "auditor-2", 5, &manifest);
        assert_ne!(a, b, "extremely unlikely to collide across 50 items");
    }

    #[test]
    fn size_is_min_requested_and_manifest_len() {
        let manifest = manifest_of(3);
        let root = hashing::sha256(b"root");
        let sampled = sample(&root, "seed", 10, &manifest);
        assert_eq!(sampled.len(), 3);
    }

    #[test]
    fn no_duplicates_and_all_in_manifest() {
        let manifest = manifest_of(30);
        let root = hashing::sha256(b"root");
        let sampled = sample(&root, "seed", 12, &manifest);
        let mut dedup = sampled.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), sampled.len());
        for h in &sampled {
            assert!(manifest.contains(h));
        }
    }

    #[test]
    fn output_is_lexicographically_sorted() {
        let manifest = manifest_of(30);
        let root = hashing::sha256(b"root");
        let sampled = sample(&root, "seed", 12, &manifest);
        let mut sorted = sampled.clone();
        sorted.sort();
        assert_eq!(sampled, sorted);
    }

    #[test]
    fn requested_zero_is_empty() {
        let manifest = manifest_of(5);
        let root = hashing::sha256(b"root");
        assert!(sample(&root, "seed", 0, &manifest).is_empty());
    }
}
