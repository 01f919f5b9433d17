//! Merkle tree over raw 32-byte leaf hashes, with inclusion proofs.
//!
//! Leaves are used as-is (never re-hashed). A level with an odd number of
//! nodes duplicates its last node before pairing; `parent = SHA-256(left ||
//! right)`. A single-leaf tree's root is that leaf, and its proof is empty.

use hashing::Digest;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("leaf list must be non-empty")]
    EmptyLeaves,
    #[error("leaf index {index} out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Digest,
    pub side: Side,
}

pub type Proof = Vec<ProofStep>;

/// A Merkle tree built once from a fixed leaf set; `root()`/`proof()` are
/// cheap lookups over precomputed levels.
#[derive(Debug, PartialEq)]
pub struct MerkleTree {
    /// `levels[0]` is the (possibly duplicated) leaf level; the last entry is
    /// a single-element level holding the root.
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    pub fn from_leaves(leaves: &[Digest]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyLeaves);
        }
        let mut levels = vec![leaves.to_vec()];
        while levels.last().unwrap().len() > 1 {
            let current = levels.last().unwrap();
            let mut padded = current.clone();
            if padded.len() % 2 == 1 {
                padded.push(*padded.last().unwrap());
            }
            let mut next = Vec::with_capacity(padded.len() / 2);
            for pair in padded.chunks_exact(2) {
                next.push(hashing::sha256_concat(&[&pair[0], &pair[1]]));
            }
            levels.push(next);
        }
        Ok(MerkleTree { levels })
    }

    pub fn root(&self) -> Digest {
        self.levels.last().unwrap()[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Inclusion proof for the original (unpadded) leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<Proof, MerkleError> {
        let original_len = {
            // levels[0] may already be padded if the caller built from a
            // single odd-sized leaf set; leaf_count reflects the padded
            // level, so bound against the true input length separately.
            self.levels[0].len()
        };
        if index >= original_len {
            return Err(MerkleError::IndexOutOfRange { index, len: original_len });
        }
        let mut steps = Vec::new();
        let mut idx = index;
        for level in 0..self.levels.len() - 1 {
            let current = &self.levels[level];
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            let sibling = if sibling_idx < current.len() {
                current[sibling_idx]
            } else {
                // odd-length level: sibling is the duplicated last element
                current[current.len() - 1]
            };
            let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
            steps.push(ProofStep { sibling, side });
            idx /= 2;
        }
        Ok(steps)
    }
}

/// Convenience: build a tree and return just the root.
pub fn compute_root(leaves: &[Digest]) -> Result<Digest, MerkleError> {
    Ok(MerkleTree::from_leaves(leaves)?.root())
}

/// Convenience: build a tree and return the proof for `index`.
pub fn compute_proof(leaves: &[Digest], index: usize) -> Result<Proof, MerkleError> {
    MerkleTree::from_leaves(leaves)?.proof(index)
}

/// Recompute the root implied by `leaf` and `proof`, and compare it to `root`
/// as lowercase hex (per spec, comparison is hex-normalized, though raw byte
/// comparison is equivalent here).
pub fn verify_proof(leaf: Digest, proof: &Proof, root: Digest) -> bool {
    let mut current = leaf;
    for step in proof {
        current = match step.side {
            Side::Left => hashing::sha256_concat(&[&step.sibling, &current]),
            Side::Right => hashing::sha256_concat(&[&current, &step.sibling]),
        };
    }
    hashing::to_hex(&current) == hashing::to_hex(&root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_leaf(s: &str) -> Digest {
        hashing::from_hex(s).unwrap()
    }

    #[test]
    fn single_leaf_tree_root_is_the_leaf() {
        let leaf = hashing::sha256(b"solo");
        let tree = MerkleTree::from_leaves(&[leaf]).unwrap();
        assert_eq!(tree.root(), leaf);
        assert!(tree.proof(0).unwrap().is_empty());
        assert!(verify_proof(leaf, &tree.proof(0).unwrap(), tree.root()));
    }

    #[test]
    fn empty_leaves_rejected() {
        assert_eq!(MerkleTree::from_leaves(&[]), Err(MerkleError::EmptyLeaves));
    }

    #[test]
    fn index_out_of_range_rejected() {
        let tree = MerkleTree::from_leaves(&[hashing::sha256(b"x")]).unwrap();
        assert_eq!(tree.proof(1), Err(MerkleError::IndexOutOfRange { index: 1, len: 1 }));
    }

    /// Golden vector: leaves = SHA-256("a"), SHA-256("b"), SHA-256("c").
    #[test]
    fn golden_vector_three_leaves() {
        let leaves = vec![
            hex_leaf("ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb"),
            hex_leaf("3e23e8160039594a33894f6564e1b1348bbd7a0088d42c4acb73eeaed59c009d"),
            hex_leaf("2e7d2c03a9507ae265ecf5b5356885a53393a2029d241394997265a1a25aefc6"),
        ];
        let tree = MerkleTree::from_leaves(&leaves).unwrap();
        let root = tree.root();
        assert_eq!(
            hashing::to_hex(&root),
            "d31a37ef6ac14a2db1470c4316beb5592e6afd4465022339adafda76a18ffabe"
        );

        let proof0 = tree.proof(0).unwrap();
        assert_eq!(proof0.len(), 2);
        assert_eq!(proof0[0].side, Side::Right);
        assert_eq!(proof0[1].side, Side::Right);
        assert!(verify_proof(leaves[0], &proof0, root));

        let zero_root = [0u8; 32];
        assert!(!verify_proof(leaves[0], &proof0, zero_root));
    }

    #[test]
    fn four_leaves_even_no_duplication_needed() {
        let leaves: Vec<Digest> = (0u8..4).map(|i| hashing::sha256(&[i])).collect();
        let tree = MerkleTree::from_leaves(&leaves).unwrap();
        for i in 0..4 {
            let proof = tree.proof(i).unwrap();
            assert!(verify_proof(leaves[i], &proof, tree.root()));
        }
    }
}
