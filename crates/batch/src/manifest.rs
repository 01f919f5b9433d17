//! `BatchManifest`: the sorted, deduplicated set of record hashes in a batch.

use codec::{split_lines, FormatError};
use hashing::Digest;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest must contain at least one record hash")]
    Empty,
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Sorted, deduplicated set of 64-hex record hashes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchManifest {
    hashes: Vec<Digest>,
}

impl BatchManifest {
    /// Build a manifest from an arbitrary (possibly unsorted, possibly
    /// duplicate-containing) set of record hashes.
    pub fn new(mut hashes: Vec<Digest>) -> Result<Self, ManifestError> {
        if hashes.is_empty() {
            return Err(ManifestError::Empty);
        }
        hashes.sort();
        hashes.dedup();
        Ok(BatchManifest { hashes })
    }

    pub fn hashes(&self) -> &[Digest] {
        &self.hashes
    }

    pub fn size(&self) -> usize {
        self.hashes.len()
    }

    pub fn contains(&self, hash: &Digest) -> bool {
        self.hashes.binary_search(hash).is_ok()
    }

    /// One lowercase-hex hash per line, in sorted order.
    pub fn to_canonical_text(&self) -> String {
        let mut out = String::with_capacity(self.hashes.len() * 65);
        for hash in &self.hashes {
            out.push_str(&hashing::to_hex(hash));
            out.push('\n');
        }
        out
    }

    pub fn manifest_hash(&self) -> Digest {
        hashing::sha256(self.to_canonical_text().as_bytes())
    }

    pub fn from_canonical_text(text: &str) -> Result<Self, ManifestError> {
        let lines = split_lines(text)?;
        if lines.is_empty() {
            return Err(ManifestError::Empty);
        }
        let mut hashes = Vec::with_capacity(lines.len());
        let mut last: Option<Digest> = None;
        for line in lines {
            let digest = hashing::from_hex(line).map_err(|_| FormatError::InvalidHex(line.to_string()))?;
            if let Some(prev) = last {
                if digest <= prev {
                    return Err(FormatError::WrongOrder {
                        expected: format!("> {}", hashing::to_hex(&prev)),
                        found: line.to_string(),
                    }
                    .into());
                }
            }
            last = Some(digest);
            hashes.push(digest);
        }
        Ok(BatchManifest { hashes })
    }
}
