//! `BatchMetadata`, `ChainLink`, and the append-only `BatchChain`.

use codec::{domain, expect_kv, parse_hex_field, split_lines, CanonicalWriter, FormatError};
use hashing::Digest;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("record_count must be at least 1")]
    EmptyRecordCount,
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("chain is empty")]
    EmptyChain,
    #[error("link 0's previous_root must be the genesis sentinel")]
    NotGenesis,
    #[error("link {index} previous_root does not match link {prev}'s merkle_root")]
    BrokenLink { index: usize, prev: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchMetadata {
    pub batch_id: String,
    pub merkle_root: Digest,
    pub manifest_hash: Digest,
    pub record_count: u64,
}

impl BatchMetadata {
    pub fn new(batch_id: impl Into<String>, merkle_root: Digest, manifest_hash: Digest, record_count: u64) -> Result<Self, ChainError> {
        if record_count == 0 {
            return Err(ChainError::EmptyRecordCount);
        }
        Ok(BatchMetadata { batch_id: batch_id.into(), merkle_root, manifest_hash, record_count })
    }

    pub fn to_canonical_text(&self) -> String {
        let mut w = CanonicalWriter::new();
        w.line("batch_id", &self.batch_id);
        w.line("merkle_root", &hashing::to_hex(&self.merkle_root));
        w.line("manifest_hash", &hashing::to_hex(&self.manifest_hash));
        w.line("record_count", &self.record_count.to_string());
        w.finish()
    }

    pub fn from_canonical_text(text: &str) -> Result<Self, ChainError> {
        let lines = split_lines(text)?;
        if lines.len() != 4 {
            return Err(FormatError::WrongFieldCount { expected: 4, actual: lines.len() }.into());
        }
        let batch_id = expect_kv(lines[0], "batch_id")?.to_string();
        let merkle_root = parse_hex_field(expect_kv(lines[1], "merkle_root")?, "merkle_root")?;
        let manifest_hash = parse_hex_field(expect_kv(lines[2], "manifest_hash")?, "manifest_hash")?;
        let record_count: u64 = expect_kv(lines[3], "record_count")?
            .parse()
            .map_err(|_| FormatError::MalformedLine("record_count".to_string()))?;
        BatchMetadata::new(batch_id, merkle_root, manifest_hash, record_count)
    }

    /// `prefix + batch_id\n + merkle_root\n + manifest_hash\n + record_count\n`
    /// (omits `previous_root`, unlike the chain-link signing input).
    pub fn signing_input(&self) -> Vec<u8> {
        domain::signing_input(
            domain::BATCH_METADATA,
            &[&self.batch_id, &hashing::to_hex(&self.merkle_root), &hashing::to_hex(&self.manifest_hash), &self.record_count.to_string()],
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainLink {
    pub batch_id: String,
    pub merkle_root: Digest,
    pub manifest_hash: Digest,
    pub record_count: u64,
    pub previous_root: Digest,
}

impl ChainLink {
    pub fn genesis(batch_id: impl Into<String>, merkle_root: Digest, manifest_hash: Digest, record_count: u64) -> Result<Self, ChainError> {
        Self::new(batch_id, merkle_root, manifest_hash, record_count, hashing::genesis_digest())
    }

    pub fn new(
        batch_id: impl Into<String>,
        merkle_root: Digest,
        manifest_hash: Digest,
        record_count: u64,
        previous_root: Digest,
    ) -> Result<Self, ChainError> {
        if record_count == 0 {
            return Err(ChainError::EmptyRecordCount);
        }
        Ok(ChainLink { batch_id: batch_id.into(), merkle_root, manifest_hash, record_count, previous_root })
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_root == hashing::genesis_digest()
    }

    pub fn to_metadata(&self) -> BatchMetadata {
        BatchMetadata {
            batch_id: self.batch_id.clone(),
            merkle_root: self.merkle_root,
            manifest_hash: self.manifest_hash,
            record_count: self.record_count,
        }
    }

    pub fn to_canonical_text(&self) -> String {
        let mut w = CanonicalWriter::new();
        w.line("batch_id", &self.batch_id);
        w.line("merkle_root", &hashing::to_hex(&self.merkle_root));
        w.line("manifest_hash", &hashing::to_hex(&self.manifest_hash));
        w.line("record_count", &self.record_count.to_string());
        w.line("previous_root", &hashing::to_hex(&self.previous_root));
        w.finish()
    }

    pub fn from_canonical_text(text: &str) -> Result<Self, ChainError> {
        let lines = split_lines(text)?;
        if lines.len() != 5 {
            return Err(FormatError::WrongFieldCount { expected: 5, actual: lines.len() }.into());
        }
        let batch_id = expect_kv(lines[0], "batch_id")?.to_string();
        let merkle_root = parse_hex_field(expect_kv(lines[1], "merkle_root")?, "merkle_root")?;
        let manifest_hash = parse_hex_field(expect_kv(lines[2], "manifest_hash")?, "manifest_hash")?;
        let record_count: u64 = expect_kv(lines[3], "record_count")?
            .parse()
            .map_err(|_| FormatError::MalformedLine("record_count".to_string()))?;
        let previous_root = parse_hex_field(expect_kv(lines[4], "previous_root")?, "previous_root")?;
        ChainLink::new(batch_id, merkle_root, manifest_hash, record_count, previous_root)
    }

    /// `prefix + batch_id\n + merkle_root\n + manifest_hash\n + record_count\n + previous_root\n`
    pub fn signing_input(&self) -> Vec<u8> {
        domain::signing_input(
            domain::CHAIN_LINK,
            &[
                &self.batch_id,
                &hashing::to_hex(&self.merkle_root),
                &hashing::to_hex(&self.manifest_hash),
                &self.record_count.to_string(),
                &hashing::to_hex(&self.previous_root),
            ],
        )
    }
}

/// Ordered sequence of chain links, genesis first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchChain {
    links: Vec<ChainLink>,
}

impl BatchChain {
    pub fn new(links: Vec<ChainLink>) -> Result<Self, ChainError> {
        if links.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        if !links[0].is_genesis() {
            return Err(ChainError::NotGenesis);
        }
        for i in 1..links.len() {
            if links[i].previous_root != links[i - 1].merkle_root {
                return Err(ChainError::BrokenLink { index: i, prev: i - 1 });
            }
        }
        Ok(BatchChain { links })
    }

    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    pub fn head(&self) -> &ChainLink {
        self.links.last().expect("non-empty by construction")
    }

    pub fn append(mut self, next: ChainLink) -> Result<Self, ChainError> {
        if next.previous_root != self.head().merkle_root {
            return Err(ChainError::BrokenLink { index: self.links.len(), prev: self.links.len() - 1 });
        }
        self.links.push(next);
        Ok(self)
    }
}
