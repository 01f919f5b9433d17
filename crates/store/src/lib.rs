//! Hash-addressed record store and the on-demand URL/node indices built over
//! it. Every write is atomic (write to a sibling temp file, then rename) so
//! an interrupted write never leaves a corrupt record file, and `store` is a
//! no-op when the target already exists — records are never overwritten.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use hashing::Digest;
use records::SignedObservationRecord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("stored record at {path} failed to parse: {source}")]
    Corrupt { path: PathBuf, source: records::RecordError },
}

pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        RecordStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, hash: &Digest) -> PathBuf {
        let hex = hashing::to_hex(hash);
        self.root.join(&hex[0..2]).join(format!("{hex}.txt"))
    }

    /// Idempotent: a no-op if the record is already stored.
    pub fn store(&self, record: &SignedObservationRecord) -> Result<(), StoreError> {
        let hash = record.record_hash();
        let path = self.path_for(&hash);
        if path.exists() {
            tracing::debug!(hash = %hashing::to_hex(&hash), "record already stored, skipping");
            return Ok(());
        }
        let dir = path.parent().expect("path always has a shard parent");
        fs::create_dir_all(dir).map_err(|source| StoreError::Io { path: dir.to_path_buf(), source })?;
        let tmp_path = dir.join(format!("{}.tmp", hashing::to_hex(&hash)));
        fs::write(&tmp_path, record.to_full_text().as_bytes())
            .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;
        fs::rename(&tmp_path, &path).map_err(|source| StoreError::Io { path: path.clone(), source })?;
        tracing::debug!(hash = %hashing::to_hex(&hash), "record stored");
        Ok(())
    }

    pub fn contains(&self, hash: &Digest) -> bool {
        self.path_for(hash).exists()
    }

    pub fn load(&self, hash: &Digest) -> Result<Option<SignedObservationRecord>, StoreError> {
        let path = self.path_for(hash);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let record = SignedObservationRecord::from_full_text(&text)
                    .map_err(|source| StoreError::Corrupt { path: path.clone(), source })?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Every stored record hash, derived from shard directory listings
    /// rather than parsing file contents.
    pub fn all_hashes(&self) -> Result<Vec<Digest>, StoreError> {
        let mut hashes = Vec::new();
        if !self.root.exists() {
            return Ok(hashes);
        }
        for shard in fs::read_dir(&self.root).map_err(|source| StoreError::Io { path: self.root.clone(), source })? {
            let shard = shard.map_err(|source| StoreError::Io { path: self.root.clone(), source })?;
            if !shard.path().is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path()).map_err(|source| StoreError::Io { path: shard.path(), source })? {
                let entry = entry.map_err(|source| StoreError::Io { path: shard.path(), source })?;
                let path = entry.path();
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
                if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                    continue;
                }
                if let Ok(hash) = hashing::from_hex(stem) {
                    hashes.push(hash);
                }
            }
        }
        hashes.sort();
        Ok(hashes)
    }
}

/// `{url -> sorted record hashes}` and `{node_id -> sorted record hashes}`,
/// built fresh from a store snapshot. Deterministic for a fixed filesystem
/// state; never persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Indices {
    pub by_url: BTreeMap<String, Vec<Digest>>,
    pub by_node: BTreeMap<Digest, Vec<Digest>>,
}

pub struct IndexBuilder;

impl IndexBuilder {
    pub fn build(store: &RecordStore) -> Result<Indices, StoreError> {
        let mut indices = Indices::default();
        for hash in store.all_hashes()? {
            let Some(signed) = store.load(&hash)? else { continue };
            indices.by_url.entry(signed.record.url.clone()).or_default().push(hash);
            indices.by_node.entry(signed.record.node_id).or_default().push(hash);
        }
        for hashes in indices.by_url.values_mut() {
            hashes.sort();
        }
        for hashes in indices.by_node.values_mut() {
            hashes.sort();
        }
        tracing::debug!(urls = indices.by_url.len(), nodes = indices.by_node.len(), "built store indices");
        Ok(indices)
    }
}
