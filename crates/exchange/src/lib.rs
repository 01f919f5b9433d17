//! Self-contained export/import of a published batch: the exporter writes a
//! directory from which, given only the publisher's public key, every claim
//! (signature, manifest hash, Merkle root, record inclusion, record
//! signatures) can be recomputed and checked; the importer is that check.

use std::fs;
use std::path::{Path, PathBuf};

use batch::{BatchManifest, ChainLink};
use hashing::Digest;
use records::SignedObservationRecord;
use store::RecordStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("manifest entry {0} is not present in the store")]
    MissingRecord(String),
    #[error("{0}")]
    Format(String),
}

fn read_file(path: &Path) -> Result<String, ExchangeError> {
    fs::read_to_string(path).map_err(|source| ExchangeError::Io { path: path.to_path_buf(), source })
}

fn write_file(path: &Path, contents: &str) -> Result<(), ExchangeError> {
    fs::write(path, contents).map_err(|source| ExchangeError::Io { path: path.to_path_buf(), source })
}

pub struct BatchExporter;

impl BatchExporter {
    /// Writes `out_dir/batch-{batch_id}/` with the four top-level files and
    /// one `records/{hash}.txt` per manifest entry. Fails with
    /// [`ExchangeError::MissingRecord`] if any manifest entry is absent from
    /// `store`, before writing anything.
    pub fn export(
        out_dir: &Path,
        batch_id: &str,
        chain_link: &ChainLink,
        signature: &str,
        manifest: &BatchManifest,
        store: &RecordStore,
    ) -> Result<PathBuf, ExchangeError> {
        let metadata = chain_link.to_metadata();

        let mut records = Vec::with_capacity(manifest.size());
        for hash in manifest.hashes() {
            let record = store
                .load(hash)
                .map_err(|source| ExchangeError::Io { path: store.root().to_path_buf(), source: std::io::Error::new(std::io::ErrorKind::Other, source.to_string()) })?
                .ok_or_else(|| ExchangeError::MissingRecord(hashing::to_hex(hash)))?;
            records.push((*hash, record));
        }

        let batch_dir = out_dir.join(format!("batch-{batch_id}"));
        let records_dir = batch_dir.join("records");
        fs::create_dir_all(&records_dir).map_err(|source| ExchangeError::Io { path: records_dir.clone(), source })?;

        write_file(&batch_dir.join("metadata.txt"), &metadata.to_canonical_text())?;
        write_file(&batch_dir.join("manifest.txt"), &manifest.to_canonical_text())?;
        write_file(&batch_dir.join("chain-link.txt"), &chain_link.to_canonical_text())?;
        write_file(&batch_dir.join("signature.txt"), &format!("{signature}\n"))?;

        for (hash, record) in &records {
            let record_path = records_dir.join(format!("{}.txt", hashing::to_hex(hash)));
            write_file(&record_path, &record.to_full_text())?;
        }

        tracing::info!(batch_id, records = records.len(), path = %batch_dir.display(), "exported batch");
        Ok(batch_dir)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportReceipt {
    pub batch_id: String,
    pub records_imported: usize,
    pub records_already_present: usize,
    pub valid: bool,
    pub errors: Vec<String>,
}

pub struct BatchImporter;

impl BatchImporter {
    /// Reads and validates `batch_dir`, accumulating every error before
    /// deciding whether to store anything: a single invalid claim means
    /// zero records are written, even if most of the batch checks out.
    pub fn import(batch_dir: &Path, store: &RecordStore, publisher: &signer::PublicKey) -> Result<ImportReceipt, ExchangeError> {
        let metadata_text = read_file(&batch_dir.join("metadata.txt"))?;
        let manifest_text = read_file(&batch_dir.join("manifest.txt"))?;
        let chain_link_text = read_file(&batch_dir.join("chain-link.txt"))?;
        let signature = read_file(&batch_dir.join("signature.txt"))?.trim_end_matches('\n').to_string();

        let mut errors = Vec::new();

        let metadata = match batch::BatchMetadata::from_canonical_text(&metadata_text) {
            Ok(m) => Some(m),
            Err(e) => {
                errors.push(format!("metadata.txt: {e}"));
                None
            }
        };
        let manifest = match BatchManifest::from_canonical_text(&manifest_text) {
            Ok(m) => Some(m),
            Err(e) => {
                errors.push(format!("manifest.txt: {e}"));
                None
            }
        };
        let chain_link = match ChainLink::from_canonical_text(&chain_link_text) {
            Ok(l) => Some(l),
            Err(e) => {
                errors.push(format!("chain-link.txt: {e}"));
                None
            }
        };

        let batch_id = metadata
            .as_ref()
            .map(|m| m.batch_id.clone())
            .or_else(|| chain_link.as_ref().map(|l| l.batch_id.clone()))
            .unwrap_or_default();

        if let Some(link) = &chain_link {
            if !publisher.verify(&link.signing_input(), &signature) {
                errors.push("publisher signature over chain link is invalid".to_string());
            }
        }

        if let (Some(metadata), Some(manifest)) = (&metadata, &manifest) {
            let computed_manifest_hash = manifest.manifest_hash();
            if computed_manifest_hash != metadata.manifest_hash {
                errors.push(format!(
                    "manifest_hash mismatch: expected {}, computed {}",
                    hashing::to_hex(&metadata.manifest_hash),
                    hashing::to_hex(&computed_manifest_hash)
                ));
            }
            match merkle::compute_root(manifest.hashes()) {
                Ok(root) if root != metadata.merkle_root => {
                    errors.push(format!(
                        "merkle_root mismatch: expected {}, computed {}",
                        hashing::to_hex(&metadata.merkle_root),
                        hashing::to_hex(&root)
                    ));
                }
                Ok(_) => {}
                Err(e) => errors.push(format!("could not compute merkle root: {e}")),
            }
            if manifest.size() as u64 != metadata.record_count {
                errors.push(format!(
                    "record_count mismatch: expected {}, manifest has {}",
                    metadata.record_count,
                    manifest.size()
                ));
            }
        }

        let mut loaded_records: Vec<(Digest, SignedObservationRecord)> = Vec::new();
        if let Some(manifest) = &manifest {
            for hash in manifest.hashes() {
                let record_path = batch_dir.join("records").join(format!("{}.txt", hashing::to_hex(hash)));
                match fs::read_to_string(&record_path) {
                    Ok(text) => match SignedObservationRecord::from_full_text(&text) {
                        Ok(record) => {
                            if record.record_hash() != *hash {
                                errors.push(format!(
                                    "record file {} hashes to {}, not the manifest entry",
                                    hashing::to_hex(hash),
                                    hashing::to_hex(&record.record_hash())
                                ));
                            } else {
                                loaded_records.push((*hash, record));
                            }
                        }
                        Err(e) => errors.push(format!("records/{}.txt: {e}", hashing::to_hex(hash))),
                    },
                    Err(_) => errors.push(format!("records/{}.txt is missing", hashing::to_hex(hash))),
                }
            }
        }

        if !errors.is_empty() {
            tracing::warn!(batch_id, error_count = errors.len(), "import rejected");
            return Ok(ImportReceipt { batch_id, records_imported: 0, records_already_present: 0, valid: false, errors });
        }

        let mut imported = 0usize;
        let mut already_present = 0usize;
        for (hash, record) in &loaded_records {
            if store.contains(hash) {
                already_present += 1;
            } else {
                imported += 1;
            }
            store
                .store(record)
                .map_err(|source| ExchangeError::Io { path: store.root().to_path_buf(), source: std::io::Error::new(std::io::ErrorKind::Other, source.to_string()) })?;
        }

        tracing::info!(batch_id, imported, already_present, "import accepted");
        Ok(ImportReceipt { batch_id, records_imported: imported, records_already_present: already_present, valid: true, errors: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use records::ObservationRecordBuilder;
    use tempfile::tempdir;

    fn signed(url: &str, node_seed: &[u8], content: &[u8], kp: &signer::Keypair) -> SignedObservationRecord {
        let record = ObservationRecordBuilder::new()
            .observed_at(Utc::now())
            .url(url)
            .final_url(url)
            .status_code(200)
            .content_hash(hashing::sha256(content))
            .node_id(hashing::sha256(node_seed))
            .build()
            .unwrap();
        record.sign(kp)
    }

    fn build_batch() -> (tempfile::TempDir, signer::Keypair, PathBuf, BatchManifest, ChainLink, String) {
        let dir = tempdir().unwrap();
        let store_root = dir.path().join("store");
        let store = RecordStore::new(&store_root);
        let kp = signer::Keypair::generate();

        let r1 = signed("https://a.com", b"node1", b"aaaa", &kp);
        let r2 = signed("https://b.com", b"node2", b"bbbb", &kp);
        store.store(&r1).unwrap();
        store.store(&r2).unwrap();

        let manifest = BatchManifest::new(vec![r1.record_hash(), r2.record_hash()]).unwrap();
        let root = merkle::compute_root(manifest.hashes()).unwrap();
        let chain_link = ChainLink::genesis("batch-2024-01-15", root, manifest.manifest_hash(), manifest.size() as u64).unwrap();
        let signature = kp.sign(&chain_link.signing_input());

        let out_dir = dir.path().join("export");
        fs::create_dir_all(&out_dir).unwrap();
        let batch_dir = BatchExporter::export(&out_dir, "2024-01-15", &chain_link, &signature, &manifest, &store).unwrap();

        (dir, kp, batch_dir, manifest, chain_link, signature)
    }

    #[test]
    fn export_then_import_round_trip() {
        let (dir, kp, batch_dir, manifest, _chain_link, _signature) = build_batch();
        let import_store = RecordStore::new(dir.path().join("import-store"));
        let receipt = BatchImporter::import(&batch_dir, &import_store, &kp.public_key()).unwrap();

        assert!(receipt.valid, "{:?}", receipt.errors);
        assert_eq!(receipt.records_imported, manifest.size());
        assert_eq!(receipt.records_already_present, 0);
    }

    #[test]
    fn reimport_reports_already_present() {
        let (dir, kp, batch_dir, manifest, _chain_link, _signature) = build_batch();
        let import_store = RecordStore::new(dir.path().join("import-store"));
        BatchImporter::import(&batch_dir, &import_store, &kp.public_key()).unwrap();
        let receipt = BatchImporter::import(&batch_dir, &import_store, &kp.public_key()).unwrap();

        assert!(receipt.valid);
        assert_eq!(receipt.records_imported, 0);
        assert_eq!(receipt.records_already_present, manifest.size());
    }

    #[test]
    fn tampered_manifest_is_rejected_and_nothing_stored() {
        let (dir, kp, batch_dir, _manifest, _chain_link, _signature) = build_batch();
        let bogus_hash = hashing::sha256(b"not-in-the-batch");
        fs::write(batch_dir.join("manifest.txt"), format!("{}\n", hashing::to_hex(&bogus_hash))).unwrap();

        let import_store = RecordStore::new(dir.path().join("import-store"));
        let receipt = BatchImporter::import(&batch_dir, &import_store, &kp.public_key()).unwrap();

        assert!(!receipt.valid);
        assert!(receipt.errors.iter().any(|e| e.contains("manifest_hash mismatch")));
        assert!(receipt.errors.iter().any(|e| e.contains("merkle_root mismatch")));
        assert_eq!(import_store.all_hashes().unwrap().len(), 0);
    }

    #[test]
    fn export_fails_if_store_missing_a_manifest_entry() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("store"));
        let kp = signer::Keypair::generate();
        let r1 = signed("https://a.com", b"node1", b"aaaa", &kp);
        // not stored
        let manifest = BatchManifest::new(vec![r1.record_hash()]).unwrap();
        let root = merkle::compute_root(manifest.hashes()).unwrap();
        let chain_link = ChainLink::genesis("batch-x", root, manifest.manifest_hash(), 1).unwrap();
        let signature = kp.sign(&chain_link.signing_input());

        let out_dir = dir.path().join("export");
        fs::create_dir_all(&out_dir).unwrap();
        let result = BatchExporter::export(&out_dir, "x", &chain_link, &signature, &manifest, &store);
        assert!(matches!(result, Err(ExchangeError::MissingRecord(_))));
    }
}
