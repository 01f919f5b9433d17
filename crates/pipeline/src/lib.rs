//! The cross-node verification pipeline: sample a batch's records, compare
//! each sampled observation against an independent observation of the same
//! URL from a different node, and roll the results up into an audit report.

pub mod compare;
pub mod sampler;
pub mod status;

use batch::BatchManifest;
use chrono::Utc;
use hashing::Digest;
use store::{IndexBuilder, RecordStore};

pub use compare::{compare, CompareResult, Discrepancy};
pub use sampler::sample;
pub use status::{BatchStatus, RecordStatus, VerificationStatus};

const DEFAULT_MAX_SAMPLE_SIZE: usize = 10;
const DEFAULT_MIN_OBSERVATIONS: usize = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordDetail {
    pub record_hash: Digest,
    pub status: RecordStatus,
    pub discrepancies: Vec<Discrepancy>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditReport {
    pub batch_id: String,
    /// Count of records that were actually checked (`matched + mismatched`),
    /// excluding any sampled record that turned out unverifiable.
    pub sampled: usize,
    pub records_matched: usize,
    pub records_mismatched: usize,
    pub records_unverifiable: usize,
    pub details: Vec<RecordDetail>,
    pub mismatch_hashes: Vec<Digest>,
    /// Always 0: filing disputes from a mismatch is a separate, deliberate
    /// step outside this pipeline's scope.
    pub disputes_filed: usize,
}

impl AuditReport {
    pub fn to_verification_status(&self, manifest_size: usize) -> VerificationStatus {
        VerificationStatus {
            batch_id: self.batch_id.clone(),
            batch_status: BatchStatus::derive(self.records_matched, self.records_mismatched, self.records_unverifiable),
            total: manifest_size,
            checked: self.sampled,
            matched: self.records_matched,
            mismatched: self.records_mismatched,
            unverifiable: self.records_unverifiable,
            checked_at: Utc::now(),
        }
    }
}

pub struct VerificationPipeline<'a> {
    store: &'a RecordStore,
    max_sample_size: usize,
    min_observations: usize,
}

impl<'a> VerificationPipeline<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        VerificationPipeline { store, max_sample_size: DEFAULT_MAX_SAMPLE_SIZE, min_observations: DEFAULT_MIN_OBSERVATIONS }
    }

    pub fn with_max_sample_size(mut self, n: usize) -> Self {
        self.max_sample_size = n;
        self
    }

    pub fn with_min_observations(mut self, n: usize) -> Self {
        self.min_observations = n;
        self
    }

    /// Runs the six-step audit procedure: sample, index, gather independent
    /// observations per sampled URL, compare against the lexicographically
    /// smallest independent hash, and tally the outcome.
    pub fn run(&self, batch_id: &str, manifest: &BatchManifest, merkle_root: &Digest, user_seed: &str) -> Result<AuditReport, store::StoreError> {
        let sampled_hashes = sample(merkle_root, user_seed, self.max_sample_size, manifest);
        let indices = IndexBuilder::build(self.store)?;

        let mut details = Vec::with_capacity(sampled_hashes.len());
        let mut matched = 0usize;
        let mut mismatched = 0usize;
        let mut unverifiable = 0usize;
        let mut mismatch_hashes = Vec::new();

        for hash in &sampled_hashes {
            let Some(signed) = self.store.load(hash)? else {
                tracing::warn!(hash = %hashing::to_hex(hash), "sampled record missing from store");
                unverifiable += 1;
                details.push(RecordDetail { record_hash: *hash, status: RecordStatus::Unverifiable, discrepancies: Vec::new() });
                continue;
            };

            let independent: Vec<Digest> = indices
                .by_url
                .get(&signed.record.url)
                .into_iter()
                .flatten()
                .copied()
                .filter(|candidate| candidate != hash)
                .collect();

            let mut independent_with_node = Vec::new();
            for candidate in &independent {
                if let Some(other) = self.store.load(candidate)? {
                    if other.record.node_id != signed.record.node_id {
                        independent_with_node.push((*candidate, other));
                    }
                }
            }

            if independent_with_node.len() < self.min_observations {
                unverifiable += 1;
                details.push(RecordDetail { record_hash: *hash, status: RecordStatus::Unverifiable, discrepancies: Vec::new() });
                continue;
            }

            independent_with_node.sort_by(|a, b| a.0.cmp(&b.0));
            let reference = &independent_with_node[0].1;

            let result = compare(&reference.record, &signed.record);
            if result.matches {
                matched += 1;
                details.push(RecordDetail { record_hash: *hash, status: RecordStatus::Matched, discrepancies: Vec::new() });
            } else {
                mismatched += 1;
                mismatch_hashes.push(*hash);
                details.push(RecordDetail { record_hash: *hash, status: RecordStatus::Mismatched, discrepancies: result.discrepancies });
            }
        }

        tracing::info!(batch_id, sampled = sampled_hashes.len(), matched, mismatched, unverifiable, "batch audit complete");

        Ok(AuditReport {
            batch_id: batch_id.to_string(),
            sampled: matched + mismatched,
            records_matched: matched,
            records_mismatched: mismatched,
            records_unverifiable: unverifiable,
            details,
            mismatch_hashes,
            disputes_filed: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use records::ObservationRecordBuilder;
    use tempfile::tempdir;

    fn signed(url: &str, node_seed: &[u8], content: &[u8]) -> records::SignedObservationRecord {
        let kp = signer::Keypair::generate();
        let record = ObservationRecordBuilder::new()
            .observed_at(Utc::now())
            .url(url)
            .final_url(url)
            .status_code(200)
            .content_hash(hashing::sha256(content))
            .node_id(hashing::sha256(node_seed))
            .build()
            .unwrap();
        record.sign(&kp)
    }

    #[test]
    fn clean_batch_all_match() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path());

        let r1 = signed("https://a.com", b"node1", b"body-a");
        let r2 = signed("https://a.com", b"node2", b"body-a");
        store.store(&r1).unwrap();
        store.store(&r2).unwrap();

        let manifest = BatchManifest::new(vec![r1.record_hash(), r2.record_hash()]).unwrap();
        let root = hashing::sha256(b"root");
        let pipeline = VerificationPipeline::new(&store).with_max_sample_size(2);
        let report = pipeline.run("batch-1", &manifest, &root, "auditor").unwrap();

        assert_eq!(report.records_mismatched, 0);
        assert_eq!(report.records_matched, 2);
        assert_eq!(report.records_unverifiable, 0);
        assert_eq!(report.disputes_filed, 0);
    }

    #[test]
    fn mismatched_content_is_flagged() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path());

        let r1 = signed("https://a.com", b"node1", b"body-a");
        let r2 = signed("https://a.com", b"node2", b"body-b");
        store.store(&r1).unwrap();
        store.store(&r2).unwrap();

        let manifest = BatchManifest::new(vec![r1.record_hash(), r2.record_hash()]).unwrap();
        let root = hashing::sha256(b"root");
        let pipeline = VerificationPipeline::new(&store).with_max_sample_size(2);
        let report = pipeline.run("batch-1", &manifest, &root, "auditor").unwrap();

        assert_eq!(report.records_mismatched, 2);
        assert_eq!(report.mismatch_hashes.len(), 2);
    }

    #[test]
    fn no_independent_observation_is_unverifiable() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path());

        let r1 = signed("https://a.com", b"node1", b"body-a");
        store.store(&r1).unwrap();

        let manifest = BatchManifest::new(vec![r1.record_hash()]).unwrap();
        let root = hashing::sha256(b"root");
        let pipeline = VerificationPipeline::new(&store).with_max_sample_size(1);
        let report = pipeline.run("batch-1", &manifest, &root, "auditor").unwrap();

        assert_eq!(report.records_unverifiable, 1);
        assert_eq!(report.records_matched, 0);
    }

    #[test]
    fn audit_report_derives_verification_status() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        let r1 = signed("https://a.com", b"node1", b"body-a");
        let r2 = signed("https://a.com", b"node2", b"body-a");
        store.store(&r1).unwrap();
        store.store(&r2).unwrap();

        let manifest = BatchManifest::new(vec![r1.record_hash(), r2.record_hash()]).unwrap();
        let root = hashing::sha256(b"root");
        let pipeline = VerificationPipeline::new(&store).with_max_sample_size(2);
        let report = pipeline.run("batch-1", &manifest, &root, "auditor").unwrap();
        let status = report.to_verification_status(manifest.size());
        assert_eq!(status.batch_status, BatchStatus::VerifiedClean);
    }
}
