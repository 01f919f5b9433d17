//! A pipeline mismatch escalated into a filed dispute, resolved against a
//! third independent observation.

use chrono::Utc;
use dispute::{DisputeRecord, DisputeResolver, ObservationSet, Outcome};
use pipeline::VerificationPipeline;
use records::ObservationRecordBuilder;
use store::RecordStore;
use tempfile::tempdir;

fn signed(url: &str, node_seed: &[u8], content: &[u8]) -> records::SignedObservationRecord {
    let kp = signer::Keypair::generate();
    ObservationRecordBuilder::new()
        .observed_at(Utc::now())
        .url(url)
        .final_url(url)
        .status_code(200)
        .content_hash(hashing::sha256(content))
        .node_id(hashing::sha256(node_seed))
        .build()
        .unwrap()
        .sign(&kp)
}

#[test]
fn pipeline_mismatch_escalates_to_an_upheld_dispute() {
    let dir = tempdir().unwrap();
    let store = RecordStore::new(dir.path());

    let outlier = signed("https://a.com", b"node_outlier", b"stale-body");
    let agree_one = signed("https://a.com", b"node_one", b"fresh-body");
    let agree_two = signed("https://a.com", b"node_two", b"fresh-body");
    store.store(&outlier).unwrap();
    store.store(&agree_one).unwrap();
    store.store(&agree_two).unwrap();

    let manifest = batch::BatchManifest::new(vec![outlier.record_hash(), agree_one.record_hash(), agree_two.record_hash()]).unwrap();
    let root = hashing::sha256(b"root");
    let pipeline = VerificationPipeline::new(&store).with_max_sample_size(3);
    let report = pipeline.run("batch-1", &manifest, &root, "auditor").unwrap();

    assert!(report.mismatch_hashes.contains(&outlier.record_hash()));

    let challenger_kp = signer::Keypair::generate();
    let dispute = DisputeRecord::new(
        "dispute-escalated",
        outlier.record_hash(),
        agree_one.record_hash(),
        "https://a.com",
        Utc::now(),
        challenger_kp.public_key().node_id(),
    );

    let observations = vec![outlier.record, agree_one.record, agree_two.record];
    let set = ObservationSet::new(observations).unwrap();
    let resolution = DisputeResolver::resolve(&dispute, &set, Utc::now()).unwrap();

    assert_eq!(resolution.outcome, Outcome::Upheld);
}
