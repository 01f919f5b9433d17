//! Publishes two successive batches, exports each independently, and checks
//! that importing both into a fresh store reconstructs a continuous,
//! verifiable chain.

use batch::{BatchChain, BatchManifest, ChainLink};
use chrono::Utc;
use exchange::{BatchExporter, BatchImporter};
use records::ObservationRecordBuilder;
use store::RecordStore;
use tempfile::tempdir;

fn signed(url: &str, node_seed: &[u8], content: &[u8], kp: &signer::Keypair) -> records::SignedObservationRecord {
    ObservationRecordBuilder::new()
        .observed_at(Utc::now())
        .url(url)
        .final_url(url)
        .status_code(200)
        .content_hash(hashing::sha256(content))
        .node_id(hashing::sha256(node_seed))
        .build()
        .unwrap()
        .sign(kp)
}

#[test]
fn two_batches_export_import_and_verify_as_a_chain() {
    let dir = tempdir().unwrap();
    let publisher_store = RecordStore::new(dir.path().join("publisher-store"));
    let kp = signer::Keypair::generate();

    let r1 = signed("https://a.com", b"node1", b"batch-one", &kp);
    publisher_store.store(&r1).unwrap();
    let manifest1 = BatchManifest::new(vec![r1.record_hash()]).unwrap();
    let root1 = merkle::compute_root(manifest1.hashes()).unwrap();
    let link1 = ChainLink::genesis("2024-01-15", root1, manifest1.manifest_hash(), 1).unwrap();
    let sig1 = kp.sign(&link1.signing_input());

    let r2 = signed("https://b.com", b"node2", b"batch-two", &kp);
    publisher_store.store(&r2).unwrap();
    let manifest2 = BatchManifest::new(vec![r2.record_hash()]).unwrap();
    let root2 = merkle::compute_root(manifest2.hashes()).unwrap();
    let link2 = ChainLink::new("2024-01-16", root2, manifest2.manifest_hash(), 1, root1).unwrap();
    let sig2 = kp.sign(&link2.signing_input());

    let export_root = dir.path().join("export");
    std::fs::create_dir_all(&export_root).unwrap();
    let batch_dir1 = BatchExporter::export(&export_root, "2024-01-15", &link1, &sig1, &manifest1, &publisher_store).unwrap();
    let batch_dir2 = BatchExporter::export(&export_root, "2024-01-16", &link2, &sig2, &manifest2, &publisher_store).unwrap();

    let importer_store = RecordStore::new(dir.path().join("importer-store"));
    let receipt1 = BatchImporter::import(&batch_dir1, &importer_store, &kp.public_key()).unwrap();
    let receipt2 = BatchImporter::import(&batch_dir2, &importer_store, &kp.public_key()).unwrap();
    assert!(receipt1.valid, "{:?}", receipt1.errors);
    assert!(receipt2.valid, "{:?}", receipt2.errors);

    let chain = BatchChain::new(vec![link1, link2]).unwrap();
    let result = batch::verify_chain(chain.links(), &[sig1, sig2], &kp.public_key());
    assert!(result.valid, "{:?}", result.errors);
    assert_eq!(importer_store.all_hashes().unwrap().len(), 2);
}
