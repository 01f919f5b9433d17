//! Reputation accumulates across several independently resolved disputes
//! rather than resetting per dispute.

use std::collections::BTreeMap;

use chrono::Utc;
use dispute::{DisputeRecord, DisputeResolver, ObservationSet, ReputationTracker};
use records::ObservationRecordBuilder;

fn observation(url: &str, node_seed: &[u8], status: u16, content: &[u8]) -> records::ObservationRecord {
    ObservationRecordBuilder::new()
        .observed_at(Utc::now())
        .url(url)
        .final_url(url)
        .status_code(status)
        .content_hash(hashing::sha256(content))
        .node_id(hashing::sha256(node_seed))
        .build()
        .unwrap()
}

#[test]
fn repeat_offender_accumulates_losses_across_disputes() {
    let challenger_node = hashing::sha256(b"challenger");

    let first_challenged = observation("https://a.com", b"node_bad", 404, b"wrong");
    let first_good_a = observation("https://a.com", b"node_good_a", 200, b"right");
    let first_good_b = observation("https://a.com", b"node_good_b", 200, b"right");
    let first_hash = first_challenged.record_hash();
    let first_set = ObservationSet::new(vec![first_challenged, first_good_a, first_good_b]).unwrap();
    let first_dispute = DisputeRecord::new("dispute-1", first_hash, hashing::sha256(b"c1"), "https://a.com", Utc::now(), challenger_node);
    let first_resolution = DisputeResolver::resolve(&first_dispute, &first_set, Utc::now()).unwrap();

    let second_challenged = observation("https://b.com", b"node_bad", 500, b"wrong-again");
    let second_good_a = observation("https://b.com", b"node_good_a", 200, b"right-again");
    let second_good_b = observation("https://b.com", b"node_good_c", 200, b"right-again");
    let second_hash = second_challenged.record_hash();
    let second_set = ObservationSet::new(vec![second_challenged, second_good_a, second_good_b]).unwrap();
    let second_dispute = DisputeRecord::new("dispute-2", second_hash, hashing::sha256(b"c2"), "https://b.com", Utc::now(), challenger_node);
    let second_resolution = DisputeResolver::resolve(&second_dispute, &second_set, Utc::now()).unwrap();

    let mut observation_counts = BTreeMap::new();
    observation_counts.insert(hashing::sha256(b"node_bad"), 2u64);
    observation_counts.insert(hashing::sha256(b"node_good_a"), 2u64);

    let reputations = ReputationTracker::tally(&[first_resolution, second_resolution], &observation_counts);

    let bad_node = reputations.iter().find(|r| r.node_id == hashing::sha256(b"node_bad")).unwrap();
    assert_eq!(bad_node.disputes_lost, 2);
    assert_eq!(bad_node.disputes_won, 0);
    assert_eq!(bad_node.observations_total, 2);

    let good_a = reputations.iter().find(|r| r.node_id == hashing::sha256(b"node_good_a")).unwrap();
    assert_eq!(good_a.disputes_won, 2);
    assert_eq!(good_a.observations_total, 2);
}
