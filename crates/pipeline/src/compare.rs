//! Field-by-field comparison of two observations of the same URL.
//!
//! Fields that are expected to legitimately vary between independent
//! observers (`observed_at`, `fetch_ms`, `node_id`, the signature) are
//! excluded; everything describing what was actually fetched is compared.

use records::ObservationRecord;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discrepancy {
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompareResult {
    pub matches: bool,
    pub discrepancies: Vec<Discrepancy>,
}

pub fn compare(expected: &ObservationRecord, actual: &ObservationRecord) -> CompareResult {
    let mut discrepancies = Vec::new();

    check(&mut discrepancies, "status_code", &expected.status_code.to_string(), &actual.status_code.to_string());
    check(&mut discrepancies, "content_hash", &hashing::to_hex(&expected.content_hash), &hashing::to_hex(&actual.content_hash));
    check(&mut discrepancies, "final_url", &expected.final_url, &actual.final_url);
    check(&mut discrepancies, "directive:canonical", &expected.directive_canonical, &actual.directive_canonical);
    check(&mut discrepancies, "directive:robots_meta", &expected.directive_robots_meta, &actual.directive_robots_meta);
    check(&mut discrepancies, "directive:robots_header", &expected.directive_robots_header, &actual.directive_robots_header);
    check(&mut discrepancies, "links", &expected.links.join(","), &actual.links.join(","));

    CompareResult { matches: discrepancies.is_empty(), discrepancies }
}

fn check(out: &mut Vec<Discrepancy>, field: &'static str, expected: &str, actual: &str) {
    if expected != actual {
        out.push(Discrepancy { field, expected: expected.to_string(), actual: actual.to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use records::ObservationRecordBuilder;

    fn base() -> ObservationRecord {
        ObservationRecordBuilder::new()
            .observed_at(Utc::now())
            .url("https://a.com")
            .final_url("https://a.com/")
            .status_code(200)
            .content_hash(hashing::sha256(b"body"))
            .node_id(hashing::sha256(b"node1"))
            .link("https://a.com/1")
            .build()
            .unwrap()
    }

    #[test]
    fn identical_records_match() {
        let a = base();
        let b = base();
        let result = compare(&a, &b);
        assert!(result.matches);
        assert!(result.discrepancies.is_empty());
    }

    #[test]
    fn differing_content_hash_is_a_discrepancy() {
        let a = base();
        let mut b = base();
        b.content_hash = hashing::sha256(b"different-body");
        let result = compare(&a, &b);
        assert!(!result.matches);
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].field, "content_hash");
    }

    #[test]
    fn node_id_and_timestamp_differences_are_ignored() {
        let a = base();
        let mut b = base();
        b.node_id = hashing::sha256(b"node2");
        b.fetch_ms = 9999;
        let result = compare(&a, &b);
        assert!(result.matches);
    }

    #[test]
    fn multiple_discrepancies_all_accumulate() {
        let a = base();
        let mut b = base();
        b.status_code = 404;
        b.final_url = "https://a.com/moved".to_string();
        let result = compare(&a, &b);
        assert_eq!(result.discrepancies.len(), 2);
    }
}
