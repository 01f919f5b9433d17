//! Roll-up status types published alongside an [`AuditReport`](crate::AuditReport).

use chrono::{DateTime, Utc};
use codec::CanonicalWriter;
use hashing::Digest;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordStatus {
    Matched,
    Mismatched,
    Unverifiable,
}

impl RecordStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Matched => "matched",
            RecordStatus::Mismatched => "mismatched",
            RecordStatus::Unverifiable => "unverifiable",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    /// Reserved for a batch that has not yet been audited. The pipeline
    /// never produces this value itself; it exists for callers tracking
    /// batch lifecycle state ahead of the first `verify-pipeline` run.
    Pending,
    VerifiedClean,
    VerifiedWithDisputes,
    Unverifiable,
}

impl BatchStatus {
    fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::VerifiedClean => "verified_clean",
            BatchStatus::VerifiedWithDisputes => "verified_with_disputes",
            BatchStatus::Unverifiable => "unverifiable",
        }
    }

    /// Derives the rolled-up status from an audit's tallies: any mismatch
    /// dominates; unverifiable only wins when nothing else could be checked.
    pub fn derive(matched: usize, mismatched: usize, unverifiable: usize) -> Self {
        if mismatched > 0 {
            BatchStatus::VerifiedWithDisputes
        } else if matched == 0 && unverifiable > 0 {
            BatchStatus::Unverifiable
        } else {
            BatchStatus::VerifiedClean
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationStatus {
    pub batch_id: String,
    pub batch_status: BatchStatus,
    pub total: usize,
    pub checked: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub unverifiable: usize,
    pub checked_at: DateTime<Utc>,
}

impl VerificationStatus {
    pub fn to_canonical_text(&self) -> String {
        let mut w = CanonicalWriter::new();
        w.line("batch_id", &self.batch_id);
        w.line("batch_status", self.batch_status.as_str());
        w.line("total", &self.total.to_string());
        w.line("checked", &self.checked.to_string());
        w.line("matched", &self.matched.to_string());
        w.line("mismatched", &self.mismatched.to_string());
        w.line("unverifiable", &self.unverifiable.to_string());
        w.line("checked_at", &codec::format_timestamp(&self.checked_at));
        w.finish()
    }

    pub fn status_hash(&self) -> Digest {
        hashing::sha256(self.to_canonical_text().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_mismatch_dominates() {
        assert_eq!(BatchStatus::derive(1, 1, 1), BatchStatus::VerifiedWithDisputes);
    }

    #[test]
    fn derive_unverifiable_when_nothing_else_checked() {
        assert_eq!(BatchStatus::derive(0, 0, 2), BatchStatus::Unverifiable);
    }

    #[test]
    fn derive_clean_when_some_matched_despite_unverifiable() {
        assert_eq!(BatchStatus::derive(1, 0, 1), BatchStatus::VerifiedClean);
    }

    #[test]
    fn derive_clean_when_neither() {
        assert_eq!(BatchStatus::derive(0, 0, 0), BatchStatus::VerifiedClean);
    }

    #[test]
    fn canonical_text_is_stable_and_hashable() {
        let status = VerificationStatus {
            batch_id: "batch-1".to_string(),
            batch_status: BatchStatus::VerifiedClean,
            total: 10,
            checked: 5,
            matched: 5,
            mismatched: 0,
            unverifiable: 0,
            checked_at: chrono::Utc::now(),
        };
        let text = status.to_canonical_text();
        assert!(text.contains("batch_status:verified_clean\n"));
        assert_eq!(status.status_hash(), hashing::sha256(text.as_bytes()));
    }
}
