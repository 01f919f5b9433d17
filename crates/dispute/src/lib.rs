//! Filed disputes, their resolution by six-field majority consensus, and the
//! reputation tallies that accumulate across resolutions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use codec::{domain, expect_kv, parse_hex_field, split_lines, CanonicalWriter, FormatError};
use hashing::Digest;
use records::ObservationRecord;
use thiserror::Error;

const FIELDS: [&str; 6] = ["status_code", "content_hash", "final_url", "directive_canonical", "directive_robots_meta", "directive_robots_header"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisputeError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("an observation set requires at least 3 independent observations, got {0}")]
    TooFewObservations(usize),
    #[error("observation sets require a distinct node_id per observation")]
    DuplicateNode,
    #[error("all observations in a set must share the same url")]
    UrlMismatch,
    #[error("challenged_record_hash does not match any observation in the set")]
    ChallengedRecordNotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisputeRecord {
    pub dispute_id: String,
    pub challenged_record_hash: Digest,
    pub challenger_record_hash: Digest,
    pub url: String,
    pub filed_at: DateTime<Utc>,
    pub challenger_node_id: Digest,
}

impl DisputeRecord {
    pub fn new(
        dispute_id: impl Into<String>,
        challenged_record_hash: Digest,
        challenger_record_hash: Digest,
        url: impl Into<String>,
        filed_at: DateTime<Utc>,
        challenger_node_id: Digest,
    ) -> Self {
        DisputeRecord {
            dispute_id: dispute_id.into(),
            challenged_record_hash,
            challenger_record_hash,
            url: url.into(),
            filed_at,
            challenger_node_id,
        }
    }

    pub fn to_canonical_text(&self) -> String {
        let mut w = CanonicalWriter::new();
        w.line("dispute_id", &self.dispute_id);
        w.line("challenged_record_hash", &hashing::to_hex(&self.challenged_record_hash));
        w.line("challenger_record_hash", &hashing::to_hex(&self.challenger_record_hash));
        w.line("url", &self.url);
        w.line("filed_at", &codec::format_timestamp(&self.filed_at));
        w.line("challenger_node_id", &hashing::to_hex(&self.challenger_node_id));
        w.finish()
    }

    pub fn from_canonical_text(text: &str) -> Result<Self, DisputeError> {
        let lines = split_lines(text)?;
        if lines.len() != 6 {
            return Err(FormatError::WrongFieldCount { expected: 6, actual: lines.len() }.into());
        }
        let dispute_id = expect_kv(lines[0], "dispute_id")?.to_string();
        let challenged_record_hash = parse_hex_field(expect_kv(lines[1], "challenged_record_hash")?, "challenged_record_hash")?;
        let challenger_record_hash = parse_hex_field(expect_kv(lines[2], "challenger_record_hash")?, "challenger_record_hash")?;
        let url = expect_kv(lines[3], "url")?.to_string();
        let filed_at = codec::parse_timestamp(expect_kv(lines[4], "filed_at")?)?;
        let challenger_node_id = parse_hex_field(expect_kv(lines[5], "challenger_node_id")?, "challenger_node_id")?;
        Ok(DisputeRecord { dispute_id, challenged_record_hash, challenger_record_hash, url, filed_at, challenger_node_id })
    }

    pub fn signing_input(&self) -> Vec<u8> {
        domain::signing_input(
            domain::DISPUTE_RECORD,
            &[
                &self.dispute_id,
                &hashing::to_hex(&self.challenged_record_hash),
                &hashing::to_hex(&self.challenger_record_hash),
                &self.url,
                &codec::format_timestamp(&self.filed_at),
                &hashing::to_hex(&self.challenger_node_id),
            ],
        )
    }

    /// Sign with the challenger's key, producing the stored (not canonical)
    /// form that carries the signature alongside the dispute.
    pub fn sign(self, keypair: &signer::Keypair) -> SignedDisputeRecord {
        let signature = keypair.sign(&self.signing_input());
        SignedDisputeRecord { dispute: self, signature }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedDisputeRecord {
    pub dispute: DisputeRecord,
    pub signature: String,
}

impl SignedDisputeRecord {
    pub fn to_full_text(&self) -> String {
        let mut text = self.dispute.to_canonical_text();
        text.push_str(&format!("signature:{}\n", self.signature));
        text
    }

    pub fn from_full_text(text: &str) -> Result<Self, DisputeError> {
        let lines = split_lines(text)?;
        if lines.len() != 7 {
            return Err(FormatError::WrongFieldCount { expected: 7, actual: lines.len() }.into());
        }
        let (body, sig_line) = lines.split_at(6);
        let dispute = DisputeRecord::from_canonical_text(&format!("{}\n", body.join("\n")))?;
        let signature = expect_kv(sig_line[0], "signature")?.to_string();
        Ok(SignedDisputeRecord { dispute, signature })
    }

    pub fn verify_signature(&self, challenger_public_key: &signer::PublicKey) -> bool {
        challenger_public_key.verify(&self.dispute.signing_input(), &self.signature)
    }
}

/// At least three independently-authored observations of one URL, keyed by
/// the node that produced each.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservationSet {
    url: String,
    observations: Vec<(Digest, ObservationRecord)>,
}

impl ObservationSet {
    pub fn new(observations: Vec<ObservationRecord>) -> Result<Self, DisputeError> {
        if observations.len() < 3 {
            return Err(DisputeError::TooFewObservations(observations.len()));
        }
        let url = observations[0].url.clone();
        let mut seen_nodes = std::collections::BTreeSet::new();
        for obs in &observations {
            if obs.url != url {
                return Err(DisputeError::UrlMismatch);
            }
            if !seen_nodes.insert(obs.node_id) {
                return Err(DisputeError::DuplicateNode);
            }
        }
        let pairs = observations.into_iter().map(|obs| (obs.node_id, obs)).collect();
        Ok(ObservationSet { url, observations: pairs })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

fn field_value(record: &ObservationRecord, field: &str) -> String {
    match field {
        "status_code" => record.status_code.to_string(),
        "content_hash" => hashing::to_hex(&record.content_hash),
        "final_url" => record.final_url.clone(),
        "directive_canonical" => record.directive_canonical.clone(),
        "directive_robots_meta" => record.directive_robots_meta.clone(),
        "directive_robots_header" => record.directive_robots_header.clone(),
        _ => unreachable!("field set is fixed"),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldConsensus {
    pub field: &'static str,
    pub majority_value: Option<String>,
    pub votes: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Upheld,
    Dismissed,
    Inconclusive,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Upheld => "UPHELD",
            Outcome::Dismissed => "DISMISSED",
            Outcome::Inconclusive => "INCONCLUSIVE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub dispute_id: String,
    pub outcome: Outcome,
    pub resolved_at: DateTime<Utc>,
    pub observations_count: usize,
    pub field_consensus: Vec<FieldConsensus>,
    pub majority_nodes: Vec<Digest>,
    pub minority_nodes: Vec<Digest>,
}

impl Resolution {
    pub fn to_canonical_text(&self) -> String {
        let mut w = CanonicalWriter::new();
        w.line("dispute_id", &self.dispute_id);
        w.line("outcome", self.outcome.as_str());
        w.line("resolved_at", &codec::format_timestamp(&self.resolved_at));
        w.line("observations_count", &self.observations_count.to_string());
        for fc in &self.field_consensus {
            w.line("field_consensus", &format!("{}:{}:{}", fc.field, fc.majority_value.as_deref().unwrap_or(""), fc.votes));
        }
        let majority = self.majority_nodes.iter().map(hashing::to_hex).collect::<Vec<_>>().join(",");
        let minority = self.minority_nodes.iter().map(hashing::to_hex).collect::<Vec<_>>().join(",");
        w.line("majority_nodes", &majority);
        w.line("minority_nodes", &minority);
        w.finish()
    }
}

pub struct DisputeResolver;

impl DisputeResolver {
    /// Evaluates six-field majority consensus over `observations` and
    /// classifies the record named by `dispute.challenged_record_hash`
    /// against it.
    pub fn resolve(dispute: &DisputeRecord, observations: &ObservationSet, resolved_at: DateTime<Utc>) -> Result<Resolution, DisputeError> {
        let total = observations.observations.len();

        let challenged = observations
            .observations
            .iter()
            .find(|(_, obs)| obs.record_hash() == dispute.challenged_record_hash)
            .ok_or(DisputeError::ChallengedRecordNotFound)?;
        let challenged_node = challenged.0;

        let mut field_consensus = Vec::with_capacity(FIELDS.len());
        let mut any_field_lacks_majority = false;
        let mut disagreeing_nodes: std::collections::BTreeSet<Digest> = std::collections::BTreeSet::new();

        for &field in FIELDS.iter() {
            let mut tally: BTreeMap<String, Vec<Digest>> = BTreeMap::new();
            for (node_id, obs) in &observations.observations {
                tally.entry(field_value(obs, field)).or_default().push(*node_id);
            }
            let majority_entry = tally.iter().find(|(_, nodes)| nodes.len() * 2 > total);

            match majority_entry {
                Some((value, nodes)) => {
                    field_consensus.push(FieldConsensus { field, majority_value: Some(value.clone()), votes: nodes.len() });
                    for (node_id, obs) in &observations.observations {
                        if field_value(obs, field) != *value {
                            disagreeing_nodes.insert(*node_id);
                        }
                    }
                }
                None => {
                    any_field_lacks_majority = true;
                    field_consensus.push(FieldConsensus { field, majority_value: None, votes: 0 });
                }
            }
        }

        let outcome = if any_field_lacks_majority {
            Outcome::Inconclusive
        } else if disagreeing_nodes.contains(&challenged_node) {
            Outcome::Upheld
        } else {
            Outcome::Dismissed
        };

        let minority_nodes: Vec<Digest> = disagreeing_nodes.iter().copied().collect();
        let mut majority_nodes: Vec<Digest> =
            observations.observations.iter().map(|(n, _)| *n).filter(|n| !disagreeing_nodes.contains(n)).collect();
        majority_nodes.sort();

        tracing::info!(dispute_id = %dispute.dispute_id, outcome = outcome.as_str(), "dispute resolved");

        Ok(Resolution {
            dispute_id: dispute.dispute_id.clone(),
            outcome,
            resolved_at,
            observations_count: total,
            field_consensus,
            majority_nodes,
            minority_nodes,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeReputation {
    pub node_id: Digest,
    pub disputes_won: u64,
    pub disputes_lost: u64,
    pub observations_total: u64,
}

pub struct ReputationTracker;

impl ReputationTracker {
    /// Folds a sequence of resolutions (majority nodes win, minority nodes
    /// lose; `INCONCLUSIVE` affects neither) into per-node tallies, then
    /// fills in `observations_total` from an externally supplied count map.
    pub fn tally(resolutions: &[Resolution], observation_counts: &BTreeMap<Digest, u64>) -> Vec<NodeReputation> {
        let mut tallies: BTreeMap<Digest, NodeReputation> = BTreeMap::new();

        for resolution in resolutions {
            if matches!(resolution.outcome, Outcome::Inconclusive) {
                continue;
            }
            for node_id in &resolution.majority_nodes {
                let entry = tallies.entry(*node_id).or_insert_with(|| NodeReputation { node_id: *node_id, ..Default::default() });
                entry.disputes_won += 1;
            }
            for node_id in &resolution.minority_nodes {
                let entry = tallies.entry(*node_id).or_insert_with(|| NodeReputation { node_id: *node_id, ..Default::default() });
                entry.disputes_lost += 1;
            }
        }

        for (node_id, count) in observation_counts {
            let entry = tallies.entry(*node_id).or_insert_with(|| NodeReputation { node_id: *node_id, ..Default::default() });
            entry.observations_total = *count;
        }

        tallies.into_values().collect()
    }
}
