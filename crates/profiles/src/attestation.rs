//! `CrawlAttestation`: a separately signed list of domains a node claims to
//! have crawling capability for.

use chrono::{DateTime, Utc};
use codec::{domain, expect_kv, parse_hex_field, split_lines, CanonicalWriter, FormatError};
use hashing::Digest;
use signer::Keypair;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttestationError {
    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrawlAttestation {
    pub node_id: Digest,
    pub domains: Vec<String>,
    pub attested_at: DateTime<Utc>,
    pub signature: String,
}

impl CrawlAttestation {
    pub fn new_signed(keypair: &Keypair, mut domains: Vec<String>, attested_at: DateTime<Utc>) -> Self {
        let node_id = keypair.public_key().node_id();
        domains = domains.into_iter().map(|d| d.to_lowercase()).collect();
        domains.sort();
        domains.dedup();

        let signing_input = Self::build_signing_input(&node_id, &domains, &attested_at);
        let signature = keypair.sign(&signing_input);

        CrawlAttestation { node_id, domains, attested_at, signature }
    }

    fn build_signing_input(node_id: &Digest, domains: &[String], attested_at: &DateTime<Utc>) -> Vec<u8> {
        domain::signing_input(domain::CRAWL_ATTESTATION, &[&hashing::to_hex(node_id), &domains.join(","), &codec::format_timestamp(attested_at)])
    }

    pub fn signing_input(&self) -> Vec<u8> {
        Self::build_signing_input(&self.node_id, &self.domains, &self.attested_at)
    }

    pub fn to_canonical_text(&self) -> String {
        let mut w = CanonicalWriter::new();
        w.line("node_id", &hashing::to_hex(&self.node_id));
        w.line("domains", &self.domains.join(","));
        w.line("attested_at", &codec::format_timestamp(&self.attested_at));
        w.finish()
    }

    pub fn to_full_text(&self) -> String {
        let mut text = self.to_canonical_text();
        text.push_str(&format!("signature:{}\n", self.signature));
        text
    }

    pub fn from_full_text(text: &str) -> Result<Self, AttestationError> {
        let lines = split_lines(text)?;
        if lines.len() != 4 {
            return Err(FormatError::WrongFieldCount { expected: 4, actual: lines.len() }.into());
        }
        let node_id = parse_hex_field(expect_kv(lines[0], "node_id")?, "node_id")?;
        let domains_field = expect_kv(lines[1], "domains")?;
        let domains = if domains_field.is_empty() { Vec::new() } else { domains_field.split(',').map(|s| s.to_string()).collect() };
        let attested_at = codec::parse_timestamp(expect_kv(lines[2], "attested_at")?)?;
        let signature = expect_kv(lines[3], "signature")?.to_string();
        Ok(CrawlAttestation { node_id, domains, attested_at, signature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_lowercased_sorted_and_deduped() {
        let kp = Keypair::generate();
        let attestation = CrawlAttestation::new_signed(&kp, vec!["Example.com".to_string(), "a.com".to_string(), "a.com".to_string()], Utc::now());
        assert_eq!(attestation.domains, vec!["a.com".to_string(), "example.com".to_string()]);
    }

    #[test]
    fn attestation_round_trips_and_verifies() {
        let kp = Keypair::generate();
        let attestation = CrawlAttestation::new_signed(&kp, vec!["a.com".to_string()], Utc::now());
        let text = attestation.to_full_text();
        let parsed = CrawlAttestation::from_full_text(&text).unwrap();
        assert_eq!(parsed, attestation);
        assert!(kp.public_key().verify(&parsed.signing_input(), &parsed.signature));
    }
}
