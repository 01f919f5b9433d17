//! The observation record: a crawl fetch, signed by the node that performed
//! it, serialized in the canonical text form specified for hashing/signing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use codec::{parse_hex_field, split_lines, CanonicalWriter, FormatError};
use hashing::Digest;
use thiserror::Error;

const DIRECTIVE_CANONICAL: &str = "canonical";
const DIRECTIVE_ROBOTS_META: &str = "robots_meta";
const DIRECTIVE_ROBOTS_HEADER: &str = "robots_header";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("observation record requires a non-empty `{0}`")]
    MissingField(&'static str),
    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservationRecord {
    pub version: u32,
    pub observed_at: DateTime<Utc>,
    pub url: String,
    pub final_url: String,
    pub status_code: u16,
    pub fetch_ms: u64,
    pub content_hash: Digest,
    pub headers: BTreeMap<String, String>,
    pub directive_canonical: String,
    pub directive_robots_meta: String,
    pub directive_robots_header: String,
    pub links: Vec<String>,
    pub node_id: Digest,
}

impl ObservationRecord {
    pub fn to_canonical_text(&self) -> String {
        let mut w = CanonicalWriter::new();
        w.line("version", &self.version.to_string());
        w.line("observed_at", &codec::format_timestamp(&self.observed_at));
        w.line("url", &self.url);
        w.line("final_url", &self.final_url);
        w.line("status_code", &self.status_code.to_string());
        w.line("fetch_ms", &self.fetch_ms.to_string());
        w.line("content_hash", &hashing::to_hex(&self.content_hash));
        for (key, value) in &self.headers {
            w.line("header", &format!("{key}:{value}"));
        }
        w.line("directive", &format!("{DIRECTIVE_CANONICAL}:{}", self.directive_canonical));
        w.line("directive", &format!("{DIRECTIVE_ROBOTS_META}:{}", self.directive_robots_meta));
        w.line("directive", &format!("{DIRECTIVE_ROBOTS_HEADER}:{}", self.directive_robots_header));
        for link in &self.links {
            w.line("link", link);
        }
        w.line("node_id", &hashing::to_hex(&self.node_id));
        w.finish()
    }

    pub fn record_hash(&self) -> Digest {
        hashing::sha256(self.to_canonical_text().as_bytes())
    }

    pub fn record_hash_hex(&self) -> String {
        hashing::to_hex(&self.record_hash())
    }

    /// Sign the canonical text with `keypair` (no domain prefix — spec §4.3
    /// relies on the record's own structure plus the `version` line for
    /// disambiguation) and attach the signature.
    pub fn sign(self, keypair: &signer::Keypair) -> SignedObservationRecord {
        let signature = keypair.sign(self.to_canonical_text().as_bytes());
        SignedObservationRecord { record: self, node_signature: signature }
    }

    pub fn from_canonical_text(text: &str) -> Result<Self, RecordError> {
        let lines = split_lines(text)?;
        parse_lines(&lines)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedObservationRecord {
    pub record: ObservationRecord,
    pub node_signature: String,
}

impl SignedObservationRecord {
    pub fn record_hash(&self) -> Digest {
        self.record.record_hash()
    }

    pub fn to_full_text(&self) -> String {
        let mut text = self.record.to_canonical_text();
        text.push_str(&format!("node_signature:{}\n", self.node_signature));
        text
    }

    pub fn from_full_text(text: &str) -> Result<Self, RecordError> {
        let lines = split_lines(text)?;
        if lines.is_empty() {
            return Err(FormatError::MissingKey("node_signature".to_string()).into());
        }
        let (body, sig_line) = lines.split_at(lines.len() - 1);
        let signature = codec::expect_kv(sig_line[0], "node_signature")?.to_string();
        let record = parse_lines(body)?;
        Ok(SignedObservationRecord { record, node_signature: signature })
    }

    /// Verify the embedded signature against `public_key`. Never panics.
    pub fn verify_signature(&self, public_key: &signer::PublicKey) -> bool {
        public_key.verify(self.record.to_canonical_text().as_bytes(), &self.node_signature)
    }
}

fn parse_lines(lines: &[&str]) -> Result<ObservationRecord, RecordError> {
    let mut idx = 0usize;
    fn next<'a>(lines: &[&'a str], idx: &mut usize, key: &'static str) -> Result<&'a str, RecordError> {
        let line = lines.get(*idx).ok_or(FormatError::MissingKey(key.to_string()))?;
        *idx += 1;
        Ok(codec::expect_kv(line, key)?)
    }

    let version: u32 = next(lines, &mut idx, "version")?
        .parse()
        .map_err(|_| FormatError::MalformedLine("version".to_string()))?;
    let observed_at = codec::parse_timestamp(next(lines, &mut idx, "observed_at")?)?;
    let url = next(lines, &mut idx, "url")?.to_string();
    let final_url = next(lines, &mut idx, "final_url")?.to_string();
    let status_code: u16 = next(lines, &mut idx, "status_code")?
        .parse()
        .map_err(|_| FormatError::MalformedLine("status_code".to_string()))?;
    let fetch_ms: u64 = next(lines, &mut idx, "fetch_ms")?
        .parse()
        .map_err(|_| FormatError::MalformedLine("fetch_ms".to_string()))?;
    let content_hash = parse_hex_field(next(lines, &mut idx, "content_hash")?, "content_hash")?;

    let mut headers = BTreeMap::new();
    let mut last_header_key: Option<String> = None;
    while let Some(line) = lines.get(idx) {
        let Some(rest) = line.strip_prefix("header:") else { break };
        let (key, value) = rest.split_once(':').ok_or_else(|| FormatError::MalformedLine(line.to_string()))?;
        if let Some(last) = &last_header_key {
            if key <= last.as_str() {
                return Err(FormatError::WrongOrder { expected: format!("> {last}"), found: key.to_string() }.into());
            }
        }
        if key.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(FormatError::InvalidHex(format!("header key `{key}` must be lowercase")).into());
        }
        last_header_key = Some(key.to_string());
        headers.insert(key.to_string(), value.to_string());
        idx += 1;
    }

    let directive_canonical = parse_directive(lines, &mut idx, DIRECTIVE_CANONICAL)?;
    let directive_robots_meta = parse_directive(lines, &mut idx, DIRECTIVE_ROBOTS_META)?;
    let directive_robots_header = parse_directive(lines, &mut idx, DIRECTIVE_ROBOTS_HEADER)?;

    let mut links = Vec::new();
    let mut last_link: Option<String> = None;
    while let Some(line) = lines.get(idx) {
        let Some(url) = line.strip_prefix("link:") else { break };
        if let Some(last) = &last_link {
            if url <= last.as_str() {
                return Err(FormatError::WrongOrder { expected: format!("link > {last}"), found: url.to_string() }.into());
            }
        }
        last_link = Some(url.to_string());
        links.push(url.to_string());
        idx += 1;
    }

    let node_id = parse_hex_field(next(lines, &mut idx, "node_id")?, "node_id")?;

    if idx != lines.len() {
        return Err(FormatError::TrailingData.into());
    }

    Ok(ObservationRecord {
        version,
        observed_at,
        url,
        final_url,
        status_code,
        fetch_ms,
        content_hash,
        headers,
        directive_canonical,
        directive_robots_meta,
        directive_robots_header,
        links,
        node_id,
    })
}

fn parse_directive(lines: &[&str], idx: &mut usize, name: &'static str) -> Result<String, RecordError> {
    let line = lines.get(*idx).ok_or_else(|| FormatError::MissingKey(format!("directive:{name}")))?;
    let rest = line
        .strip_prefix("directive:")
        .ok_or_else(|| FormatError::WrongOrder { expected: format!("directive:{name}"), found: line.to_string() })?;
    let (key, value) = rest.split_once(':').ok_or_else(|| FormatError::MalformedLine(line.to_string()))?;
    if key != name {
        return Err(FormatError::WrongOrder { expected: name.to_string(), found: key.to_string() }.into());
    }
    *idx += 1;
    Ok(value.to_string())
}

/// Validating constructor for [`ObservationRecord`]. Unset optional
/// directives serialize as empty strings; `links` are sorted and deduplicated
/// by the builder so callers never have to.
#[derive(Default)]
pub struct ObservationRecordBuilder {
    version: u32,
    observed_at: Option<DateTime<Utc>>,
    url: Option<String>,
    final_url: Option<String>,
    status_code: u16,
    fetch_ms: u64,
    content_hash: Option<Digest>,
    headers: BTreeMap<String, String>,
    directive_canonical: Option<String>,
    directive_robots_meta: Option<String>,
    directive_robots_header: Option<String>,
    links: Vec<String>,
    node_id: Option<Digest>,
}

impl ObservationRecordBuilder {
    pub fn new() -> Self {
        Self { version: 1, ..Default::default() }
    }

    pub fn version(mut self, v: u32) -> Self {
        self.version = v;
        self
    }

    pub fn observed_at(mut self, v: DateTime<Utc>) -> Self {
        self.observed_at = Some(v);
        self
    }

    pub fn url(mut self, v: impl Into<String>) -> Self {
        self.url = Some(v.into());
        self
    }

    pub fn final_url(mut self, v: impl Into<String>) -> Self {
        self.final_url = Some(v.into());
        self
    }

    pub fn status_code(mut self, v: u16) -> Self {
        self.status_code = v;
        self
    }

    pub fn fetch_ms(mut self, v: u64) -> Self {
        self.fetch_ms = v;
        self
    }

    pub fn content_hash(mut self, v: Digest) -> Self {
        self.content_hash = Some(v);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    pub fn directive_canonical(mut self, v: impl Into<String>) -> Self {
        self.directive_canonical = Some(v.into());
        self
    }

    pub fn directive_robots_meta(mut self, v: impl Into<String>) -> Self {
        self.directive_robots_meta = Some(v.into());
        self
    }

    pub fn directive_robots_header(mut self, v: impl Into<String>) -> Self {
        self.directive_robots_header = Some(v.into());
        self
    }

    pub fn link(mut self, v: impl Into<String>) -> Self {
        self.links.push(v.into());
        self
    }

    pub fn node_id(mut self, v: Digest) -> Self {
        self.node_id = Some(v);
        self
    }

    pub fn build(mut self) -> Result<ObservationRecord, RecordError> {
        let url = self.url.filter(|s| !s.is_empty()).ok_or(RecordError::MissingField("url"))?;
        let final_url = self.final_url.filter(|s| !s.is_empty()).ok_or(RecordError::MissingField("final_url"))?;
        let content_hash = self.content_hash.ok_or(RecordError::MissingField("content_hash"))?;
        let node_id = self.node_id.ok_or(RecordError::MissingField("node_id"))?;
        let observed_at = self.observed_at.ok_or(RecordError::MissingField("observed_at"))?;

        self.links.sort();
        self.links.dedup();

        Ok(ObservationRecord {
            version: self.version,
            observed_at,
            url,
            final_url,
            status_code: self.status_code,
            fetch_ms: self.fetch_ms,
            content_hash,
            headers: self.headers,
            directive_canonical: self.directive_canonical.unwrap_or_default(),
            directive_robots_meta: self.directive_robots_meta.unwrap_or_default(),
            directive_robots_header: self.directive_robots_header.unwrap_or_default(),
            links: self.links,
            node_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ObservationRecord {
        ObservationRecordBuilder::new()
            .observed_at(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap())
            .url("https://a.com")
            .final_url("https://a.com/")
            .status_code(200)
            .fetch_ms(120)
            .content_hash(hashing::sha256(b"a-body"))
            .header("Content-Type", "text/html")
            .link("https://a.com/1")
            .link("https://a.com/2")
            .node_id(hashing::sha256(b"node1"))
            .build()
            .unwrap()
    }

    #[test]
    fn roundtrip_canonical_text() {
        let record = sample();
        let text = record.to_canonical_text();
        let parsed = ObservationRecord::from_canonical_text(&text).unwrap();
        assert_eq!(parsed.to_canonical_text(), text);
    }

    #[test]
    fn headers_lowercased_and_sorted() {
        let record = sample();
        assert_eq!(record.headers.get("content-type"), Some(&"text/html".to_string()));
        let text = record.to_canonical_text();
        assert!(text.contains("header:content-type:text/html\n"));
    }

    #[test]
    fn directives_always_emitted() {
        let record = sample();
        let text = record.to_canonical_text();
        assert!(text.contains("directive:canonical:\n"));
        assert!(text.contains("directive:robots_meta:\n"));
        assert!(text.contains("directive:robots_header:\n"));
    }

    #[test]
    fn links_sorted_and_deduped() {
        let record = ObservationRecordBuilder::new()
            .observed_at(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap())
            .url("https://a.com")
            .final_url("https://a.com/")
            .content_hash(hashing::sha256(b"x"))
            .node_id(hashing::sha256(b"n"))
            .link("https://z.com")
            .link("https://a.com")
            .link("https://a.com")
            .build()
            .unwrap();
        assert_eq!(record.links, vec!["https://a.com".to_string(), "https://z.com".to_string()]);
    }

    #[test]
    fn sign_and_verify_full_text_roundtrip() {
        let kp = signer::Keypair::generate();
        let signed = sample().sign(&kp);
        let text = signed.to_full_text();
        let parsed = SignedObservationRecord::from_full_text(&text).unwrap();
        assert!(parsed.verify_signature(&kp.public_key()));
        assert_eq!(parsed.record_hash(), signed.record_hash());
    }

    #[test]
    fn missing_url_rejected() {
        let err = ObservationRecordBuilder::new()
            .observed_at(Utc::now())
            .final_url("https://a.com")
            .content_hash([0u8; 32])
            .node_id([0u8; 32])
            .build();
        assert_eq!(err, Err(RecordError::MissingField("url")));
    }
}
