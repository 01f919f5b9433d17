//! Domain-separation prefixes for every signed artifact (spec §4.3).
//!
//! Every signature is computed over `prefix + "\n" + field_lines`, where each
//! field line is itself newline-terminated. This prevents a signature over
//! one artifact kind from being replayed as valid for another.

pub const BATCH_METADATA: &str = "truthcrawl-batch-v1";
pub const CHAIN_LINK: &str = "truthcrawl-chain-v1";
pub const REQUEST_AUTH: &str = "truthcrawl-auth-v1";
pub const TIMESTAMP_TOKEN: &str = "truthcrawl-timestamp-v1";
pub const CRAWL_ATTESTATION: &str = "truthcrawl-attestation-v1";
pub const NODE_REGISTRATION: &str = "truthcrawl-registration-v1";
pub const DISPUTE_RECORD: &str = "truthcrawl-dispute-v1";

/// Build `prefix\nline1\nline2\n...`, the common shape of every signing input
/// except the node-observation record (which signs its own canonical text
/// with no added prefix, per spec §4.3).
pub fn signing_input(prefix: &str, lines: &[&str]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + 1 + lines.iter().map(|l| l.len() + 1).sum::<usize>());
    out.extend_from_slice(prefix.as_bytes());
    out.push(b'\n');
    for line in lines {
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
    out
}
