//! Consumer-side verification of tokens issued by an external trusted-
//! timestamp authority. Issuing a token (running the authority) is out of
//! scope here; only checking one a node already holds is implemented.

use chrono::{DateTime, Utc};
use codec::{domain, expect_kv, parse_hex_field, split_lines, CanonicalWriter, FormatError};
use hashing::Digest;
use signer::PublicKey;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampToken {
    pub data_hash: Digest,
    pub issued_at: DateTime<Utc>,
    pub authority_node_id: Digest,
    pub signature: String,
}

impl TimestampToken {
    pub fn signing_input(&self) -> Vec<u8> {
        domain::signing_input(
            domain::TIMESTAMP_TOKEN,
            &[&hashing::to_hex(&self.data_hash), &codec::format_timestamp(&self.issued_at), &hashing::to_hex(&self.authority_node_id)],
        )
    }

    pub fn to_canonical_text(&self) -> String {
        let mut w = CanonicalWriter::new();
        w.line("data_hash", &hashing::to_hex(&self.data_hash));
        w.line("issued_at", &codec::format_timestamp(&self.issued_at));
        w.line("authority_node_id", &hashing::to_hex(&self.authority_node_id));
        w.finish()
    }

    pub fn to_full_text(&self) -> String {
        let mut text = self.to_canonical_text();
        text.push_str(&format!("signature:{}\n", self.signature));
        text
    }

    pub fn from_full_text(text: &str) -> Result<Self, TimestampError> {
        let lines = split_lines(text)?;
        if lines.len() != 4 {
            return Err(FormatError::WrongFieldCount { expected: 4, actual: lines.len() }.into());
        }
        let data_hash = parse_hex_field(expect_kv(lines[0], "data_hash")?, "data_hash")?;
        let issued_at = codec::parse_timestamp(expect_kv(lines[1], "issued_at")?)?;
        let authority_node_id = parse_hex_field(expect_kv(lines[2], "authority_node_id")?, "authority_node_id")?;
        let signature = expect_kv(lines[3], "signature")?.to_string();
        Ok(TimestampToken { data_hash, issued_at, authority_node_id, signature })
    }
}

pub struct TimestampVerifier;

impl TimestampVerifier {
    /// Checks that `authority_public_key` is the claimed authority and that
    /// its signature over the token's signing input is valid.
    pub fn verify(token: &TimestampToken, authority_public_key: &PublicKey) -> bool {
        if authority_public_key.node_id() != token.authority_node_id {
            return false;
        }
        authority_public_key.verify(&token.signing_input(), &token.signature)
    }
}
