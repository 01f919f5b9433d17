//! SHA-256 hashing and lowercase-hex codec shared by every canonical entity.
//!
//! A `Digest` is always 32 raw bytes; on the wire and in canonical text it is
//! always exactly 64 lowercase hex characters. `from_hex` is the sole gate
//! that enforces that shape — callers that parse canonical text must route
//! every hash-shaped field through it rather than trusting `str::len`.

use sha2::{Digest as _, Sha256};
use thiserror::Error;

pub const DIGEST_LEN: usize = 32;

/// Raw 32-byte SHA-256 digest.
pub type Digest = [u8; DIGEST_LEN];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashingError {
    #[error("hex string has length {actual}, expected {expected}")]
    WrongLength { expected: usize, actual: usize },
    #[error("hex string contains a non-hex character")]
    NotHex,
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&out);
    digest
}

/// SHA-256 of the concatenation of `parts`, in order, without intermediate copies.
pub fn sha256_concat(parts: &[&[u8]]) -> Digest {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let out = hasher.finalize();
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&out);
    digest
}

/// Lowercase 64-character hex encoding. `hex::encode` already lowercases.
pub fn to_hex(digest: &Digest) -> String {
    hex::encode(digest)
}

/// Decode a 64-character lowercase-hex digest. Rejects any length other than
/// 64 and any non-hex character (including uppercase — canonical text is
/// lowercase-only, so an uppercase hex string is a format error, not a
/// tolerated variant).
pub fn from_hex(s: &str) -> Result<Digest, HashingError> {
    if s.len() != DIGEST_LEN * 2 {
        return Err(HashingError::WrongLength { expected: DIGEST_LEN * 2, actual: s.len() });
    }
    if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
        return Err(HashingError::NotHex);
    }
    let mut out = [0u8; DIGEST_LEN];
    hex::decode_to_slice(s, &mut out).map_err(|_| HashingError::NotHex)?;
    Ok(out)
}

/// Whether `s` is a well-formed 64-character lowercase-hex digest, without
/// allocating the decoded bytes.
pub fn is_valid_hex(s: &str) -> bool {
    from_hex(s).is_ok()
}

/// The 64-zero genesis sentinel as raw bytes.
pub fn genesis_digest() -> Digest {
    [0u8; DIGEST_LEN]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let d = sha256(b"truthcrawl");
        let hex = to_hex(&d);
        assert_eq!(hex.len(), 64);
        assert_eq!(from_hex(&hex).unwrap(), d);
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(from_hex("abcd"), Err(HashingError::WrongLength { expected: 64, actual: 4 }));
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "g".repeat(64);
        assert_eq!(from_hex(&bad), Err(HashingError::NotHex));
    }

    #[test]
    fn rejects_uppercase() {
        let upper = "A".repeat(64);
        assert_eq!(from_hex(&upper), Err(HashingError::NotHex));
    }

    #[test]
    fn genesis_is_64_zeros() {
        assert_eq!(to_hex(&genesis_digest()), "0".repeat(64));
    }
}
