//! Consumer-side check for the `X-Node-Id`/`X-Timestamp`/`X-Signature` HTTP
//! authentication scheme. The HTTP server itself is out of scope; this is
//! the narrow verification call such a server would make per request.

use chrono::{DateTime, Duration, Utc};
use codec::domain;
use signer::PublicKey;

pub struct RequestAuthVerifier;

impl RequestAuthVerifier {
    /// `signing_input = prefix + method\n + path\n + timestamp\n + SHA-256(body)\n`.
    /// Rejects requests whose timestamp is more than `max_skew` away from
    /// `now`, or whose signature does not verify under `node_public_key`.
    pub fn verify(
        method: &str,
        path: &str,
        timestamp: DateTime<Utc>,
        body: &[u8],
        signature: &str,
        node_public_key: &PublicKey,
        now: DateTime<Utc>,
        max_skew: Duration,
    ) -> bool {
        let skew = (now - timestamp).abs();
        if skew > max_skew {
            return false;
        }
        let signing_input = domain::signing_input(
            domain::REQUEST_AUTH,
            &[method, path, &codec::format_timestamp(&timestamp), &hashing::to_hex(&hashing::sha256(body))],
        );
        node_public_key.verify(&signing_input, signature)
    }
}

/// The HTTP surface's default clock-skew tolerance (spec §6).
pub const DEFAULT_MAX_SKEW_MINUTES: i64 = 5;
