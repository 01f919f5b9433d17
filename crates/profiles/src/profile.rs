//! `NodeProfile`: one registration plus an optional attestation, both bound
//! to the same `node_id`. Verifies using only its own contents — no store,
//! no network lookup.

use crate::attestation::CrawlAttestation;
use crate::registration::{NodeRegistration, ProfileError};

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct VerifyResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeProfile {
    pub registration: NodeRegistration,
    pub attestation: Option<CrawlAttestation>,
}

pub struct NodeProfileVerifier;

impl NodeProfileVerifier {
    /// Recomputes `node_id` from the registration's embedded public key and
    /// checks both signatures (and the registration/attestation `node_id`
    /// agreement, when an attestation is present). Every check runs.
    pub fn verify(profile: &NodeProfile) -> VerifyResult {
        let mut errors = Vec::new();

        let public_key = match profile.registration.public_key() {
            Ok(pk) => Some(pk),
            Err(ProfileError::Signer(e)) => {
                errors.push(format!("registration public key is malformed: {e}"));
                None
            }
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        };

        if let Some(public_key) = &public_key {
            let computed_node_id = public_key.node_id();
            if computed_node_id != profile.registration.node_id {
                errors.push(format!(
                    "registration node_id mismatch: embedded key implies {}, registration claims {}",
                    hashing::to_hex(&computed_node_id),
                    hashing::to_hex(&profile.registration.node_id)
                ));
            }
            if !public_key.verify(&profile.registration.signing_input(), &profile.registration.signature) {
                errors.push("registration signature is invalid".to_string());
            }

            if let Some(attestation) = &profile.attestation {
                if attestation.node_id != profile.registration.node_id {
                    errors.push("attestation node_id does not match registration node_id".to_string());
                }
                if !public_key.verify(&attestation.signing_input(), &attestation.signature) {
                    errors.push("attestation signature is invalid".to_string());
                }
            }
        }

        tracing::debug!(valid = errors.is_empty(), "node profile verification complete");
        VerifyResult { valid: errors.is_empty(), errors }
    }
}
