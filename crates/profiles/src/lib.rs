//! Self-signed node identity (registration + attestation), its verifier, and
//! the two external-boundary verifiers (timestamp tokens, HTTP request auth)
//! a node calls without running the services that issue them.

pub mod attestation;
pub mod profile;
pub mod registration;
pub mod request_auth;
pub mod timestamp;

pub use attestation::{AttestationError, CrawlAttestation};
pub use profile::{NodeProfile, NodeProfileVerifier, VerifyResult};
pub use registration::{NodeRegistration, ProfileError};
pub use request_auth::{RequestAuthVerifier, DEFAULT_MAX_SKEW_MINUTES};
pub use timestamp::{TimestampError, TimestampToken, TimestampVerifier};
