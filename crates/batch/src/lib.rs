//! Batch primitives (manifest, metadata, chain link, chain) and their
//! recompute-and-compare verifiers.

pub mod chain;
pub mod manifest;
pub mod verify;

pub use chain::{BatchChain, BatchMetadata, ChainError, ChainLink};
pub use manifest::{BatchManifest, ManifestError};
pub use verify::{verify_batch, verify_chain, BatchArtifact, VerifyResult};
