//! `NodeRegistration`: operator identity self-signed by the embedded key.

use chrono::{DateTime, Utc};
use codec::{domain, expect_kv, parse_hex_field, split_lines, CanonicalWriter, FormatError};
use hashing::Digest;
use signer::{Keypair, PublicKey};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Signer(#[from] signer::SignerError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRegistration {
    pub operator_name: String,
    pub organization: String,
    pub contact_email: String,
    pub node_id: Digest,
    pub registered_at: DateTime<Utc>,
    pub public_key_spki: String,
    pub signature: String,
}

impl NodeRegistration {
    /// Builds and signs a registration for `keypair`'s public key.
    pub fn new_signed(
        keypair: &Keypair,
        operator_name: impl Into<String>,
        organization: impl Into<String>,
        contact_email: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        let public_key = keypair.public_key();
        let node_id = public_key.node_id();
        let operator_name = operator_name.into();
        let organization = organization.into();
        let contact_email = contact_email.into();

        let signing_input = domain::signing_input(
            domain::NODE_REGISTRATION,
            &[&operator_name, &organization, &contact_email, &hashing::to_hex(&node_id), &codec::format_timestamp(&registered_at)],
        );
        let signature = keypair.sign(&signing_input);

        NodeRegistration {
            operator_name,
            organization,
            contact_email,
            node_id,
            registered_at,
            public_key_spki: public_key.to_base64_spki(),
            signature,
        }
    }

    pub fn signing_input(&self) -> Vec<u8> {
        domain::signing_input(
            domain::NODE_REGISTRATION,
            &[&self.operator_name, &self.organization, &self.contact_email, &hashing::to_hex(&self.node_id), &codec::format_timestamp(&self.registered_at)],
        )
    }

    pub fn public_key(&self) -> Result<PublicKey, ProfileError> {
        Ok(PublicKey::from_base64_spki(&self.public_key_spki)?)
    }

    pub fn to_canonical_text(&self) -> String {
        let mut w = CanonicalWriter::new();
        w.line("operator_name", &self.operator_name);
        w.line("organization", &self.organization);
        w.line("contact_email", &self.contact_email);
        w.line("node_id", &hashing::to_hex(&self.node_id));
        w.line("registered_at", &codec::format_timestamp(&self.registered_at));
        w.line("public_key", &self.public_key_spki);
        w.finish()
    }

    pub fn to_full_text(&self) -> String {
        let mut text = self.to_canonical_text();
        text.push_str(&format!("signature:{}\n", self.signature));
        text
    }

    pub fn from_full_text(text: &str) -> Result<Self, ProfileError> {
        let lines = split_lines(text)?;
        if lines.len() != 7 {
            return Err(FormatError::WrongFieldCount { expected: 7, actual: lines.len() }.into());
        }
        let operator_name = expect_kv(lines[0], "operator_name")?.to_string();
        let organization = expect_kv(lines[1], "organization")?.to_string();
        let contact_email = expect_kv(lines[2], "contact_email")?.to_string();
        let node_id = parse_hex_field(expect_kv(lines[3], "node_id")?, "node_id")?;
        let registered_at = codec::parse_timestamp(expect_kv(lines[4], "registered_at")?)?;
        let public_key_spki = expect_kv(lines[5], "public_key")?.to_string();
        let signature = expect_kv(lines[6], "signature")?.to_string();
        Ok(NodeRegistration { operator_name, organization, contact_email, node_id, registered_at, public_key_spki, signature })
    }
}
