pub mod chain;
pub mod dispute;
pub mod exchange;
pub mod observe;
pub mod pipeline;
pub mod profiles;
pub mod verify;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hashing::Digest;
use signer::{Keypair, PublicKey};

use crate::config::TruthcrawlConfig;
use crate::Command;

pub fn dispatch(command: Command, config: &TruthcrawlConfig) -> Result<bool> {
    match command {
        Command::GenKey { out } => gen_key(out.as_deref()),
        Command::Observe(args) => observe::run(args, config),
        Command::StoreRecord { record_file } => observe::store_record(&record_file, config),
        Command::QueryUrl { url } => observe::query_url(&url, config),
        Command::QueryNode { node_id } => observe::query_node(&node_id, config),
        Command::BuildRoot { hashes_file } => chain::build_root(&hashes_file),
        Command::PublishChainBatch(args) => chain::publish(args),
        Command::VerifyBatch(args) => verify::verify_batch(args),
        Command::VerifyChain(args) => verify::verify_chain(args),
        Command::VerifyProof(args) => verify::verify_proof(args),
        Command::ExportBatch(args) => exchange::export(args, config),
        Command::ImportBatch(args) => exchange::import(args, config),
        Command::VerifyPipeline(args) => pipeline::run_pipeline(args, config, false),
        Command::VerificationStatus(args) => pipeline::run_pipeline(args, config, true),
        Command::FileDispute(args) => dispute::file_dispute(args),
        Command::ResolveDispute(args) => dispute::resolve(args),
        Command::NodeReputation(args) => dispute::reputation(args),
        Command::ChainStats { chain_link_files } => chain::stats(&chain_link_files),
        Command::RegisterNode(args) => profiles::register(args),
        Command::AttestCapabilities(args) => profiles::attest(args),
        Command::VerifyNode(args) => profiles::verify_node(args),
        Command::SampleObservations(args) => pipeline::sample(args),
        Command::AuditReport(args) => pipeline::audit_report(args, config),
    }
}

fn gen_key(out: Option<&Path>) -> Result<bool> {
    let keypair = Keypair::generate();
    let seed_hex = keypair.to_seed_hex();
    let public_key = keypair.public_key();

    match out {
        Some(path) => fs::write(path, format!("{seed_hex}\n")).with_context(|| format!("writing key seed to {}", path.display()))?,
        None => println!("seed: {seed_hex}"),
    }
    println!("public_key: {}", public_key.to_base64_spki());
    println!("node_id: {}", public_key.node_id_hex());
    Ok(true)
}

pub fn load_keypair(path: &Path) -> Result<Keypair> {
    let text = fs::read_to_string(path).with_context(|| format!("reading key file {}", path.display()))?;
    Keypair::from_seed_hex(text.trim()).with_context(|| format!("parsing key seed in {}", path.display()))
}

/// Accepts either a literal Base64 SPKI string or a path to a file
/// containing one.
pub fn resolve_public_key(arg: &str) -> Result<PublicKey> {
    let text = if Path::new(arg).exists() { fs::read_to_string(arg).with_context(|| format!("reading public key file {arg}"))?.trim().to_string() } else { arg.to_string() };
    PublicKey::from_base64_spki(&text).context("parsing public key")
}

pub fn parse_digest(hex: &str) -> Result<Digest> {
    hashing::from_hex(hex.trim()).with_context(|| format!("parsing hex digest `{hex}`"))
}

pub fn read_digest_list(path: &Path) -> Result<Vec<Digest>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    text.lines().filter(|l| !l.trim().is_empty()).map(parse_digest).collect()
}
