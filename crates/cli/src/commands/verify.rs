use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use batch::{verify_batch as verify_batch_artifact, verify_chain as verify_chain_artifact, BatchManifest, ChainLink};
use clap::Args;

fn print_result(valid: bool, errors: &[String]) -> bool {
    if valid {
        println!("valid");
    } else {
        println!("invalid");
        for error in errors {
            println!("  - {error}");
        }
    }
    valid
}

#[derive(Debug, Args)]
pub struct VerifyBatchArgs {
    #[arg(long)]
    pub metadata_file: PathBuf,
    #[arg(long)]
    pub manifest_file: PathBuf,
    #[arg(long)]
    pub signature_file: PathBuf,
    /// Publisher's Base64 SPKI public key, or a path to a file containing one.
    #[arg(long)]
    pub publisher_key: String,
}

pub fn verify_batch(args: VerifyBatchArgs) -> Result<bool> {
    let metadata_text = fs::read_to_string(&args.metadata_file).with_context(|| format!("reading {}", args.metadata_file.display()))?;
    let manifest_text = fs::read_to_string(&args.manifest_file).with_context(|| format!("reading {}", args.manifest_file.display()))?;
    let signature = fs::read_to_string(&args.signature_file).with_context(|| format!("reading {}", args.signature_file.display()))?;
    let publisher = super::resolve_public_key(&args.publisher_key)?;

    let metadata = batch::BatchMetadata::from_canonical_text(&metadata_text).context("parsing metadata")?;
    let manifest = BatchManifest::from_canonical_text(&manifest_text).context("parsing manifest")?;
    let result = verify_batch_artifact(&metadata, &manifest, signature.trim(), &publisher);
    Ok(print_result(result.valid, &result.errors))
}

#[derive(Debug, Args)]
pub struct VerifyChainArgs {
    /// Canonical chain-link files, genesis first.
    #[arg(long, num_args = 1..)]
    pub chain_link_files: Vec<PathBuf>,
    /// One signature file per chain-link file, same order.
    #[arg(long, num_args = 1..)]
    pub signature_files: Vec<PathBuf>,
    #[arg(long)]
    pub publisher_key: String,
}

pub fn verify_chain(args: VerifyChainArgs) -> Result<bool> {
    let mut links = Vec::with_capacity(args.chain_link_files.len());
    for path in &args.chain_link_files {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        links.push(ChainLink::from_canonical_text(&text).with_context(|| format!("parsing {}", path.display()))?);
    }
    let mut signatures = Vec::with_capacity(args.signature_files.len());
    for path in &args.signature_files {
        signatures.push(fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?.trim().to_string());
    }
    let publisher = super::resolve_public_key(&args.publisher_key)?;
    let result = verify_chain_artifact(&links, &signatures, &publisher);
    Ok(print_result(result.valid, &result.errors))
}

#[derive(Debug, Args)]
pub struct VerifyProofArgs {
    #[arg(long)]
    pub leaf: String,
    #[arg(long)]
    pub root: String,
    /// File with one `sibling_hex,side` line per proof step (side is `left` or `right`).
    #[arg(long)]
    pub proof_file: PathBuf,
}

pub fn verify_proof(args: VerifyProofArgs) -> Result<bool> {
    let leaf = super::parse_digest(&args.leaf)?;
    let root = super::parse_digest(&args.root)?;
    let text = fs::read_to_string(&args.proof_file).with_context(|| format!("reading {}", args.proof_file.display()))?;

    let mut proof = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let (sibling_hex, side_str) = line.split_once(',').with_context(|| format!("malformed proof line `{line}`"))?;
        let sibling = super::parse_digest(sibling_hex)?;
        let side = match side_str.trim() {
            "left" => merkle::Side::Left,
            "right" => merkle::Side::Right,
            other => anyhow::bail!("proof side must be `left` or `right`, got `{other}`"),
        };
        proof.push(merkle::ProofStep { sibling, side });
    }

    let valid = merkle::verify_proof(leaf, &proof, root);
    println!("{}", if valid { "valid" } else { "invalid" });
    Ok(valid)
}
