use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use dispute::{DisputeRecord, DisputeResolver, ObservationSet, ReputationTracker, SignedDisputeRecord};
use records::SignedObservationRecord;

#[derive(Debug, Args)]
pub struct FileDisputeArgs {
    #[arg(long)]
    pub key_file: PathBuf,
    #[arg(long)]
    pub dispute_id: String,
    #[arg(long)]
    pub challenged_record_hash: String,
    #[arg(long)]
    pub challenger_record_hash: String,
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn file_dispute(args: FileDisputeArgs) -> Result<bool> {
    let keypair = super::load_keypair(&args.key_file)?;
    let challenged_record_hash = super::parse_digest(&args.challenged_record_hash)?;
    let challenger_record_hash = super::parse_digest(&args.challenger_record_hash)?;

    let dispute = DisputeRecord::new(
        &args.dispute_id,
        challenged_record_hash,
        challenger_record_hash,
        &args.url,
        Utc::now(),
        keypair.public_key().node_id(),
    );
    let signed = dispute.sign(&keypair);

    match args.out {
        Some(path) => {
            fs::write(&path, signed.to_full_text()).with_context(|| format!("writing dispute to {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => print!("{}", signed.to_full_text()),
    }
    Ok(true)
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[arg(long)]
    pub dispute_file: PathBuf,
    /// Independent observation record files (full signed text), at least 3.
    #[arg(long, num_args = 3..)]
    pub observation_files: Vec<PathBuf>,
}

pub fn resolve(args: ResolveArgs) -> Result<bool> {
    let dispute_text = fs::read_to_string(&args.dispute_file).with_context(|| format!("reading {}", args.dispute_file.display()))?;
    let signed_dispute = SignedDisputeRecord::from_full_text(&dispute_text).context("parsing dispute file")?;

    let mut observations = Vec::with_capacity(args.observation_files.len());
    for path in &args.observation_files {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let signed = SignedObservationRecord::from_full_text(&text).with_context(|| format!("parsing {}", path.display()))?;
        observations.push(signed.record);
    }
    let observation_set = ObservationSet::new(observations).context("building observation set")?;
    let resolution = DisputeResolver::resolve(&signed_dispute.dispute, &observation_set, Utc::now()).context("resolving dispute")?;

    print!("{}", resolution.to_canonical_text());
    Ok(true)
}

#[derive(Debug, Args)]
pub struct ReputationArgs {
    /// Canonical resolution text files produced by `resolve-dispute`.
    #[arg(long, num_args = 1..)]
    pub resolution_files: Vec<PathBuf>,
}

pub fn reputation(args: ReputationArgs) -> Result<bool> {
    let mut resolutions = Vec::with_capacity(args.resolution_files.len());
    for path in &args.resolution_files {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        resolutions.push(parse_resolution(&text).with_context(|| format!("parsing {}", path.display()))?);
    }

    let reputations = ReputationTracker::tally(&resolutions, &BTreeMap::new());
    for rep in &reputations {
        println!(
            "{} won={} lost={} observations={}",
            hashing::to_hex(&rep.node_id),
            rep.disputes_won,
            rep.disputes_lost,
            rep.observations_total
        );
    }
    Ok(true)
}

/// Parses the subset of `Resolution::to_canonical_text` needed for
/// reputation tallying: outcome plus majority/minority node lists.
fn parse_resolution(text: &str) -> Result<dispute::Resolution> {
    let mut outcome = None;
    let mut majority_nodes = Vec::new();
    let mut minority_nodes = Vec::new();
    let mut dispute_id = String::new();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("dispute_id:") {
            dispute_id = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("outcome:") {
            outcome = Some(match rest {
                "UPHELD" => dispute::Outcome::Upheld,
                "DISMISSED" => dispute::Outcome::Dismissed,
                "INCONCLUSIVE" => dispute::Outcome::Inconclusive,
                other => anyhow::bail!("unrecognized outcome `{other}`"),
            });
        } else if let Some(rest) = line.strip_prefix("majority_nodes:") {
            majority_nodes = parse_digest_list(rest)?;
        } else if let Some(rest) = line.strip_prefix("minority_nodes:") {
            minority_nodes = parse_digest_list(rest)?;
        }
    }

    Ok(dispute::Resolution {
        dispute_id,
        outcome: outcome.context("resolution is missing an outcome line")?,
        resolved_at: Utc::now(),
        observations_count: majority_nodes.len() + minority_nodes.len(),
        field_consensus: Vec::new(),
        majority_nodes,
        minority_nodes,
    })
}

fn parse_digest_list(s: &str) -> Result<Vec<hashing::Digest>> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',').map(super::parse_digest).collect()
}
