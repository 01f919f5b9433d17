use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use batch::BatchManifest;
use clap::Args;
use pipeline::{RecordStatus, VerificationPipeline};
use store::RecordStore;

use crate::config::TruthcrawlConfig;

#[derive(Debug, Args)]
pub struct PipelineArgs {
    #[arg(long)]
    pub batch_id: String,
    #[arg(long)]
    pub manifest_file: PathBuf,
    #[arg(long)]
    pub merkle_root: String,
    /// Seed distinguishing independent auditors sampling the same batch.
    #[arg(long)]
    pub user_seed: String,
    #[arg(long)]
    pub max_sample_size: Option<usize>,
    #[arg(long)]
    pub min_observations: Option<usize>,
}

fn build_pipeline<'a>(store: &'a RecordStore, args: &PipelineArgs) -> VerificationPipeline<'a> {
    let mut pipeline = VerificationPipeline::new(store);
    if let Some(n) = args.max_sample_size {
        pipeline = pipeline.with_max_sample_size(n);
    }
    if let Some(n) = args.min_observations {
        pipeline = pipeline.with_min_observations(n);
    }
    pipeline
}

fn status_label(status: RecordStatus) -> &'static str {
    match status {
        RecordStatus::Matched => "matched",
        RecordStatus::Mismatched => "mismatched",
        RecordStatus::Unverifiable => "unverifiable",
    }
}

pub fn run_pipeline(args: PipelineArgs, config: &TruthcrawlConfig, persist_status: bool) -> Result<bool> {
    let manifest_text = fs::read_to_string(&args.manifest_file).with_context(|| format!("reading {}", args.manifest_file.display()))?;
    let manifest = BatchManifest::from_canonical_text(&manifest_text).context("parsing manifest")?;
    let merkle_root = super::parse_digest(&args.merkle_root)?;

    let store = RecordStore::new(&config.store_dir);
    let pipeline = build_pipeline(&store, &args);
    let report = pipeline
        .run(&args.batch_id, &manifest, &merkle_root, &args.user_seed)
        .context("running verification pipeline")?;

    println!("sampled: {}", report.sampled);
    println!("matched: {}", report.records_matched);
    println!("mismatched: {}", report.records_mismatched);
    println!("unverifiable: {}", report.records_unverifiable);
    for hash in &report.mismatch_hashes {
        println!("mismatch: {}", hashing::to_hex(hash));
    }

    if persist_status {
        let status = report.to_verification_status(manifest.size());
        fs::create_dir_all(&config.verification_dir).with_context(|| format!("creating {}", config.verification_dir.display()))?;
        let status_path = config.verification_dir.join(format!("{}.txt", args.batch_id));
        fs::write(&status_path, status.to_canonical_text()).with_context(|| format!("writing {}", status_path.display()))?;
        println!("batch_status: {:?}", status.batch_status);
        println!("status_hash: {}", hashing::to_hex(&status.status_hash()));
        println!("wrote {}", status_path.display());
    }

    Ok(report.records_mismatched == 0)
}

#[derive(Debug, Args)]
pub struct SampleArgs {
    #[arg(long)]
    pub manifest_file: PathBuf,
    #[arg(long)]
    pub merkle_root: String,
    #[arg(long)]
    pub user_seed: String,
    #[arg(long)]
    pub count: usize,
}

pub fn sample(args: SampleArgs) -> Result<bool> {
    let manifest_text = fs::read_to_string(&args.manifest_file).with_context(|| format!("reading {}", args.manifest_file.display()))?;
    let manifest = BatchManifest::from_canonical_text(&manifest_text).context("parsing manifest")?;
    let merkle_root = super::parse_digest(&args.merkle_root)?;

    let hashes = pipeline::sample(&merkle_root, &args.user_seed, args.count, &manifest);
    for hash in &hashes {
        println!("{}", hashing::to_hex(hash));
    }
    Ok(true)
}

pub fn audit_report(args: PipelineArgs, config: &TruthcrawlConfig) -> Result<bool> {
    let manifest_text = fs::read_to_string(&args.manifest_file).with_context(|| format!("reading {}", args.manifest_file.display()))?;
    let manifest = BatchManifest::from_canonical_text(&manifest_text).context("parsing manifest")?;
    let merkle_root = super::parse_digest(&args.merkle_root)?;

    let store = RecordStore::new(&config.store_dir);
    let pipeline = build_pipeline(&store, &args);
    let report = pipeline
        .run(&args.batch_id, &manifest, &merkle_root, &args.user_seed)
        .context("running verification pipeline")?;

    let details: Vec<serde_json::Value> = report
        .details
        .iter()
        .map(|d| {
            serde_json::json!({
                "record_hash": hashing::to_hex(&d.record_hash),
                "status": status_label(d.status),
                "discrepancies": d.discrepancies.iter().map(|disc| serde_json::json!({
                    "field": disc.field,
                    "expected": disc.expected,
                    "actual": disc.actual,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    let json = serde_json::json!({
        "batch_id": report.batch_id,
        "sampled": report.sampled,
        "records_matched": report.records_matched,
        "records_mismatched": report.records_mismatched,
        "records_unverifiable": report.records_unverifiable,
        "mismatch_hashes": report.mismatch_hashes.iter().map(hashing::to_hex).collect::<Vec<_>>(),
        "disputes_filed": report.disputes_filed,
        "details": details,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(report.records_mismatched == 0)
}
