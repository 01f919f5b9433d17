use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use batch::{BatchManifest, ChainLink};
use clap::Args;
use exchange::{BatchExporter, BatchImporter};
use store::RecordStore;

use crate::config::TruthcrawlConfig;

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(long)]
    pub batch_id: String,
    #[arg(long)]
    pub manifest_file: PathBuf,
    #[arg(long)]
    pub chain_link_file: PathBuf,
    #[arg(long)]
    pub signature_file: PathBuf,
    #[arg(long)]
    pub out_dir: PathBuf,
}

pub fn export(args: ExportArgs, config: &TruthcrawlConfig) -> Result<bool> {
    let manifest_text = fs::read_to_string(&args.manifest_file).with_context(|| format!("reading {}", args.manifest_file.display()))?;
    let chain_link_text = fs::read_to_string(&args.chain_link_file).with_context(|| format!("reading {}", args.chain_link_file.display()))?;
    let signature = fs::read_to_string(&args.signature_file).with_context(|| format!("reading {}", args.signature_file.display()))?;

    let manifest = BatchManifest::from_canonical_text(&manifest_text).context("parsing manifest")?;
    let chain_link = ChainLink::from_canonical_text(&chain_link_text).context("parsing chain link")?;

    let store = RecordStore::new(&config.store_dir);
    let batch_dir = BatchExporter::export(&args.out_dir, &args.batch_id, &chain_link, signature.trim(), &manifest, &store)
        .context("exporting batch")?;
    println!("wrote {}", batch_dir.display());
    Ok(true)
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    pub batch_dir: PathBuf,
    /// Publisher's Base64 SPKI public key, or a path to a file containing one.
    #[arg(long)]
    pub publisher_key: String,
}

pub fn import(args: ImportArgs, config: &TruthcrawlConfig) -> Result<bool> {
    let publisher = super::resolve_public_key(&args.publisher_key)?;
    let store = RecordStore::new(&config.store_dir);
    let receipt = BatchImporter::import(&args.batch_dir, &store, &publisher).context("importing batch")?;

    println!("batch_id: {}", receipt.batch_id);
    println!("records_imported: {}", receipt.records_imported);
    println!("records_already_present: {}", receipt.records_already_present);
    if receipt.valid {
        println!("valid");
    } else {
        println!("invalid");
        for error in &receipt.errors {
            println!("  - {error}");
        }
    }
    Ok(receipt.valid)
}
