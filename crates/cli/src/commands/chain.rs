use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use batch::{BatchChain, BatchManifest, ChainLink};
use clap::Args;

pub fn build_root(hashes_file: &std::path::Path) -> Result<bool> {
    let hashes = super::read_digest_list(hashes_file)?;
    let manifest = BatchManifest::new(hashes).context("building manifest")?;
    let root = merkle::compute_root(manifest.hashes()).context("computing merkle root")?;
    println!("manifest_hash: {}", hashing::to_hex(&manifest.manifest_hash()));
    println!("merkle_root: {}", hashing::to_hex(&root));
    println!("record_count: {}", manifest.size());
    Ok(true)
}

#[derive(Debug, Args)]
pub struct PublishArgs {
    #[arg(long)]
    pub key_file: PathBuf,
    #[arg(long)]
    pub batch_id: String,
    /// File with one 64-hex record hash per line.
    #[arg(long)]
    pub hashes_file: PathBuf,
    /// Previous chain link's merkle_root, or "genesis" for the first link.
    #[arg(long, default_value = "genesis")]
    pub previous_root: String,
    /// Directory to write metadata.txt / chain-link.txt / signature.txt into.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

pub fn publish(args: PublishArgs) -> Result<bool> {
    let keypair = super::load_keypair(&args.key_file)?;
    let hashes = super::read_digest_list(&args.hashes_file)?;
    let manifest = BatchManifest::new(hashes).context("building manifest")?;
    let merkle_root = merkle::compute_root(manifest.hashes()).context("computing merkle root")?;

    let previous_root = if args.previous_root == "genesis" { hashing::genesis_digest() } else { super::parse_digest(&args.previous_root)? };

    let link = ChainLink::new(&args.batch_id, merkle_root, manifest.manifest_hash(), manifest.size() as u64, previous_root)
        .context("building chain link")?;
    let signature = keypair.sign(&link.signing_input());

    match args.out_dir {
        Some(dir) => {
            fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
            fs::write(dir.join("metadata.txt"), link.to_metadata().to_canonical_text())?;
            fs::write(dir.join("manifest.txt"), manifest.to_canonical_text())?;
            fs::write(dir.join("chain-link.txt"), link.to_canonical_text())?;
            fs::write(dir.join("signature.txt"), format!("{signature}\n"))?;
            println!("wrote batch files to {}", dir.display());
        }
        None => {
            print!("{}", link.to_canonical_text());
            println!("signature: {signature}");
        }
    }
    Ok(true)
}

pub fn stats(chain_link_files: &[PathBuf]) -> Result<bool> {
    let mut links = Vec::with_capacity(chain_link_files.len());
    for path in chain_link_files {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        links.push(ChainLink::from_canonical_text(&text).with_context(|| format!("parsing {}", path.display()))?);
    }
    let chain = BatchChain::new(links).context("validating chain continuity")?;
    println!("length: {}", chain.links().len());
    println!("genesis_batch_id: {}", chain.links()[0].batch_id);
    println!("head_batch_id: {}", chain.head().batch_id);
    println!("head_merkle_root: {}", hashing::to_hex(&chain.head().merkle_root));
    let total_records: u64 = chain.links().iter().map(|l| l.record_count).sum();
    println!("total_records: {total_records}");
    Ok(true)
}
