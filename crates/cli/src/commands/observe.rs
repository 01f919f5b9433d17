use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use records::{ObservationRecordBuilder, SignedObservationRecord};
use store::{IndexBuilder, RecordStore};

use crate::config::TruthcrawlConfig;

#[derive(Debug, Args)]
pub struct ObserveArgs {
    /// Path to the node's key seed file (see `gen-key`).
    #[arg(long)]
    pub key_file: PathBuf,
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub final_url: String,
    #[arg(long, default_value_t = 200)]
    pub status_code: u16,
    #[arg(long, default_value_t = 0)]
    pub fetch_ms: u64,
    /// 64-hex SHA-256 of the fetched body.
    #[arg(long, conflicts_with = "content_file")]
    pub content_hash: Option<String>,
    /// Hash the contents of this file instead of passing a hash directly.
    #[arg(long, conflicts_with = "content_hash")]
    pub content_file: Option<PathBuf>,
    /// Repeatable `key:value` header.
    #[arg(long = "header", value_name = "KEY:VALUE")]
    pub headers: Vec<String>,
    #[arg(long, default_value = "")]
    pub directive_canonical: String,
    #[arg(long, default_value = "")]
    pub robots_meta: String,
    #[arg(long, default_value = "")]
    pub robots_header: String,
    /// Repeatable outbound link.
    #[arg(long = "link")]
    pub links: Vec<String>,
    /// Write the signed record's full text here instead of the store.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: ObserveArgs, config: &TruthcrawlConfig) -> Result<bool> {
    let keypair = super::load_keypair(&args.key_file)?;

    let content_hash = match (&args.content_hash, &args.content_file) {
        (Some(hex), _) => super::parse_digest(hex)?,
        (None, Some(path)) => {
            let bytes = fs::read(path).with_context(|| format!("reading content file {}", path.display()))?;
            hashing::sha256(&bytes)
        }
        (None, None) => anyhow::bail!("one of --content-hash or --content-file is required"),
    };

    let mut builder = ObservationRecordBuilder::new()
        .observed_at(Utc::now())
        .url(&args.url)
        .final_url(&args.final_url)
        .status_code(args.status_code)
        .fetch_ms(args.fetch_ms)
        .content_hash(content_hash)
        .directive_canonical(&args.directive_canonical)
        .directive_robots_meta(&args.robots_meta)
        .directive_robots_header(&args.robots_header)
        .node_id(keypair.public_key().node_id());

    for header in &args.headers {
        let (key, value) = header.split_once(':').with_context(|| format!("header `{header}` is not `key:value`"))?;
        builder = builder.header(key, value);
    }
    for link in &args.links {
        builder = builder.link(link);
    }

    let record = builder.build().context("building observation record")?;
    let signed = record.sign(&keypair);

    match args.out {
        Some(path) => {
            fs::write(&path, signed.to_full_text()).with_context(|| format!("writing record to {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => {
            let store = RecordStore::new(&config.store_dir);
            store.store(&signed).context("storing record")?;
            println!("record_hash: {}", hashing::to_hex(&signed.record_hash()));
        }
    }
    Ok(true)
}

pub fn store_record(record_file: &std::path::Path, config: &TruthcrawlConfig) -> Result<bool> {
    let text = fs::read_to_string(record_file).with_context(|| format!("reading {}", record_file.display()))?;
    let signed = SignedObservationRecord::from_full_text(&text).context("parsing record file")?;
    let store = RecordStore::new(&config.store_dir);
    store.store(&signed).context("storing record")?;
    println!("record_hash: {}", hashing::to_hex(&signed.record_hash()));
    Ok(true)
}

pub fn query_url(url: &str, config: &TruthcrawlConfig) -> Result<bool> {
    let store = RecordStore::new(&config.store_dir);
    let indices = IndexBuilder::build(&store).context("building store index")?;
    match indices.by_url.get(url) {
        Some(hashes) => {
            for hash in hashes {
                println!("{}", hashing::to_hex(hash));
            }
        }
        None => println!("no records for url {url}"),
    }
    Ok(true)
}

pub fn query_node(node_id: &str, config: &TruthcrawlConfig) -> Result<bool> {
    let node_id = super::parse_digest(node_id)?;
    let store = RecordStore::new(&config.store_dir);
    let indices = IndexBuilder::build(&store).context("building store index")?;
    match indices.by_node.get(&node_id) {
        Some(hashes) => {
            for hash in hashes {
                println!("{}", hashing::to_hex(hash));
            }
        }
        None => println!("no records for node {}", hashing::to_hex(&node_id)),
    }
    Ok(true)
}
