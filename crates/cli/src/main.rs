//! `truthcrawl`: a thin translator over the core library crates. No
//! correctness lives here — every subcommand parses arguments, calls one
//! library operation, and prints or persists the result.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config::TruthcrawlConfig;

#[derive(Debug, Parser)]
#[command(name = "truthcrawl", version, about = "Verifiable, tamper-evident crawl-observation ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to a TOML config file overriding the default data directories.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the record store directory.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a fresh Ed25519 keypair and print its seed and public key.
    GenKey {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Build and sign an observation record.
    Observe(commands::observe::ObserveArgs),
    /// Store a signed record's full text into the record store.
    StoreRecord {
        record_file: PathBuf,
    },
    /// List stored record hashes for a URL.
    QueryUrl {
        url: String,
    },
    /// List stored record hashes for a node.
    QueryNode {
        node_id: String,
    },
    /// Compute the manifest hash and Merkle root for a set of record hashes.
    BuildRoot {
        /// File with one 64-hex record hash per line.
        hashes_file: PathBuf,
    },
    /// Build and sign the next chain link for a batch.
    PublishChainBatch(commands::chain::PublishArgs),
    /// Verify a published batch against its manifest and signature.
    VerifyBatch(commands::verify::VerifyBatchArgs),
    /// Verify a chain of links against their signatures.
    VerifyChain(commands::verify::VerifyChainArgs),
    /// Verify a Merkle inclusion proof.
    VerifyProof(commands::verify::VerifyProofArgs),
    /// Export a published batch to a self-contained directory.
    ExportBatch(commands::exchange::ExportArgs),
    /// Import a batch directory into the local store.
    ImportBatch(commands::exchange::ImportArgs),
    /// Run the cross-node verification pipeline over a batch.
    VerifyPipeline(commands::pipeline::PipelineArgs),
    /// Print and persist the verification status for a batch.
    VerificationStatus(commands::pipeline::PipelineArgs),
    /// File a signed dispute against a record.
    FileDispute(commands::dispute::FileDisputeArgs),
    /// Resolve a dispute against a set of independent observations.
    ResolveDispute(commands::dispute::ResolveArgs),
    /// Compute per-node reputation from a set of resolutions.
    NodeReputation(commands::dispute::ReputationArgs),
    /// Print basic statistics about a chain-link sequence.
    ChainStats {
        /// Files containing canonical chain links, genesis first.
        chain_link_files: Vec<PathBuf>,
    },
    /// Register a node's operator identity.
    RegisterNode(commands::profiles::RegisterArgs),
    /// Attest crawling capability for a set of domains.
    AttestCapabilities(commands::profiles::AttestArgs),
    /// Verify a node profile (registration + optional attestation).
    VerifyNode(commands::profiles::VerifyNodeArgs),
    /// Sample record hashes from a manifest, deterministically.
    SampleObservations(commands::pipeline::SampleArgs),
    /// Run the verification pipeline and print the full audit report as JSON.
    AuditReport(commands::pipeline::PipelineArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match TruthcrawlConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    };
    config.override_store_dir(cli.store_dir);

    let result = commands::dispatch(cli.command, &config);
    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
