use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use profiles::{CrawlAttestation, NodeProfile, NodeProfileVerifier, NodeRegistration};

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub key_file: PathBuf,
    #[arg(long)]
    pub operator_name: String,
    #[arg(long)]
    pub organization: String,
    #[arg(long)]
    pub contact_email: String,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn register(args: RegisterArgs) -> Result<bool> {
    let keypair = super::load_keypair(&args.key_file)?;
    let registration = NodeRegistration::new_signed(&keypair, &args.operator_name, &args.organization, &args.contact_email, Utc::now());

    match args.out {
        Some(path) => {
            fs::write(&path, registration.to_full_text()).with_context(|| format!("writing registration to {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => print!("{}", registration.to_full_text()),
    }
    Ok(true)
}

#[derive(Debug, Args)]
pub struct AttestArgs {
    #[arg(long)]
    pub key_file: PathBuf,
    /// Repeatable domain this node attests it can crawl.
    #[arg(long = "domain")]
    pub domains: Vec<String>,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn attest(args: AttestArgs) -> Result<bool> {
    let keypair = super::load_keypair(&args.key_file)?;
    let attestation = CrawlAttestation::new_signed(&keypair, args.domains, Utc::now());

    match args.out {
        Some(path) => {
            fs::write(&path, attestation.to_full_text()).with_context(|| format!("writing attestation to {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => print!("{}", attestation.to_full_text()),
    }
    Ok(true)
}

#[derive(Debug, Args)]
pub struct VerifyNodeArgs {
    #[arg(long)]
    pub registration_file: PathBuf,
    #[arg(long)]
    pub attestation_file: Option<PathBuf>,
}

pub fn verify_node(args: VerifyNodeArgs) -> Result<bool> {
    let registration_text = fs::read_to_string(&args.registration_file).with_context(|| format!("reading {}", args.registration_file.display()))?;
    let registration = NodeRegistration::from_full_text(&registration_text).context("parsing registration")?;

    let attestation = match &args.attestation_file {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Some(CrawlAttestation::from_full_text(&text).context("parsing attestation")?)
        }
        None => None,
    };

    let profile = NodeProfile { registration, attestation };
    let result = NodeProfileVerifier::verify(&profile);

    if result.valid {
        println!("valid");
    } else {
        println!("invalid");
        for error in &result.errors {
            println!("  - {error}");
        }
    }
    Ok(result.valid)
}
