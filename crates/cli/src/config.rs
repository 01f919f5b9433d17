//! `TruthcrawlConfig`: directory layout for every filesystem-backed entity.
//! Loaded from an optional TOML file and overridden by CLI flags, in that
//! order — flags always win.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TruthcrawlConfig {
    pub store_dir: PathBuf,
    pub export_dir: PathBuf,
    pub verification_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub timestamps_dir: PathBuf,
    pub peers_dir: PathBuf,
}

impl Default for TruthcrawlConfig {
    fn default() -> Self {
        TruthcrawlConfig {
            store_dir: PathBuf::from("truthcrawl-data/store"),
            export_dir: PathBuf::from("truthcrawl-data/export"),
            verification_dir: PathBuf::from("truthcrawl-data/verification"),
            profiles_dir: PathBuf::from("truthcrawl-data/profiles"),
            timestamps_dir: PathBuf::from("truthcrawl-data/timestamps"),
            peers_dir: PathBuf::from("truthcrawl-data/peers"),
        }
    }
}

impl TruthcrawlConfig {
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        match config_path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("failed reading config file {}: {e}", path.display()))?;
                let config: TruthcrawlConfig = toml::from_str(&text)
                    .map_err(|e| anyhow::anyhow!("failed parsing config file {}: {e}", path.display()))?;
                Ok(config)
            }
            None => Ok(TruthcrawlConfig::default()),
        }
    }

    pub fn override_store_dir(&mut self, dir: Option<PathBuf>) {
        if let Some(dir) = dir {
            self.store_dir = dir;
        }
    }
}
