//! Node configuration file handling.

use std::{fmt, fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};
use zkscam_types::config::ChainSpec;

use crate::{error::Error, runtime::RuntimeConfig};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Human-readable node name used in logs.
    pub moniker: String,
    /// Engine and hard-fork parameters of the chain this node follows.
    pub chain: ChainSpec,
    /// Path to the two-line miner key file (private key, address).
    pub key_file: PathBuf,
    /// Peers required before the sync driver starts on its own.
    pub min_sync_peers: usize,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            moniker: "zkscam-node".to_string(),
            chain: ChainSpec::default(),
            key_file: PathBuf::from("miner_private_key.txt"),
            min_sync_peers: 1,
            runtime: RuntimeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{level}")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plaintext,
    Json,
}

/// Load configuration from file.
pub fn load_config(config_file: &Path) -> Result<NodeConfig, Error> {
    let content =
        fs::read_to_string(config_file).map_err(|_| Error::OpenFile(config_file.to_path_buf()))?;
    toml::from_str(&content).map_err(|e| Error::Parse(e.to_string()))
}

/// Save configuration to file.
pub fn save_config(config_file: &Path, config: &NodeConfig) -> Result<(), Error> {
    let data = toml::to_string_pretty(config).map_err(|e| Error::Parse(e.to_string()))?;
    save(config_file, &data)
}

fn save(path: &Path, data: &str) -> Result<(), Error> {
    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir).map_err(|_| Error::ParentDir(parent_dir.to_path_buf()))?;
    }
    fs::write(path, data).map_err(|_| Error::WriteFile(path.to_path_buf()))
}
