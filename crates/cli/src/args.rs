//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{LogFormat, LogLevel};

const CONFIG_FILE: &str = "config.toml";
const GENESIS_FILE: &str = "genesis.json";
const KEY_FILE: &str = "miner_private_key.txt";

#[derive(Clone, Debug, Parser)]
#[command(name = "zkscam", about = "ZKscam consensus node")]
pub struct Args {
    /// Home directory holding the config, genesis and key files.
    #[arg(long, global = true, default_value = ".zkscam")]
    pub home: PathBuf,

    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Args {
    pub fn new() -> Self {
        Self::parse()
    }

    pub fn config_file_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    pub fn genesis_file_path(&self) -> PathBuf {
        self.home.join(GENESIS_FILE)
    }

    pub fn key_file_path(&self) -> PathBuf {
        self.home.join(KEY_FILE)
    }
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Write a fresh config, dev genesis and miner key file.
    Init(InitCmd),
    /// Run the node.
    Start(StartCmd),
}

#[derive(Clone, Debug, Parser)]
pub struct InitCmd {
    /// Chain id for the generated genesis.
    #[arg(long, default_value_t = 1)]
    pub chain_id: u64,

    /// Seconds between consecutive blocks.
    #[arg(long)]
    pub period: Option<u64>,

    /// Overwrite existing files.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Clone, Debug, Parser)]
pub struct StartCmd {
    /// Path to the miner key file, overriding the configured one.
    #[arg(long)]
    pub key_file: Option<PathBuf>,
}
