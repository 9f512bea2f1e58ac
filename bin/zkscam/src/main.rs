#![allow(missing_docs)]
//! ZKscam node entry point.

use std::path::Path;

use alloy_primitives::hex;
use color_eyre::eyre::{eyre, Result};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use tracing::{info, trace};
use zkscam_cli::{
    args::{Args, Commands, InitCmd, StartCmd},
    config::{self, LoggingConfig, NodeConfig},
    logging, runtime,
};
use zkscam_crypto::IdentityVault;
use zkscam_node::Node;

/// Main entry point for the application
///
/// This function:
/// - Parses command-line arguments
/// - Loads configuration from file
/// - Initializes logging system
/// - Sets up error handling
/// - Creates and runs the application node
fn main() -> Result<()> {
    color_eyre::install()?;

    // Also forward panics to tracing so they show up alongside node logs.
    // This supplements color-eyre's pretty panic output on stderr.
    install_tracing_panic_hook();

    let args = Args::new();

    // Override logging configuration (if exists) with optional command-line parameters.
    let mut logging = LoggingConfig::default();
    if let Some(log_level) = args.log_level {
        logging.log_level = log_level;
    }
    if let Some(log_format) = args.log_format {
        logging.log_format = log_format;
    }

    // This is a drop guard responsible for flushing any remaining logs when the program terminates.
    // It must be assigned to a binding that is not _, as _ will result in the guard being dropped
    // immediately.
    let _guard = logging::init(logging.log_level, logging.log_format);

    trace!("Command-line parameters: {args:?}");

    match &args.command {
        Commands::Init(cmd) => init(&args, cmd, logging),
        Commands::Start(cmd) => start(&args, cmd, logging),
    }
}

fn install_tracing_panic_hook() {
    use std::panic;

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let msg: &str = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "panic"
        };

        let bt = std::backtrace::Backtrace::force_capture();
        tracing::error!(target = "panic", %location, message = %msg, backtrace = %format!("{bt}"), "panic occurred");

        // Preserve existing behavior (color-eyre pretty report to stderr).
        default_hook(info);
    }));
}

fn init(args: &Args, cmd: &InitCmd, logging: LoggingConfig) -> Result<()> {
    let config_file = args.config_file_path();
    if config_file.exists() && !cmd.force {
        return Err(eyre!("{} already exists, pass --force to overwrite", config_file.display()));
    }

    let mut config = NodeConfig::default();
    config.logging = logging;
    config.chain.chain_id = cmd.chain_id;
    if let Some(period) = cmd.period {
        config.chain.period = period;
    }
    config.key_file = args.key_file_path();

    write_key_file(&config.key_file)?;
    config::save_config(&config_file, &config)?;

    let genesis = zkscam_genesis::build_dev_genesis(&config.chain)?;
    zkscam_genesis::write_genesis(&args.genesis_file_path(), &genesis)?;

    info!(home = %args.home.display(), "initialized node home");
    Ok(())
}

fn start(args: &Args, cmd: &StartCmd, logging: LoggingConfig) -> Result<()> {
    let config_file = args.config_file_path();
    let mut config = config::load_config(&config_file)
        .map_err(|error| eyre!("Failed to load configuration file: {error}"))?;
    config.logging = logging;
    if let Some(key_file) = &cmd.key_file {
        config.key_file = key_file.clone();
    }

    let rt = runtime::build_runtime(config.runtime)?;

    info!(file = %config_file.display(), "Loaded configuration");

    let node = Node {
        home_dir: args.home.clone(),
        genesis_file: args.genesis_file_path(),
        key_file: config.key_file.clone(),
        config,
    };

    rt.block_on(node.run()).map_err(|error| eyre!("Failed to run the node: {error}"))
}

/// Generates a fresh miner key and writes the two-line key file: private
/// key hex, then the derived address.
fn write_key_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let signing_key = SigningKey::random(&mut OsRng);
    let key_bytes = signing_key.to_bytes();

    let vault = IdentityVault::new();
    let address = vault
        .load_from_key_bytes(&key_bytes)
        .map_err(|error| eyre!("generated key failed to load: {error}"))?;

    let contents = format!("{}\n{}\n", hex::encode(key_bytes), address);
    std::fs::write(path, contents)?;
    info!(%address, file = %path.display(), "wrote miner key file");
    Ok(())
}
