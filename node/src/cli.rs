//! # CLI Interface
//!
//! Command-line arguments for `koin-node`, via `clap` derive. Subcommands:
//! `run`, `init`, `balance` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// KOIN ledger node.
///
/// Hosts the KOIN token over a local database, serves its HTTP API and
/// exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "koin-node",
    about = "KOIN ledger node",
    version,
    propagate_version = true
)]
pub struct KoinNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Create the data directory and write a default token config.
    Init(InitArgs),
    /// Print the balance of an account straight from the database.
    ///
    /// The node must not be running: the database is opened exclusively.
    Balance(BalanceArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the token configuration file (JSON).
    ///
    /// When omitted, the node uses `token.json` in the data directory if
    /// present and built-in defaults otherwise.
    #[arg(long, short = 'c', env = "KOIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the ledger database.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "KOIN_DATA_DIR", default_value = ".koin")]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[arg(long, env = "KOIN_RPC_PORT", default_value_t = koin_protocol::config::DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "KOIN_METRICS_PORT", default_value_t = koin_protocol::config::DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Hex-encoded caller identity granted kernel privilege (may mint).
    ///
    /// Without it, no HTTP caller can mint.
    #[arg(long, env = "KOIN_KERNEL_IDENTITY")]
    pub kernel_identity: Option<String>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "KOIN_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to initialize.
    #[arg(long, short = 'd', env = "KOIN_DATA_DIR", default_value = ".koin")]
    pub data_dir: PathBuf,

    /// Overwrite an existing `token.json`.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `balance` subcommand.
#[derive(Parser, Debug)]
pub struct BalanceArgs {
    /// Hex-encoded account key.
    pub owner: String,

    #[arg(long, short = 'd', env = "KOIN_DATA_DIR", default_value = ".koin")]
    pub data_dir: PathBuf,

    #[arg(long, short = 'c', env = "KOIN_CONFIG")]
    pub config: Option<PathBuf>,
}
