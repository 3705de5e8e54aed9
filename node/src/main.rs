// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # KOIN Node
//!
//! Entry point for the `koin-node` binary. Parses CLI arguments, opens the
//! ledger database, and serves the HTTP API and the metrics endpoint.
//!
//! Subcommands:
//!
//! - `run`     — start the node
//! - `init`    — create the data directory and a default `token.json`
//! - `balance` — read one balance from the database and exit
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;

use koin_contracts::Token;
use koin_protocol::config::TokenConfig;
use koin_protocol::storage::KoinDB;
use koin_protocol::AccountKey;

use cli::{Commands, KoinNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Name of the token configuration file inside the data directory.
const CONFIG_FILE_NAME: &str = "token.json";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = KoinNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => {
            logging::init_logging("koin_node=info", LogFormat::Pretty);
            init_node(args)
        }
        Commands::Balance(args) => print_balance(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Start the node: open the ledger, then serve the API and metrics until a
/// shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "koin_node=info,koin_contracts=info,tower_http=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let config = load_config(args.config.as_deref(), &args.data_dir)?;
    let kernel = args
        .kernel_identity
        .as_deref()
        .map(str::parse::<AccountKey>)
        .transpose()
        .context("invalid kernel identity")?;

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        symbol = %config.symbol,
        regen_window_ms = config.regen_window_ms,
        "starting koin-node"
    );
    if kernel.is_none() {
        tracing::warn!("no kernel identity configured, minting is disabled");
    }

    // --- Persistent storage ---
    let db = open_db(&args.data_dir)?;
    let token = Token::new(db.clone(), config);

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    let supply = token
        .total_supply()
        .context("failed to read total supply")?;
    node_metrics.set_total_supply(supply);
    tracing::info!(total_supply = supply, "ledger loaded");

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            koin_protocol::config::PROTOCOL_VERSION,
        ),
        token: Arc::new(Mutex::new(token)),
        db: db.clone(),
        kernel,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    db.flush().context("failed to flush database on shutdown")?;
    tracing::info!("koin-node stopped");
    Ok(())
}

/// Create the data directory and write the default token configuration.
fn init_node(args: cli::InitArgs) -> Result<()> {
    let data_dir = &args.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let config_path = data_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let config = TokenConfig::default();
    let json = serde_json::to_string_pretty(&config)?;
    std::fs::write(&config_path, json)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    tracing::info!(path = %config_path.display(), "token config written");

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Token config   : {}", config_path.display());
    println!("  Token          : {} ({})", config.name, config.symbol);

    Ok(())
}

/// Print the balance of one account and exit.
fn print_balance(args: cli::BalanceArgs) -> Result<()> {
    let owner: AccountKey = args.owner.parse().context("invalid owner")?;
    let config = load_config(args.config.as_deref(), &args.data_dir)?;
    let token = Token::new(open_db(&args.data_dir)?, config);

    let balance = token
        .balance_of(&owner)
        .with_context(|| format!("failed to read balance of {}", owner))?;
    println!("{} {} {}", owner, balance, token.symbol());
    Ok(())
}

/// Resolve the token configuration: an explicit path, then `token.json` in
/// the data directory, then built-in defaults.
fn load_config(explicit: Option<&Path>, data_dir: &Path) -> Result<TokenConfig> {
    let path: Option<PathBuf> = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => Some(data_dir.join(CONFIG_FILE_NAME)).filter(|p| p.exists()),
    };

    let config = match path {
        Some(p) => TokenConfig::from_json_file(&p)
            .with_context(|| format!("failed to load token config from {}", p.display()))?,
        None => {
            let config = TokenConfig::default();
            config.validate()?;
            config
        }
    };
    Ok(config)
}

fn open_db(data_dir: &Path) -> Result<KoinDB> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = KoinDB::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database opened");
    Ok(db)
}

fn print_version() {
    println!("koin-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", koin_protocol::config::PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
