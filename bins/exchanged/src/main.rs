//! CLI and HTTP server binary for the matching engine.
//!
//! Three subcommands, mirroring the shape of a typical exchange-service
//! entrypoint: `init` writes a starter config, `validate` checks one without
//! starting anything, and `start` boots the engine (with two in-memory
//! asset ledgers standing in for the external token contracts) and serves
//! it over HTTP when built with the `api` feature.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Address;
use config::{generate_default_config, load_config, save_config, validate_config, EngineConfig};
use ledger::{AssetLedger, InMemoryLedger};
use matching_engine::MatchingEngine;
use observability::{init_logging, LogFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "exchanged", about = "Limit order book matching engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the matching engine, optionally serving its HTTP API.
    Start {
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
        #[arg(long)]
        http_port: Option<u16>,
    },
    /// Validate a configuration file without starting the engine.
    Validate {
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
    },
    /// Write a starter configuration file.
    Init {
        #[arg(long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("exchanged", LogFormat::Pretty)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Start { config, http_port } => start(&config, http_port).await,
        Commands::Validate { config } => validate(&config),
        Commands::Init { output } => init(&output),
    }
}

fn load_and_validate(config_path: &Path) -> Result<EngineConfig> {
    let config = load_config(config_path)?;
    let report = validate_config(&config);

    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message);
    }
    if !report.is_valid() {
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("configuration validation failed ({} error(s))", report.errors.len());
    }
    Ok(config)
}

async fn start(config_path: &Path, http_port_override: Option<u16>) -> Result<()> {
    let config = load_and_validate(config_path)?;
    info!(exchange = %config.exchange.name, "starting matching engine");

    let engine_address = Address::from_u64(u64::MAX);
    let book_ledger: Arc<dyn AssetLedger> = Arc::new(InMemoryLedger::new());
    let price_ledger: Arc<dyn AssetLedger> = Arc::new(InMemoryLedger::new());
    let engine = MatchingEngine::new(engine_address, book_ledger, price_ledger);

    #[cfg(feature = "api")]
    {
        serve(engine, &config, http_port_override).await
    }

    #[cfg(not(feature = "api"))]
    {
        let _ = (engine, http_port_override);
        warn!("built without the `api` feature; nothing to serve, exiting");
        Ok(())
    }
}

#[cfg(feature = "api")]
async fn serve(engine: MatchingEngine, config: &EngineConfig, http_port_override: Option<u16>) -> Result<()> {
    use matching_engine::api::{create_router, ApiState};

    let state = ApiState {
        engine: Arc::new(parking_lot::Mutex::new(engine)),
    };
    let router = create_router(state);

    let bind_address = match http_port_override {
        Some(port) => format!("0.0.0.0:{port}"),
        None => config.observability.bind_address.clone(),
    };

    info!(%bind_address, "serving matching engine API");
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    axum::serve(listener, router)
        .await
        .context("matching engine HTTP server failed")?;
    Ok(())
}

fn validate(config_path: &Path) -> Result<()> {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(%e, "failed to load configuration");
            anyhow::bail!(e);
        }
    };
    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");
    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }
    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        anyhow::bail!("configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!("Exchange: {}", config.exchange.name);
    println!("Version: {}", config.exchange.version);
    println!("Book asset:  {}", config.assets.book_asset);
    println!("Price asset: {}", config.assets.price_asset);
    Ok(())
}

fn init(output_path: &Path) -> Result<()> {
    let config = generate_default_config();
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {parent:?}"))?;
        }
    }
    save_config(&config, output_path)?;

    println!("[ok] Configuration file created at {output_path:?}");
    println!("Next steps:");
    println!("  1. Edit the configuration file to customize settings");
    println!("  2. Run 'exchanged validate --config {output_path:?}' to check it");
    println!("  3. Run 'exchanged start --config {output_path:?}' to start the engine");
    Ok(())
}
