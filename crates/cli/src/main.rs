use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinemux_core::{load_config, Hub};

/// Browse and resolve content across configured sources
#[derive(Debug, Parser)]
#[command(name = "cinemux", version)]
#[command(about = "Aggregate catalogs across sources and resolve stream links", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "CINEMUX_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Dump Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List configured categories
    Categories,
    /// List a category's merged catalog
    Catalog {
        /// Category id
        id: String,
    },
    /// Search every source
    Search {
        /// Free-text query
        query: String,
    },
    /// Load details and episode tokens for a token
    Details {
        token: String,
    },
    /// Print stream links for a token as they are found
    Resolve {
        token: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON lines only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,cinemux_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let hub = load_hub(&cli.config)?;

    match cli.command {
        Commands::Categories => {
            for category in hub.categories() {
                print_line(category)?;
            }
        }
        Commands::Catalog { id } => {
            for listing in hub.list_catalog(&id).await {
                print_line(&listing)?;
            }
        }
        Commands::Search { query } => {
            for listing in hub.search(&query).await {
                print_line(&listing)?;
            }
        }
        Commands::Details { token } => {
            if let Some(details) = hub.load_details(&token).await {
                print_line(&details)?;
            }
        }
        Commands::Resolve { token } => {
            let found = hub
                .resolve(&token, |link| {
                    if let Err(e) = print_line(&link) {
                        warn!(error = %e, "Failed to print stream link");
                    }
                })
                .await;
            if !found {
                info!("No stream links found");
            }
        }
    }

    if cli.metrics {
        eprint!("{}", encode_metrics()?);
    }

    Ok(())
}

fn load_hub(path: &Path) -> Result<Hub> {
    info!("Loading configuration from {:?}", path);
    let config =
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    Hub::from_config(&config).context("Failed to initialize sources")
}

fn print_line<T: Serialize>(value: &T) -> Result<()> {
    let line = serde_json::to_string(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    Ok(())
}

fn encode_metrics() -> Result<String> {
    let registry = Registry::new();
    for metric in cinemux_core::metrics::all_metrics() {
        registry.register(metric)?;
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
