mod commands;
mod metrics;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mangaroute_core::{load_config, validate_config, BatoClient, Config, ConfigError, MirrorManager};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "mangaroute", version = VERSION)]
#[command(about = "Search Bato mirrors with automatic mirror fallback", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(long, global = true, env = "MANGAROUTE_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Print collected metrics to stderr when the command finishes
    #[arg(long, global = true)]
    metrics: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search series by title
    Search {
        /// Search query
        query: String,
        /// Maximum number of result pages to fetch
        #[arg(long)]
        pages: Option<u32>,
    },

    /// Show series metadata and its chapters
    Series {
        /// Series URL on any mirror
        url: String,
    },

    /// List the page images of a chapter
    Chapter {
        /// Chapter URL on any mirror
        url: String,
    },

    /// Manage the mirror list
    Mirrors {
        #[command(subcommand)]
        action: MirrorAction,
    },
}

#[derive(Subcommand)]
enum MirrorAction {
    /// List configured mirrors, marking the active one
    List,
    /// Add a mirror from a search URL copied from the browser
    Add {
        /// Search URL, e.g. https://bato.to/v4x-search?type=comic&word=x
        url: String,
    },
    /// Remove the mirror at an index
    Remove { index: usize },
    /// Move a mirror to another position
    Move { from: usize, to: usize },
    /// Restore the built-in mirrors
    Reset,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(path)) => {
            info!("No config file at {}, using defaults", path);
            Config::default()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to load config from {:?}", cli.config))
        }
    };

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let mirrors = Arc::new(MirrorManager::from_config(&config.mirrors));
    if let Some(path) = mirrors.path() {
        info!("Mirror list: {:?}", path);
    }

    // Cancel in-flight requests on Ctrl+C
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling requests");
            token.cancel();
        }
    });

    let client = || -> Result<BatoClient> {
        Ok(BatoClient::new(&config.client, mirrors.clone())
            .context("Failed to create client")?
            .with_cancellation(&config.client, cancel.clone()))
    };

    let result = match cli.command {
        Commands::Search { query, pages } => {
            commands::search(&client()?, &query, pages, cli.json).await
        }
        Commands::Series { url } => commands::series(&client()?, &url, cli.json).await,
        Commands::Chapter { url } => commands::chapter(&client()?, &url, cli.json).await,
        Commands::Mirrors { action } => match action {
            MirrorAction::List => commands::list_mirrors(&mirrors, cli.json),
            MirrorAction::Add { url } => commands::report(mirrors.add_mirror_from_url(&url)),
            MirrorAction::Remove { index } => commands::report(mirrors.remove_mirror(index)),
            MirrorAction::Move { from, to } => commands::report(mirrors.move_mirror(from, to)),
            MirrorAction::Reset => commands::report(Ok(mirrors.reset_to_defaults())),
        },
    };

    if cli.metrics {
        eprint!("{}", metrics::encode_metrics()?);
    }
    result
}
