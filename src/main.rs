//! Atlas-GRAG CLI - main entry point

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use atlas_grag::commands::{self, QueryArgs};
use atlas_grag::{metrics, Config};

#[derive(Parser)]
#[command(name = "atlas_grag")]
#[command(about = "Hybrid graph + vector retrieval for supply-chain questions", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a YAML config file (defaults to ./atlas.yml when present)
    #[arg(long, env = "ATLAS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve fused document + graph context for a question
    Query {
        /// Natural-language question
        question: String,

        /// Skip entity extraction and graph traversal
        #[arg(long, default_value_t = false, conflicts_with = "fallback")]
        vector_only: bool,

        /// Probe the graph store first and go vector-only when it is down
        #[arg(long, default_value_t = false)]
        fallback: bool,

        /// Number of document chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,

        /// Print the full result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Check Neo4j, Qdrant and Ollama availability
    Health {
        /// Print statuses as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    };

    // Initialize logging; RUST_LOG wins over the configured level
    let directive = config
        .as_ref()
        .map(|c| c.log_directive())
        .unwrap_or_else(|_| "atlas_grag=info".to_string());
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&directive))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config?;
    info!("Starting Atlas-GRAG v{}", env!("CARGO_PKG_VERSION"));
    info!(config = ?config.redacted(), "Configuration loaded");

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    match cli.command {
        Commands::Query {
            question,
            vector_only,
            fallback,
            top_k,
            json,
        } => {
            let args = QueryArgs {
                question,
                vector_only,
                fallback,
                top_k,
                json,
            };
            commands::query_run(config, args).await?;
        }
        Commands::Health { json } => {
            commands::health_run(&config, json).await?;
        }
    }

    Ok(())
}
