//! # Newsletter Context CLI (`nlctx`)
//!
//! The `nlctx` binary drives the newsletter retrieval engine: validate and
//! load pre-embedded newsletter bundles, run one-off queries, and start the
//! HTTP query API.
//!
//! ## Usage
//!
//! ```bash
//! nlctx --config ./config/nlctx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nlctx ingest <file>` | Validate a bundle file and report its counts |
//! | `nlctx query "<query>"` | Run a retrieval query against loaded bundles |
//! | `nlctx serve` | Start the HTTP query API |
//!
//! ## Examples
//!
//! ```bash
//! # Check a bundle file produced by the ingestion pipeline
//! nlctx ingest ./data/bundles.json
//!
//! # Query the last week of newsletters
//! nlctx query "ai funding rounds" --data ./data/bundles.json --days 7
//!
//! # Serve the API with the corpus loaded at startup
//! nlctx serve --data ./data/bundles.json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use newsletter_context::config;
use newsletter_context::embedding;
use newsletter_context::engine::RetrievalEngine;
use newsletter_context::ingest;
use newsletter_context::limiter::AdmissionController;
use newsletter_context::models::ContextQuery;
use newsletter_context::server;
use newsletter_context::store::ChunkStore;

/// Newsletter Context CLI — recency-windowed semantic retrieval over
/// ingested newsletters.
#[derive(Parser)]
#[command(
    name = "nlctx",
    about = "Newsletter Context — recency-windowed semantic retrieval over ingested newsletters",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/nlctx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Validate a bundle file and report newsletter/chunk counts.
    ///
    /// Parses the JSON bundle file, applies every append against a fresh
    /// store, and reports what a server would load. Duplicate chunk ids and
    /// malformed bundles are reported as errors.
    Ingest {
        /// Path to the JSON bundle file.
        file: PathBuf,
    },

    /// Run a single retrieval query.
    ///
    /// Loads the given bundle files, embeds the query with the configured
    /// provider, and prints the ranked chunks.
    Query {
        /// The query text.
        query: String,

        /// Bundle file(s) to load before querying.
        #[arg(long = "data")]
        data: Vec<PathBuf>,

        /// Recency window in days.
        #[arg(long)]
        days: Option<i64>,

        /// Maximum number of chunks to return (1-50).
        #[arg(long)]
        max_results: Option<usize>,
    },

    /// Start the HTTP query API.
    ///
    /// Loads the given bundle files into the store, then binds to the
    /// address configured in `[server].bind`.
    Serve {
        /// Bundle file(s) to load at startup.
        #[arg(long = "data")]
        data: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { file } => {
            let store = ChunkStore::new();
            let stats = ingest::ingest_file(&store, &file)?;
            println!(
                "ok: {} newsletters, {} chunks",
                stats.newsletters, stats.chunks
            );
        }
        Commands::Query {
            query,
            data,
            days,
            max_results,
        } => {
            let cfg = config::load_config(&cli.config)?;

            let store = Arc::new(ChunkStore::new());
            for path in &data {
                ingest::ingest_file(&store, path)?;
            }

            let embedder: Arc<dyn embedding::QueryEmbedder> =
                Arc::from(embedding::create_embedder(&cfg.embedding)?);
            let limiter = Arc::new(AdmissionController::new(&cfg.rate_limit));
            let engine = RetrievalEngine::new(
                store,
                embedder,
                limiter,
                Duration::from_millis(cfg.retrieval.retry_backoff_ms),
            );

            let request = ContextQuery {
                user_query: query,
                days: days.unwrap_or(cfg.retrieval.default_days),
                max_results: max_results.unwrap_or(cfg.retrieval.default_max_results),
            };

            let response = engine.query("cli", &request).await?;

            if response.count == 0 {
                println!("No results.");
                return Ok(());
            }

            for (i, chunk) in response.chunks.iter().enumerate() {
                println!(
                    "{}. [{:.3}] {} / {}",
                    i + 1,
                    chunk.score,
                    chunk.metadata.newsletter_name,
                    chunk.metadata.subject
                );
                println!("    date: {}", chunk.metadata.date.format("%Y-%m-%d"));
                println!("    url: {}", chunk.metadata.primary_url);
                println!(
                    "    excerpt: \"{}\"",
                    chunk.content.replace('\n', " ").trim()
                );
                println!();
            }
        }
        Commands::Serve { data } => {
            let cfg = config::load_config(&cli.config)?;

            let store = Arc::new(ChunkStore::new());
            for path in &data {
                let stats = ingest::ingest_file(&store, path)?;
                println!(
                    "loaded {}: {} newsletters, {} chunks",
                    path.display(),
                    stats.newsletters,
                    stats.chunks
                );
            }

            server::run_server(&cfg, store).await?;
        }
    }

    Ok(())
}
