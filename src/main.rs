//! # daybrief CLI
//!
//! The `daybrief` binary drives ingestion, retrieval and briefing
//! generation against a local SQLite index.
//!
//! ## Usage
//!
//! ```bash
//! daybrief --config ./config/daybrief.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `daybrief init` | Create the SQLite database and schema |
//! | `daybrief ingest --user <id> <file>` | Ingest a JSON file of tagged messages |
//! | `daybrief add --user <id> --source <type> "<text>"` | Store one free-text document |
//! | `daybrief query --user <id> "<query>"` | Similarity search over one user's documents |
//! | `daybrief recent` | Entries from the last N days, newest first |
//! | `daybrief delete --user <id>` | Delete a user's documents |
//! | `daybrief stats` | Index statistics |
//! | `daybrief briefing --user <id>` | Generate the daily briefing |
//! | `daybrief analyze --type <kind> <file>` | Analyze a single document |
//!
//! ## Examples
//!
//! ```bash
//! daybrief init
//! daybrief ingest --user 7 ./inbox.json
//! daybrief query --user 7 "quarterly review" -n 3 --source email
//! GROQ_API_KEY=... daybrief briefing --user 7
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides `--log-level`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use daybrief::config::{self, DEFAULT_CONFIG_PATH};
use daybrief::{briefing, ingest, migrate, search, stats};

/// daybrief: ingest your messages, get a prioritized daily briefing.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file at the default path means all defaults.
#[derive(Parser)]
#[command(
    name = "daybrief",
    about = "daybrief: a local-first daily briefing engine",
    version,
    long_about = "daybrief ingests email, calendar and chat messages into a local vector index, \
    then runs email, calendar, social and priority analysis units over a chat model to \
    produce one prioritized daily briefing."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level for stderr output (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Ingest a JSON file holding one message or an array of messages.
    ///
    /// Each message is tagged by `kind`: `email`, `calendar_event`,
    /// `social` or `generic`.
    Ingest {
        /// Owner of the ingested documents.
        #[arg(long)]
        user: i64,
        /// Path to the JSON file.
        file: PathBuf,
    },

    /// Store a single free-text document.
    Add {
        #[arg(long)]
        user: i64,
        /// Source type recorded in metadata (e.g. `notes`, `email`).
        #[arg(long)]
        source: String,
        text: String,
    },

    /// Similarity search over one user's documents.
    Query {
        #[arg(long)]
        user: i64,
        /// Maximum results (default: `retrieval.default_results`).
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Restrict to one source type.
        #[arg(long)]
        source: Option<String>,
        query: String,
    },

    /// Entries from the last N days, newest first.
    Recent {
        /// Window in days (default: `retrieval.recent_days`).
        #[arg(long)]
        days: Option<i64>,
        /// Maximum entries (default: `retrieval.scan_limit`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Delete a user's documents, optionally only one source type.
    Delete {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        source: Option<String>,
    },

    /// Show index statistics.
    Stats,

    /// Generate the daily briefing for a user.
    Briefing {
        #[arg(long)]
        user: i64,
    },

    /// Analyze one document with the unit matching its type.
    ///
    /// `email` and `calendar` use their units; `whatsapp`, `instagram`,
    /// `telegram` and other chat types use the social unit; anything else
    /// goes to the priority unit.
    Analyze {
        /// Document type (e.g. `email`, `calendar`, `telegram`, `report`).
        #[arg(long = "type")]
        document_type: String,
        /// File to analyze, or `-` for stdin.
        file: PathBuf,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else if cli.config == PathBuf::from(DEFAULT_CONFIG_PATH) {
        config::parse_config("")?
    } else {
        anyhow::bail!("Config file not found: {}", cli.config.display());
    };

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { user, file } => {
            ingest::run_ingest(&cfg, user, &file).await?;
        }
        Commands::Add { user, source, text } => {
            ingest::run_add(&cfg, user, &source, &text).await?;
        }
        Commands::Query {
            user,
            limit,
            source,
            query,
        } => {
            search::run_query(&cfg, user, &query, limit, source.as_deref()).await?;
        }
        Commands::Recent { days, limit } => {
            search::run_recent(&cfg, days, limit).await?;
        }
        Commands::Delete { user, source } => {
            search::run_delete(&cfg, user, source.as_deref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Briefing { user } => {
            briefing::run_briefing(&cfg, user).await?;
        }
        Commands::Analyze {
            document_type,
            file,
        } => {
            briefing::run_analyze(&cfg, &document_type, &file).await?;
        }
    }

    Ok(())
}
