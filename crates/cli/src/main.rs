//! ragchat CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Start the HTTP gateway
//! - `ingest`  — Index every file in a directory
//! - `query`   — Show the chunks retrieved for a question
//! - `route`   — Show what the tool router does with a message

use clap::{Parser, Subcommand};
use ragchat_config::LoggingConfig;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "ragchat — streaming chat with retrieval and tool routing",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $RAGCHAT_CONFIG or ~/.ragchat/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chunk, embed, and index every file in a directory
    Ingest {
        /// Directory to ingest (not recursive)
        dir: PathBuf,
    },

    /// Retrieve the chunks nearest to a question
    Query {
        text: String,

        /// Number of chunks to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Run a message through the tool router
    Route { text: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    init_tracing(&cli, &config.logging)?;

    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Ingest { dir } => commands::ingest::run(config, &dir).await?,
        Commands::Query { text, top_k } => commands::query::run(config, &text, top_k).await?,
        Commands::Route { text } => commands::route::run(config, &text).await?,
    }

    Ok(())
}

/// `RUST_LOG` wins, then `--verbose`, then `[logging] level`.
fn init_tracing(cli: &Cli, logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let fallback = if cli.verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = cli.json_logs || logging.json;
    let log_file = cli.log_file.clone().or_else(|| logging.file.clone());
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| format!("Failed to open log file {}: {e}", path.display()))?;
            let writer = std::sync::Mutex::new(file);
            if json {
                builder.json().with_writer(writer).init();
            } else {
                builder.with_ansi(false).with_writer(writer).init();
            }
        }
        None if json => builder.json().with_writer(std::io::stderr).init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
