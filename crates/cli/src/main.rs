//! Quell CLI - quell command

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

mod cmd;
mod system_config;

/// Quell - Debounce bursts of REST and GraphQL calls
#[derive(Parser)]
#[command(name = "quell")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Show how the current settings classify a call
    Classify {
        /// Request URL
        #[arg(long)]
        url: String,
        /// HTTP method
        #[arg(long, default_value = "GET")]
        method: String,
        /// Request body
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,
        /// Read the request body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,
    },
    /// Replay a JSON trace of timed calls through the interceptor
    Replay {
        /// Trace file
        trace: PathBuf,
        /// Simulated network latency
        #[arg(long, default_value = "0")]
        latency_ms: u64,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Get a single value (e.g. debounce.delay_ms)
    Get {
        key: String,
    },
    /// Set a single value; pattern lists are comma-separated
    Set {
        key: String,
        value: String,
    },
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(),
            ConfigCommands::Get { key } => cmd::config::run_get(&key),
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value),
            ConfigCommands::Path { create } => cmd::config::run_path(create),
            ConfigCommands::Example => cmd::config::run_example(),
        },
        Commands::Classify { url, method, body, body_file } => {
            cmd::classify::run(&method, &url, body, body_file)
        }
        Commands::Replay { trace, latency_ms } => cmd::replay::run(&trace, latency_ms).await,
    }
}

/// `--verbose` wins; otherwise the configured level, or warn if the config
/// cannot be read
fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => system_config::load()
            .ok()
            .and_then(|config| config.log.level.parse().ok())
            .unwrap_or(Level::WARN),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
