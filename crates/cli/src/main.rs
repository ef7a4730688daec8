//! supportdesk CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Write a default config file
//! - `serve`    — Start the HTTP gateway
//! - `chat`     — Interactive or single-message chat against the local store
//! - `history`  — Print a session's committed messages
//! - `seed`     — Load the demo orders, products and warranty policy
//! - `doctor`   — Diagnose config, database and provider

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "supportdesk",
    about = "supportdesk — conversational customer-support backend",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of ~/.supportdesk/config.toml
    #[arg(short, long, global = true, env = "SUPPORTDESK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the support agent
    Chat {
        /// Session to continue
        #[arg(short, long, default_value = "cli")]
        session: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Print a session's committed messages
    History {
        #[arg(short, long)]
        session: String,

        /// Print raw JSON instead of a transcript
        #[arg(long)]
        raw: bool,
    },

    /// Seed demo reference data
    Seed,

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Serve { host, port } => commands::serve::run(config_path, host, port).await?,
        Commands::Chat { session, message } => commands::chat::run(config_path, &session, message).await?,
        Commands::History { session, raw } => commands::history::run(config_path, &session, raw).await?,
        Commands::Seed => commands::seed::run(config_path).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
