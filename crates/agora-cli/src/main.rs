mod commands;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use crate::commands::{App, Command};
use crate::config::{Config, DEFAULT_LOG_FILTER};

#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(about = "Command-line client for Agora forums")]
struct Cli {
    /// Base URL of the forum API (overrides AGORA_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session file (overrides AGORA_SESSION_PATH)
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(path) = cli.session {
        config.session_path = path;
    }
    debug!("Using API at {}", config.api_url);

    let app = App::open(config)?;
    commands::run(&app, cli.command).await
}
