mod config;
mod error;
mod extractor;
mod handlers;
mod mcp;
mod parser;
mod project;

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use mcp::server::McpServer;

const APP_NAME: &str = "code-snippet-mcp";

/// Load the first .env file found:
/// 1. Current working directory
/// 2. XDG config directory ~/.config/code-snippet-mcp/.env
///
/// Variables already set in the shell are never overridden.
fn load_env_files() {
    let candidates = std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".env"))
        .into_iter()
        .chain(get_xdg_config_dir().map(|dir| dir.join(APP_NAME).join(".env")));

    for path in candidates {
        if path.exists() && dotenv::from_path(&path).is_ok() {
            tracing::debug!("Loaded .env from: {}", path.display());
            return;
        }
    }

    tracing::debug!("No .env file found, using environment variables only");
}

/// Get XDG config directory, fallback to ~/.config
fn get_xdg_config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_files();

    // Logs go to stderr, stdout carries the protocol
    let env_filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("error"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    tracing::info!("Starting {} server...", APP_NAME);

    let config = Config::from_env();
    McpServer::new(config).start().await?;

    Ok(())
}
