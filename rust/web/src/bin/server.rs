//! Match server binary
//!
//! Usage: cargo run -p hilvan_web --bin hilvan-server -- --config hilvan.toml

use clap::Parser;
use hilvan_web::config::{self, CONFIG_PATH_VAR};
use hilvan_web::{init_logging, LogFormat, WebServer};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hilvan-server", version, about = "Hosts real-time card battle matches")]
struct Args {
    /// TOML settings file (overrides HILVAN_CONFIG)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Bind host, overriding file and environment
    #[arg(long)]
    host: Option<String>,
    #[arg(long, short = 'p')]
    port: Option<u16>,
    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_logging(format)?;

    let config_path = args.config.clone();
    let resolved = config::load_from(|key| {
        if key == CONFIG_PATH_VAR {
            if let Some(path) = &config_path {
                return Some(path.display().to_string());
            }
        }
        std::env::var(key).ok()
    })?;

    let mut settings = resolved.settings.clone();
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    settings.validate()?;

    for (field, source) in resolved.sources() {
        tracing::debug!(field, source = ?source, "setting overridden");
    }
    tracing::info!(
        host = %settings.host,
        port = settings.port,
        round_secs = settings.match_settings.round_secs,
        "starting hilvan server"
    );

    let handle = WebServer::new(settings).start().await?;
    tracing::info!(addr = %handle.address(), "server running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    handle.shutdown().await?;
    Ok(())
}
