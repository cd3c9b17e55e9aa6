//! Usta Web Server
//!
//! HTTP API for the services marketplace.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use usta_core::init_logging;
use usta_web::{server::UstaServerBuilder, WebConfig};

/// Usta Web Server - phone login, master directory and service requests
#[derive(Parser)]
#[command(name = "usta-web")]
#[command(about = "HTTP API for the Usta services marketplace")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable development mode (fixed one-time code, pretty logs)
    #[arg(long)]
    dev: bool,

    /// Database URL, e.g. sqlite:usta.db
    #[arg(long)]
    database_url: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, mut config: WebConfig) -> WebConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config.dev_mode |= self.dev;
        if self.database_url.is_some() {
            config.database_url = self.database_url;
        }
        if self.log_level.is_some() {
            config.log_level = self.log_level;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = WebConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let config = args.apply(config);

    let usta_config = config.usta_config().context("Invalid configuration")?;
    init_logging(&usta_config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let server = UstaServerBuilder::from_config(config)
        .build()
        .await
        .context("Failed to build server")?;

    server.start().await.context("Server failed")?;
    Ok(())
}
