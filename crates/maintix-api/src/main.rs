//! # maintix-api
//!
//! Live-update server binary: loads settings, starts the hub and the
//! WebSocket server, and runs until Ctrl-C.

#![deny(unsafe_code)]

mod logging;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use maintix_server::metrics::install_recorder;
use maintix_server::{MaintixServer, ServerConfig};
use maintix_settings::MaintixSettings;

/// Grace period for connections to close on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// maintix live-update server.
#[derive(Parser, Debug)]
#[command(name = "maintix-api", about = "maintix live-update server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (defaults to `~/.maintix/settings.json`).
    #[arg(long, env = "MAINTIX_SETTINGS")]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Load settings from the chosen file and apply CLI overrides.
    fn resolve_settings(&self) -> Result<MaintixSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(maintix_settings::settings_path);
        let mut settings = maintix_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.resolve_settings()?;

    logging::init(&settings.logging);

    let metrics = match install_recorder() {
        Ok(handle) => Some(handle),
        Err(error) => {
            tracing::warn!(%error, "metrics recorder unavailable, /metrics disabled");
            None
        }
    };

    let server = MaintixServer::new(ServerConfig::from(&settings), metrics);
    // Ticket mutations reach clients once a service publishes through the hub,
    // e.g. `TicketService::new(..).with_publisher(server.publisher())`.
    // This process only hosts the hub; CRUD routing lives elsewhere.
    let (addr, serve) = server
        .listen()
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                settings.server.host, settings.server.port
            )
        })?;
    tracing::info!(%addr, "maintix-api ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.stop(serve, Some(SHUTDOWN_TIMEOUT)).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
