//! Headless update host for stdin/stdout JSON communication.
//!
//! Reads `RequestEnvelope` messages as newline-delimited JSON from stdin,
//! dispatches them through the update gateway, and writes responses,
//! notifications, menu states and dialogs to stdout. Scheduled checks run in
//! the background for the lifetime of the process.
//!
//! Usage: `updraft-host [CONFIG_PATH]` (defaults to
//! `~/.config/updraft/config.toml`).
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use updraft::host::channel::ChannelObserver;
use updraft::host::shell::SystemShell;
use updraft::host::stdio::run_stdio_bridge;
use updraft::update::GithubReleaseTransport;
use updraft::{PlatformCapability, UpdaterConfig, UpdaterService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(UpdaterConfig::default_config_path);
    let config = UpdaterConfig::load_or_default(&config_path)
        .map_err(|e| anyhow::anyhow!("cannot load {}: {e}", config_path.display()))?;

    tracing::info!(config = %config_path.display(), "updraft-host starting");

    let quit = CancellationToken::new();
    let transport = Arc::new(GithubReleaseTransport::new(&config, quit.clone())?);
    let observer = Arc::new(ChannelObserver::new(config.event_capacity));
    let event_tx = observer.sender();

    let service = UpdaterService::new(
        &config,
        PlatformCapability::detect(),
        transport,
        observer.clone(),
        Arc::new(SystemShell),
    )?;
    service.start_periodic_checks();

    let result = run_stdio_bridge(
        Arc::clone(service.gateway()),
        event_tx,
        config.request_capacity,
        quit.clone(),
    )
    .await;

    observer.close();
    service.destroy();

    result.map_err(|e| {
        tracing::error!(error = %e, "updraft-host exited with error");
        anyhow::anyhow!("updraft-host failed: {e}")
    })?;

    if quit.is_cancelled() {
        tracing::info!("installer launched; exiting for update");
    } else {
        tracing::info!("updraft-host shut down cleanly");
    }
    Ok(())
}
