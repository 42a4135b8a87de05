//! Serve command
//!
//! Connects, loads the initial route table, spawns the reload listener, and
//! serves until SIGINT/SIGTERM. Shutdown cancels the listener and lets
//! in-flight requests finish.

use anyhow::{Context, Result};
use pgway_config::Config;
use pgway_gateway::{serve, spawn_reload_listener, Gateway};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn run(config: Config) -> Result<()> {
    let gateway = Gateway::connect(&config)
        .await
        .context("connecting to PostgreSQL")?;

    let cancel = CancellationToken::new();
    let listener = spawn_reload_listener(gateway.clone(), cancel.clone());

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown requested");
        shutdown.cancel();
    });

    info!("pgway started");
    serve(gateway, &config.http, cancel).await?;

    let _ = listener.await;
    info!("pgway stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut interrupt =
            signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        let mut terminate =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
