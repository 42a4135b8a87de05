//! Route reload listener
//!
//! A dedicated (non-pooled) connection LISTENs on the configured channel.
//! Each matching notification rebuilds the route table; a failed rebuild
//! logs and leaves the current table serving. The loop reconnects on
//! connection loss and exits when the cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{stream, StreamExt};
use pgway_sql::quote_identifier;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_postgres::{AsyncMessage, Client, Connection, NoTls, Socket};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::state::Gateway;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const WAIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Spawn the background listener. Does nothing and exits immediately when
/// no updates channel is configured.
pub fn spawn_reload_listener(gw: Arc<Gateway>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let channel = gw.options.updates_channel.clone();
        if channel.is_empty() {
            return;
        }

        info!(channel = %channel, "listening for route updates");

        while !cancel.is_cancelled() {
            match listen_once(&gw, &channel, &cancel).await {
                Ok(()) => break, // cancelled
                Err(error) => {
                    warn!(error = %error, "route listener disconnected");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }

        info!("route listener stopped");
    })
}

/// One connection's lifetime: connect with the gateway's database TLS
/// settings, LISTEN, then wait for notifications until the connection drops
/// or the token cancels
async fn listen_once(
    gw: &Gateway,
    channel: &str,
    cancel: &CancellationToken,
) -> Result<(), String> {
    match gw.pg_tls() {
        Some(tls) => {
            let (client, connection) = gw
                .pg_config()
                .connect(tls.clone())
                .await
                .map_err(|e| e.to_string())?;
            wait_for_notifications(gw, channel, cancel, client, connection).await
        }
        None => {
            let (client, connection) = gw
                .pg_config()
                .connect(NoTls)
                .await
                .map_err(|e| e.to_string())?;
            wait_for_notifications(gw, channel, cancel, client, connection).await
        }
    }
}

async fn wait_for_notifications<S>(
    gw: &Gateway,
    channel: &str,
    cancel: &CancellationToken,
    client: Client,
    mut connection: Connection<Socket, S>,
) -> Result<(), String>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn(async move {
        let mut messages = stream::poll_fn(move |cx| connection.poll_message(cx));
        while let Some(message) = messages.next().await {
            match message {
                Ok(AsyncMessage::Notification(n)) => {
                    let _ = notify_tx.send(n);
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(error = %error, "route listener connection error");
                    break;
                }
            }
        }
    });

    let listen = client
        .batch_execute(&format!("LISTEN {}", quote_identifier(channel)))
        .await;
    if let Err(error) = listen {
        driver.abort();
        return Err(error.to_string());
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                driver.abort();
                return Ok(());
            }
            notification = tokio::time::timeout(WAIT_TIMEOUT, notify_rx.recv()) => {
                match notification {
                    // bounded wait elapsed with nothing to do
                    Err(_) => continue,
                    Ok(None) => {
                        return Err("notification stream ended".to_string());
                    }
                    Ok(Some(n)) if n.channel() == channel => {
                        info!("route reload requested");
                        if let Err(error) = gw.reload().await {
                            warn!(error = %error, "route reload failed; keeping current table");
                        }
                    }
                    Ok(Some(_)) => {}
                }
            }
        }
    }
}
