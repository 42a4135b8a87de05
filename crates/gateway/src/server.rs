//! Server bootstrap
//!
//! Builds the axum application (one fallback route, tracing, panic barrier,
//! request timeout) and runs it over plain TCP or TLS until the
//! cancellation token fires.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::Full;
use pgway_config::HttpConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dispatch::dispatch;
use crate::error::{GatewayError, Result};
use crate::state::Gateway;
use crate::tls;

/// Assemble the application router
pub fn build_router(gw: Arc<Gateway>, http: &HttpConfig) -> Router {
    let timeout = Duration::from_secs(http.read_timeout_secs + http.write_timeout_secs);

    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TimeoutLayer::new(timeout))
        .with_state(gw)
}

/// Unhandled panics become plain 500s; the response never exposes more than
/// the panic message
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Full<bytes::Bytes>> {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "internal error".to_string()
    };

    tracing::error!(panic = %message, "request handler panicked");

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::from(message))
        .unwrap_or_default()
}

/// Bind and serve until cancellation
pub async fn serve(gw: Arc<Gateway>, http: &HttpConfig, cancel: CancellationToken) -> Result<()> {
    let app = build_router(gw, http);

    let listener = TcpListener::bind(&http.address)
        .await
        .map_err(|e| GatewayError::internal(format!("cannot bind {}: {e}", http.address)))?;

    info!(
        address = %http.address,
        tls = http.tls_enabled(),
        "gateway listening"
    );

    if http.tls_enabled() {
        let config = tls::server_config(
            http.cert_file.as_deref().unwrap_or_default(),
            http.key_file.as_deref().unwrap_or_default(),
            http.client_ca.as_deref(),
        )?;
        tls::serve_tls(listener, config, app, cancel).await
    } else {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| GatewayError::internal(e.to_string()))
    }
}
