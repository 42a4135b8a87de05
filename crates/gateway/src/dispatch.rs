//! Request dispatch
//!
//! The single axum fallback handler. Strips the configured URL prefix,
//! splits the response-format extension off the last path dot, optionally
//! extends `X-Forwarded-For`, and resolves the route against the current
//! table snapshot. Holding the snapshot only while looking up keeps reload
//! publication invisible to in-flight requests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::HttpBody;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, Method as HttpMethod};
use axum::response::{IntoResponse, Response};
use pgway_schema::Method;

use crate::error::{GatewayError, Result};
use crate::pipeline::handle_request;
use crate::state::Gateway;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Fallback handler dispatching every request
pub async fn dispatch(State(gw): State<Arc<Gateway>>, request: Request) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_default();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = match handle(&gw, request).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    };

    if let Some(log) = gw.access_log() {
        log.record(
            &remote,
            method.as_str(),
            &path_and_query,
            response.status().as_u16(),
            response.body().size_hint().lower() as usize,
        );
    }

    tracing::debug!(
        method = %method,
        path = %path_and_query,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );

    response
}

async fn handle(gw: &Arc<Gateway>, mut request: Request) -> Result<Response> {
    let path = request.uri().path().to_string();

    let stripped = path
        .strip_prefix(&gw.options.url_prefix)
        .ok_or(GatewayError::PrefixMismatch)?;

    let (route_path, ext) = split_extension(stripped)?;
    let route_path = route_path.to_string();
    let ext = ext.to_string();

    if gw.options.update_forwarded_for {
        if let Some(info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
            let ip = info.0.ip().to_string();
            append_forwarded_for(request.headers_mut(), &ip);
        }
    }

    let method = route_method(request.method()).ok_or(GatewayError::RouteNotFound)?;

    let (route, params) = {
        let table = gw.table();
        let matched = table
            .lookup(method, &route_path)
            .ok_or(GatewayError::RouteNotFound)?;
        (matched.route.clone(), matched.params)
    };

    let (parts, body) = request.into_parts();
    handle_request(gw, &route, params, &ext, parts, body).await
}

fn route_method(method: &HttpMethod) -> Option<Method> {
    match *method {
        HttpMethod::GET => Some(Method::Get),
        HttpMethod::POST => Some(Method::Post),
        HttpMethod::PUT => Some(Method::Put),
        HttpMethod::DELETE => Some(Method::Delete),
        _ => None,
    }
}

/// Split the format extension off the last dot of the path.
///
/// Both a missing dot and an empty trailing extension reject: the format is
/// how the client states what it can parse, so there is no default.
pub fn split_extension(path: &str) -> Result<(&str, &str)> {
    match path.rfind('.') {
        Some(idx) if idx + 1 < path.len() => Ok((&path[..idx], &path[idx + 1..])),
        _ => Err(GatewayError::MissingExtension),
    }
}

/// Append the remote IP to `X-Forwarded-For`, comma-joined after any value
/// an upstream proxy already set
pub fn append_forwarded_for(headers: &mut axum::http::HeaderMap, ip: &str) {
    let joined = match headers.get(FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.is_empty() => format!("{existing},{ip}"),
        _ => ip.to_string(),
    };

    if let Ok(value) = HeaderValue::from_str(&joined) {
        headers.insert(FORWARDED_FOR, value);
    }
}
