//! Gateway error types
//!
//! Every failure funnels into `GatewayError`; the `IntoResponse` impl maps
//! it to a status code with the short message as a plain-text body. Stack
//! context stays in the logs.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while serving a request
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request path lies outside the configured URL prefix
    #[error("No routes in this path.")]
    PrefixMismatch,

    /// Request path carries no format extension
    #[error("Extension in path expected in URL.")]
    MissingExtension,

    /// No route matches (method, path)
    #[error("no route matches this path")]
    RouteNotFound,

    /// Extension resolves to no encoder
    #[error("Requested format unsupported.")]
    UnknownFormat,

    /// Body exceeded the configured cap
    #[error("Request body too large.")]
    BodyTooLarge,

    /// Body failed to parse
    #[error("{0}")]
    InvalidBody(String),

    /// Limit query parameter failed to parse
    #[error("invalid limit value: {0}")]
    InvalidLimit(String),

    /// POST fills rows; a filter has nothing to select
    #[error("post requests on relations do not support filters.")]
    FilterOnPost,

    /// PUT applies one update; batch bodies are ambiguous
    #[error("put requests on relations do not support batch mode.")]
    BatchPut,

    /// A column definition list is required for functions returning record
    #[error("Functions returning setof record not supported.")]
    SetofRecord,

    /// Basic credentials only travel over TLS
    #[error("Authorization denied over unencrypted connections.")]
    InsecureAuthorization,

    /// Credential verification against the role store failed
    #[error("Incorrect credentials.")]
    IncorrectCredentials,

    /// Response assembly failure (header values, body building)
    #[error("internal error: {0}")]
    Internal(String),

    /// Filter mini-language parse failure
    #[error(transparent)]
    Filter(#[from] pgway_filter::FilterError),

    /// Value decode or encode failure
    #[error(transparent)]
    Protocol(#[from] pgway_protocol::ProtocolError),

    /// Statement composition failure
    #[error(transparent)]
    Sql(#[from] pgway_sql::SqlError),

    /// Route loading failure
    #[error(transparent)]
    Schema(#[from] pgway_schema::SchemaError),

    /// Database failure
    #[error(transparent)]
    Db(#[from] tokio_postgres::Error),

    /// Connection pool failure
    #[error(transparent)]
    Pool(#[from] deadpool_postgres::PoolError),
}

impl GatewayError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PrefixMismatch => StatusCode::BAD_REQUEST,
            Self::MissingExtension => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create an Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::warn!(error = %message, "request failed");
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}
