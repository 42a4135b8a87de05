//! Schema loading error types

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors that can occur while loading routes or building the route table
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Route row carries an HTTP method outside {get, post, put, delete}
    #[error("unknown HTTP method '{0}' in route registry")]
    UnknownMethod(String),

    /// Route row carries an object type outside {relation, procedure}
    #[error("unknown object type '{0}' in route registry")]
    UnknownObjectKind(String),

    /// The configured search path would escape its statement
    #[error("invalid search path: {0}")]
    InvalidSearchPath(String),

    /// Target relation is absent from the catalog
    #[error("could not find relation {0}")]
    RelationNotFound(String),

    /// Target procedure is absent from the catalog
    #[error("could not find procedure {0}")]
    ProcedureNotFound(String),

    /// Cookie declarations of a route failed to deserialize
    #[error("could not parse cookies configuration for {method} {url_path}: {source}")]
    CookieConfig {
        method: String,
        url_path: String,
        #[source]
        source: serde_json::Error,
    },

    /// GET must not execute a procedure with side effects
    #[error("invalid volatility '{volatility}' for GET route on procedure '{procedure}'")]
    VolatileGet {
        procedure: String,
        volatility: char,
    },

    /// Two route rows collide on (method, path)
    #[error("duplicate route {method} {url_path}")]
    DuplicateRoute { method: String, url_path: String },

    /// Placeholder syntax error in a route path
    #[error("invalid route path '{url_path}': {reason}")]
    InvalidPattern {
        url_path: String,
        reason: &'static str,
    },

    /// Constants failed to decode under the introspected types
    #[error("invalid constants for {method} {url_path}: {source}")]
    Constants {
        method: String,
        url_path: String,
        #[source]
        source: pgway_protocol::ProtocolError,
    },

    /// Database failure during the load transaction
    #[error(transparent)]
    Db(#[from] tokio_postgres::Error),
}
