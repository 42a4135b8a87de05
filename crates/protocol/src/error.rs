//! Protocol error types

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while decoding values or encoding responses
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A client value did not parse under the declared parameter type
    #[error("invalid value for {type_name} parameter: {reason}")]
    InvalidValue {
        /// Declared PostgreSQL type name
        type_name: String,
        /// What went wrong
        reason: String,
    },

    /// The accumulated response exceeded the configured cap
    #[error("Response too long.")]
    ResponseTooLong,

    /// Batch bodies are only representable in some formats
    #[error("Batch mode not supported by {0} format.")]
    BatchUnsupported(&'static str),

    /// The binary format carries a single scalar, nothing structural
    #[error("{0} not supported by binary format.")]
    StructureUnsupported(&'static str),

    /// A second scalar reached the binary encoder
    #[error("Binary format may contain only one scalar value.")]
    MultipleScalars,

    /// No column decoder is registered for this type OID
    #[error("no decoder for column type {0}")]
    UnsupportedColumnType(String),

    /// Spreadsheet serialization failure
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Driver-level failure while reading a row
    #[error(transparent)]
    Db(#[from] tokio_postgres::Error),
}

impl ProtocolError {
    /// Create an InvalidValue error
    pub fn invalid_value(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}
