//! SQL composition error types

use thiserror::Error;

/// Result type for SQL composition
pub type Result<T> = std::result::Result<T, SqlError>;

/// Errors from statement composition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SqlError {
    /// Set-returning procedures already produce rows; `row_to_json`
    /// wrapping only applies to the untyped scalar `record`
    #[error("No need to jsonize a result set.")]
    JsonizeResultSet,
}
