//! Filter parsing error types

use thiserror::Error;

/// Result type for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;

/// Errors produced while parsing the filter mini-language
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    /// An operator name that is not part of the grammar
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    /// A literal that is neither null, boolean, number, nor `$`-string
    #[error("invalid filter value '{0}'")]
    InvalidValue(String),

    /// Structure error with byte position in the raw input
    #[error("filter syntax error at byte {position}: {expected}")]
    Syntax {
        /// Byte offset into the raw parameter value
        position: usize,
        /// What the parser was looking for
        expected: &'static str,
    },

    /// A percent-encoded token that does not decode to UTF-8
    #[error("invalid percent-encoding in '{0}'")]
    BadEncoding(String),

    /// Empty field name in a predicate or sort order
    #[error("empty field name")]
    EmptyField,
}
