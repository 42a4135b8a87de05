//! pgway SQL composition
//!
//! Builds every statement the gateway executes. Two rules hold everywhere:
//!
//! - values reach the query exclusively as positional `$N` parameters;
//! - identifiers reach the query exclusively through [`quote_identifier`],
//!   and are sourced from introspected catalog data or reserved strings,
//!   never verbatim from the client.
//!
//! The statement builders append to a [`SqlBuilder`]; the predicate
//! translator walks the filter AST and renders each operator per the
//! documented SQL mapping.

mod builder;
mod error;
mod predicate;
mod statements;

pub use builder::{quote_identifier, quote_literal, SqlBuilder};
pub use error::{Result, SqlError};
pub use predicate::{append_predicate, append_sort_orders};
pub use statements::{
    build_delete, build_insert, build_procedure_call, build_select, build_update, ProcedureShape,
};

// Test modules - only compiled during testing
#[cfg(test)]
mod predicate_test;
