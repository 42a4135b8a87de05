//! pgway - Filter mini-language
//!
//! Relation routes accept a structured filter in the query string:
//!
//! ```text
//! f=and(ge(id,10),eq(status,$active,null))&o=!name&l=2
//! ```
//!
//! This crate holds the predicate AST consumed by the SQL translator, plus
//! the parser for predicates and sort orders. The parser works on the *raw*
//! (still percent-encoded) parameter value: string operands are decoded only
//! after tokenization, so commas and parentheses can be escaped inside
//! strings without an ambiguity at the grammar level.
//!
//! # Grammar
//!
//! ```text
//! predicate = "not(" predicate ")"
//!           | "and(" [predicate ("," predicate)*] ")"
//!           | "or("  [predicate ("," predicate)*] ")"
//!           | "eq("  field ("," value)* ")"
//!           | ("lt" | "le" | "gt" | "ge") "(" field "," value ")"
//!           | "fts(" field "," string ")"
//! value     = "null" | "true" | "false" | number | string
//! string    = "$" percent-encoded-text
//! sort      = ["!"] field ("," ["!"] field)*
//! ```

mod ast;
mod error;
mod parser;

pub use ast::{Predicate, SortOrder, Value};
pub use error::{FilterError, Result};
pub use parser::{parse_predicate, parse_sort_orders};
