//! pgway Route Registry
//!
//! Routes live in a database table; one loading transaction reads them,
//! introspects every target relation or procedure for its column/argument
//! types, normalizes cookie bindings, and precomputes the selected-column
//! list. The result compiles into an immutable [`RouteTable`]: a
//! method-aware radix tree over path segments, looked up on every request
//! and replaced wholesale on reload.

mod cookies;
mod error;
mod introspect;
mod route;
mod table;

pub use cookies::CookieBinding;
pub use error::{Result, SchemaError};
pub use introspect::SchemaLoader;
pub use route::{Method, ObjectKind, ProcedureReturn, ReturnCategory, Route, Volatility};
pub use table::{RouteMatch, RouteTable};

// Test modules - only compiled during testing
#[cfg(test)]
mod cookies_test;
#[cfg(test)]
mod table_test;
