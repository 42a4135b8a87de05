//! pgway Gateway
//!
//! The request-execution engine. One axum fallback handler dispatches every
//! request through the live route table; the pipeline opens a transaction,
//! impersonates the resolved role, pushes session context, composes the
//! statement, streams rows into the chosen encoder, sets output cookies and
//! commits before the first response byte leaves the process.
//!
//! The route table is an immutable snapshot behind an `ArcSwap`: readers
//! load the pointer, the reload listener publishes whole replacement tables
//! on `NOTIFY`, and a failed rebuild leaves the previous table serving.

mod access_log;
mod auth;
mod body;
mod context;
mod dispatch;
mod docgen;
mod error;
mod pipeline;
mod querystring;
mod reload;
mod respond;
mod server;
mod state;
mod tls;

pub use auth::TlsPeer;
pub use docgen::render_documentation;
pub use error::{GatewayError, Result};
pub use reload::spawn_reload_listener;
pub use server::{build_router, serve};
pub use state::{Gateway, GatewayOptions};

// Test modules - only compiled during testing
#[cfg(test)]
mod context_test;
#[cfg(test)]
mod querystring_test;
