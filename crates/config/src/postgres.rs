//! Database configuration
//!
//! Connection parameters plus the gateway-specific settings: the route
//! registry table, the reload channel, and per-transaction session knobs.
//! Credentials come from the `PG_USER` / `PG_PASSWORD` environment variables
//! so they never sit in the config file.
//!
//! TCP connections always encrypt; only an absolute Unix-socket path skips
//! TLS. The server verifies against a pinned certificate when one is
//! configured, a CA bundle otherwise, and the public trust roots with
//! neither.

use serde::Deserialize;

/// PostgreSQL configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Host name, or an absolute path for Unix-socket connections.
    /// TCP hosts connect over TLS; sockets connect in the clear.
    pub host: String,

    /// Server port
    pub port: u16,

    /// Database name (required)
    pub database: String,

    /// PEM file holding the one server certificate to accept. Pinning
    /// replaces chain verification entirely.
    pub server_certificate: Option<String>,

    /// PEM bundle of CAs trusted for the server certificate. Ignored when
    /// a pinned certificate is set.
    pub ca_certificates: Option<String>,

    /// `search_path` applied to the route-loading transaction.
    /// Empty keeps the role default.
    pub search_path: String,

    /// Connection pool capacity
    pub max_connections: usize,

    /// Table holding the route registry
    pub routes_table: String,

    /// NOTIFY channel triggering a route reload. Empty disables the
    /// listener; routes then load once at startup.
    pub updates_channel: String,

    /// Namespace of session variables, exposed to SQL as
    /// `current_setting('<name>.<variable>')`
    pub context_parameter_name: String,

    /// Function wrapping full-text-search filter operands,
    /// e.g. `to_tsquery` or `websearch_to_tsquery`
    pub fts_function: String,

    /// `statement_timeout` applied to every request transaction, seconds
    pub statement_timeout_secs: u32,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            server_certificate: None,
            ca_certificates: None,
            search_path: String::new(),
            max_connections: 8,
            routes_table: "routes".to_string(),
            updates_channel: String::new(),
            context_parameter_name: "context".to_string(),
            fts_function: "to_tsquery".to_string(),
            statement_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PostgresConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.routes_table, "routes");
        assert_eq!(config.context_parameter_name, "context");
    }

    #[test]
    fn deserialize_partial() {
        let config: PostgresConfig =
            toml::from_str("database = \"appdb\"\nmax_connections = 32").unwrap();
        assert_eq!(config.database, "appdb");
        assert_eq!(config.max_connections, 32);
        assert_eq!(config.statement_timeout_secs, 30);
        assert!(config.server_certificate.is_none());
        assert!(config.ca_certificates.is_none());
    }

    #[test]
    fn deserialize_tls_material() {
        let config: PostgresConfig = toml::from_str(
            "database = \"appdb\"\nserver_certificate = \"tls/db-server.crt\"",
        )
        .unwrap();
        assert_eq!(
            config.server_certificate.as_deref(),
            Some("tls/db-server.crt")
        );
    }
}
