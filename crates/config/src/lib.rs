//! pgway Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Example Minimal Config
//!
//! ```toml
//! [postgres]
//! database = "appdb"
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [system]
//! verbose = true
//!
//! [http]
//! address = "0.0.0.0:8443"
//! url_prefix = "/api"
//! cert_file = "tls/server.crt"
//! key_file = "tls/server.key"
//!
//! [postgres]
//! host = "db.internal"
//! database = "appdb"
//! routes_table = "routes"
//! updates_channel = "routes_changed"
//!
//! [default_context]
//! "application" = "pgway"
//!
//! [[binary_formats]]
//! extension = "pdf"
//! mime_type = "application/pdf"
//! ```

mod error;
mod http;
mod postgres;
mod protocol;
mod system;
mod validation;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use error::{ConfigError, Result};
pub use http::HttpConfig;
pub use postgres::PostgresConfig;
pub use protocol::ProtocolConfig;
pub use system::SystemConfig;

/// One extension-to-MIME mapping for the binary passthrough encoder
#[derive(Debug, Clone, Deserialize)]
pub struct BinaryFormat {
    /// URL extension (without the leading dot), e.g. `pdf`
    pub extension: String,
    /// MIME type sent back in `Content-Type`
    pub mime_type: String,
}

/// Main configuration structure
///
/// All sections are optional with sensible defaults, except
/// `[postgres] database`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Process-level settings (worker threads, verbosity)
    pub system: SystemConfig,

    /// HTTP listener, TLS, size caps, cookies
    pub http: HttpConfig,

    /// Database connection, route registry, session settings
    pub postgres: PostgresConfig,

    /// Query-string parameter names of the filter mini-language
    pub protocol: ProtocolConfig,

    /// Session variables pushed into every transaction
    pub default_context: HashMap<String, String>,

    /// Extra response formats served by the binary passthrough encoder
    pub binary_formats: Vec<BinaryFormat>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        contents.parse()
    }

    /// Extension-to-MIME table as a map
    pub fn binary_format_table(&self) -> HashMap<String, String> {
        self.binary_formats
            .iter()
            .map(|f| (f.extension.clone(), f.mime_type.clone()))
            .collect()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
