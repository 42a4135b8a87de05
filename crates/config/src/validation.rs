//! Cross-field configuration validation
//!
//! Runs after deserialization so error messages refer to the config file,
//! not to whatever fails first deep inside the gateway.

use crate::{Config, ConfigError, Result};

/// Validate a parsed configuration
pub fn validate(config: &Config) -> Result<()> {
    if config.postgres.database.is_empty() {
        return Err(ConfigError::missing("postgres", "database"));
    }

    if config.postgres.max_connections == 0 {
        return Err(ConfigError::invalid(
            "postgres",
            "max_connections",
            "must be at least 1",
        ));
    }

    if config.postgres.search_path.contains(';') {
        return Err(ConfigError::invalid(
            "postgres",
            "search_path",
            "must not contain ';'",
        ));
    }

    if !config.http.url_prefix.is_empty() && !config.http.url_prefix.starts_with('/') {
        return Err(ConfigError::invalid(
            "http",
            "url_prefix",
            "must start with '/'",
        ));
    }

    if config.http.max_response_size_kbytes == 0 {
        return Err(ConfigError::invalid(
            "http",
            "max_response_size_kbytes",
            "must be positive",
        ));
    }

    if config.http.cert_file.is_some() != config.http.key_file.is_some() {
        return Err(ConfigError::invalid(
            "http",
            "cert_file",
            "cert_file and key_file must be set together",
        ));
    }

    for format in &config.binary_formats {
        if format.extension.is_empty() || format.extension.contains('.') {
            return Err(ConfigError::invalid(
                "binary_formats",
                "extension",
                format!("'{}' is not a bare extension", format.extension),
            ));
        }
    }

    Ok(())
}
