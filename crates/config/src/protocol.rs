//! Query-string protocol parameter names

use serde::Deserialize;

/// Names of the reserved query-string parameters on relation routes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Filter predicate parameter
    pub filter_parameter: String,

    /// Sort order parameter
    pub sort_parameter: String,

    /// Row limit parameter
    pub limit_parameter: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            filter_parameter: "f".to_string(),
            sort_parameter: "o".to_string(),
            limit_parameter: "l".to_string(),
        }
    }
}
