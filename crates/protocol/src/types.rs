//! Declared parameter types
//!
//! Introspection resolves every relation column and procedure argument to a
//! declared type name (`integer`, `text[]`, ...). Array types additionally
//! record their element OID so array predicates can cast correctly.

use std::collections::HashMap;

/// Declared type of one parameter (relation column or procedure argument)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterType {
    /// Normalized type name; arrays carry a `[]` suffix
    pub name: String,
    /// Element type OID for arrays, 0 otherwise
    pub element_oid: u32,
}

impl ParameterType {
    /// Construct a scalar parameter type
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            element_oid: 0,
        }
    }

    /// Whether the declared type is an array
    pub fn is_array(&self) -> bool {
        self.name.ends_with("[]")
    }
}

/// Parameter name to declared type, for one route target
pub type ParameterTypes = HashMap<String, ParameterType>;
