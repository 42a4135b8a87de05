//! Route model
//!
//! One `Route` is a fully-resolved registry row: the raw declaration joined
//! with everything introspection learned about its target.

use std::collections::{HashMap, HashSet};

use pgway_protocol::{ParameterTypes, QueryParams};

use crate::cookies::CookieBinding;
use crate::error::SchemaError;

/// HTTP methods the gateway routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Parse the lowercase registry spelling
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        match s {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            "delete" => Ok(Method::Delete),
            other => Err(SchemaError::UnknownMethod(other.to_string())),
        }
    }

    /// Registry spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }
}

/// What kind of database object a route targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Table or view
    Relation,
    /// Callable function
    Procedure,
}

impl ObjectKind {
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        match s {
            "relation" => Ok(ObjectKind::Relation),
            "procedure" => Ok(ObjectKind::Procedure),
            other => Err(SchemaError::UnknownObjectKind(other.to_string())),
        }
    }
}

/// Procedure volatility class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volatility {
    Immutable,
    Stable,
    Volatile,
}

impl Volatility {
    pub fn from_provolatile(c: char) -> Self {
        match c {
            'i' => Volatility::Immutable,
            's' => Volatility::Stable,
            _ => Volatility::Volatile,
        }
    }
}

/// Category of a procedure's return type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCategory {
    /// Plain scalar type
    Scalar,
    /// Composite type; columns expand through `SELECT * FROM`
    Composite,
    /// The untyped `record` pseudo-type
    Record,
}

impl ReturnCategory {
    /// From `pg_type.typtype` plus the return OID (`record` is a
    /// pseudo-type, typtype 'p')
    pub fn from_typtype(typtype: char, is_record: bool) -> Self {
        if is_record {
            ReturnCategory::Record
        } else if typtype == 'c' {
            ReturnCategory::Composite
        } else {
            ReturnCategory::Scalar
        }
    }
}

/// Return metadata of a procedure target
#[derive(Debug, Clone)]
pub struct ProcedureReturn {
    /// Returns a set of rows
    pub returns_set: bool,
    /// Volatility class; GET requires stable or immutable
    pub volatility: Volatility,
    /// Shape of the return type
    pub category: ReturnCategory,
    /// Return type OID
    pub type_oid: u32,
    /// Return type name, for documentation
    pub type_name: String,
}

/// One fully-resolved route
#[derive(Debug, Clone)]
pub struct Route {
    /// Registry row id
    pub id: i32,
    pub method: Method,
    /// URL path with `:name` and trailing `*name` placeholders
    pub url_path: String,
    /// Schema-qualified target object
    pub object_name: String,
    pub kind: ObjectKind,

    /// Cache lifetime in seconds; 0 means no-store
    pub ttl: i32,
    /// `public` vs `private` in Cache-Control
    pub is_public: bool,

    /// Incoming header name to session variable name (null maps the header
    /// under its own name)
    pub context_headers: HashMap<String, Option<String>>,
    /// Path parameters also pushed as session variables
    pub context_parameters: Vec<String>,
    /// Declared cookie bindings, normalized
    pub cookies: Vec<CookieBinding>,

    /// Introspected parameter name to type
    pub parameter_types: ParameterTypes,
    /// Parameter name to declared (regtype) name, for documentation
    pub declared_types: HashMap<String, String>,
    /// Arguments with defaults (procedures) or optional columns (relations)
    pub optional_parameters: Vec<String>,

    /// Constants merged into every query, already decoded
    pub constants: QueryParams,
    /// Clamp on result-set size; 0 disables the clamp
    pub max_limit: i64,
    /// Columns never returned
    pub hidden_fields: HashSet<String>,
    /// Columns never accepted from request bodies
    pub read_only_fields: HashSet<String>,
    /// Prequoted, comma-joined non-hidden columns
    pub selected_columns: String,

    /// Present for procedure targets only
    pub procedure: Option<ProcedureReturn>,

    /// `obj_description` of the target, for documentation
    pub description: String,
}

impl Route {
    /// Cookie bindings read into the session context.
    /// Clients never transmit attribute flags, so a binding marked
    /// http-only cannot match a request cookie and is skipped here.
    pub fn input_cookies(&self) -> impl Iterator<Item = &CookieBinding> {
        self.cookies.iter().filter(|c| c.read && !c.http_only)
    }

    /// Cookie bindings written from post-transaction session variables
    pub fn output_cookies(&self) -> impl Iterator<Item = &CookieBinding> {
        self.cookies.iter().filter(|c| c.write)
    }
}
