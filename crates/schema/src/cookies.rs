//! Cookie bindings
//!
//! Routes declare their cookies as a JSON array in the registry row. After
//! deserialization every binding is normalized against the server-wide
//! cookie policy: the context variable defaults to the cookie name, the
//! sub-domain and path compose with the configured base, and the secure
//! flag drops when the deployment terminates TLS elsewhere.

use serde::Deserialize;

/// One declared cookie of a route
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CookieBinding {
    /// Cookie name
    pub name: String,
    /// Session variable read from or written to; defaults to `name`
    pub context_variable: Option<String>,
    /// Lifetime in seconds; 0 emits a session cookie
    pub max_age: i32,
    /// Prepended to the configured cookie domain
    pub sub_domain: Option<String>,
    /// Appended to the configured cookie path
    pub path: Option<String>,
    /// Transmitted over TLS only
    pub secure: bool,
    /// Hidden from JavaScript
    pub http_only: bool,
    /// Read from requests into the session context
    pub read: bool,
    /// Written back from the session context after the transaction
    pub write: bool,
}

impl Default for CookieBinding {
    fn default() -> Self {
        Self {
            name: String::new(),
            context_variable: None,
            max_age: 0,
            sub_domain: None,
            path: None,
            secure: false,
            http_only: false,
            read: false,
            write: false,
        }
    }
}

impl CookieBinding {
    /// Apply the server-wide cookie policy
    pub fn normalize(&mut self, base_domain: &str, base_path: &str, disable_secure: bool) {
        if self.context_variable.as_deref().unwrap_or("").is_empty() {
            self.context_variable = Some(self.name.clone());
        }

        self.sub_domain = match (self.sub_domain.take(), base_domain) {
            (Some(sub), "") => Some(sub),
            (Some(sub), base) => Some(format!("{sub}.{base}")),
            (None, "") => None,
            (None, base) => Some(base.to_string()),
        };

        self.path = match (self.path.take(), base_path) {
            (Some(p), "") => Some(p),
            (Some(p), base) => Some(join_url_path(base, &p)),
            (None, "") => None,
            (None, base) => Some(base.to_string()),
        };

        if disable_secure {
            self.secure = false;
        }
    }

    /// The normalized session variable name
    pub fn variable(&self) -> &str {
        self.context_variable.as_deref().unwrap_or(&self.name)
    }
}

/// Join two URL path fragments with exactly one slash between them
fn join_url_path(base: &str, rest: &str) -> String {
    let base = base.trim_end_matches('/');
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{rest}")
    }
}
