//! HTTP listener configuration
//!
//! Covers the bind address, optional TLS material, per-request size caps,
//! and the cookie policy applied to route-declared cookie bindings.

use serde::Deserialize;

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address, e.g. `127.0.0.1:8080`
    pub address: String,

    /// Prefix stripped from every request path before route lookup.
    /// Requests outside the prefix are rejected with 400.
    pub url_prefix: String,

    /// PEM certificate chain. TLS is enabled when both `cert_file` and
    /// `key_file` are set; otherwise the listener speaks plain HTTP.
    pub cert_file: Option<String>,

    /// PEM private key
    pub key_file: Option<String>,

    /// PEM bundle of CAs trusted for client certificates. When set, client
    /// certificates are requested and the peer Common Name is used as the
    /// impersonated database role.
    pub client_ca: Option<String>,

    /// Role used when the client presents no certificate and no credentials.
    /// Empty disables impersonation for anonymous requests.
    pub default_client_cn: String,

    /// Append the remote IP to `X-Forwarded-For` before dispatch
    pub update_forwarded_for: bool,

    /// Append-only request log. `-` means stdout, empty disables the log.
    pub requests_log_file: String,

    /// Request body cap in kilobytes
    pub max_body_size_kbytes: u64,

    /// Response cap in kilobytes, enforced by every encoder
    pub max_response_size_kbytes: u64,

    /// Socket read budget in seconds
    pub read_timeout_secs: u64,

    /// Socket write budget in seconds
    pub write_timeout_secs: u64,

    /// Base domain composed with cookie `subDomain` declarations
    pub cookies_domain: String,

    /// Base path composed with cookie `path` declarations
    pub cookies_path: String,

    /// Strip the `Secure` attribute from every emitted cookie
    /// (for TLS-terminating proxies in front of a plain listener)
    pub cookies_disable_secure: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            url_prefix: String::new(),
            cert_file: None,
            key_file: None,
            client_ca: None,
            default_client_cn: String::new(),
            update_forwarded_for: false,
            requests_log_file: String::new(),
            max_body_size_kbytes: 1024,
            max_response_size_kbytes: 16 * 1024,
            read_timeout_secs: 10,
            write_timeout_secs: 10,
            cookies_domain: String::new(),
            cookies_path: String::new(),
            cookies_disable_secure: false,
        }
    }
}

impl HttpConfig {
    /// Whether TLS material is fully configured
    pub fn tls_enabled(&self) -> bool {
        self.cert_file.is_some() && self.key_file.is_some()
    }

    /// Body cap in bytes
    pub fn max_body_bytes(&self) -> usize {
        (self.max_body_size_kbytes as usize) << 10
    }

    /// Response cap in bytes
    pub fn max_response_bytes(&self) -> usize {
        (self.max_response_size_kbytes as usize) << 10
    }
}
