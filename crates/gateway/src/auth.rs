//! Role resolution
//!
//! The impersonated database role comes from, in order: the TLS peer
//! certificate's Common Name, HTTP Basic credentials verified against the
//! database's own role store, or the configured default. With none of the
//! three the transaction runs as the pool's connection user.
//!
//! Credential verification never leaves the database: the md5 role hash is
//! recomputed in SQL and compared inside the transaction.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pgway_sql::SqlBuilder;
use tokio_postgres::types::ToSql;
use tokio_postgres::Transaction;

use crate::error::{GatewayError, Result};

/// TLS facts about the requesting connection. Present in the request
/// extensions exactly when the connection is TLS.
#[derive(Debug, Clone)]
pub struct TlsPeer {
    /// Subject Common Name of the verified client certificate, if one was
    /// presented
    pub common_name: Option<String>,
}

/// Resolve the role to impersonate; `None` skips impersonation
pub async fn resolve_role(
    tx: &Transaction<'_>,
    headers: &HeaderMap,
    tls: Option<&TlsPeer>,
    default_cn: &str,
) -> Result<Option<String>> {
    if let Some(cn) = tls.and_then(|peer| peer.common_name.as_deref()) {
        return Ok(Some(cn.to_string()));
    }

    if let Some(credentials) = basic_credentials(headers) {
        if tls.is_none() {
            return Err(GatewayError::InsecureAuthorization);
        }
        let (user, password) = credentials;
        verify_db_role(tx, &user, &password).await?;
        return Ok(Some(user));
    }

    if default_cn.is_empty() {
        Ok(None)
    } else {
        Ok(Some(default_cn.to_string()))
    }
}

/// `Authorization: Basic` credentials, if present and well-formed
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, payload) = value.split_once(' ')?;
    if scheme != "Basic" {
        return None;
    }
    let decoded = STANDARD.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Check a username/password pair against `pg_authid`.
///
/// Only md5-hashed, unexpired roles verify; anything else is a credential
/// failure, exactly as if the password were wrong.
async fn verify_db_role(tx: &Transaction<'_>, user: &str, password: &str) -> Result<()> {
    let mut sql = SqlBuilder::new();
    sql.push_sql(
        "SELECT true FROM pg_authid \
         WHERE (rolvaliduntil > now() OR rolvaliduntil IS NULL) AND rolname=",
    );
    sql.push_value(pgway_protocol::SqlParam::Text(user.to_string()));
    sql.push_sql(" AND CASE WHEN substr(rolpassword, 1, 3) = 'md5' THEN rolpassword = 'md5' || md5(");
    sql.push_value(pgway_protocol::SqlParam::Text(password.to_string()));
    sql.push_sql(" || ");
    sql.push_value(pgway_protocol::SqlParam::Text(user.to_string()));
    sql.push_sql(") ELSE false END");

    let (text, values) = sql.into_parts();
    let params: Vec<&(dyn ToSql + Sync)> = values.iter().map(|p| p as _).collect();

    let matched = tx.execute(text.as_str(), &params).await?;
    if matched == 0 {
        return Err(GatewayError::IncorrectCredentials);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_basic_credentials() {
        let mut headers = HeaderMap::new();
        // ada:secret
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic YWRhOnNlY3JldA=="),
        );
        assert_eq!(
            basic_credentials(&headers),
            Some(("ada".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn ignores_other_schemes_and_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc"),
        );
        assert_eq!(basic_credentials(&headers), None);

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic not-base64!"),
        );
        assert_eq!(basic_credentials(&headers), None);
    }
}
