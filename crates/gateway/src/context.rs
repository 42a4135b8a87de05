//! Session context
//!
//! Request identity travels into SQL as session variables: configured
//! defaults, whitelisted cookies, named path parameters and mapped headers
//! merge into one map, pushed with a single `set_config` statement over a
//! VALUES relation. `statement_timeout` is set last so no variable can
//! overwrite it.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use pgway_schema::{CookieBinding, Route};
use pgway_sql::{quote_literal, SqlBuilder};
use tokio_postgres::types::ToSql;
use tokio_postgres::Transaction;

use crate::error::Result;

/// Assemble the session variables for one request
pub fn build_context(
    defaults: &HashMap<String, String>,
    route: &Route,
    raw_params: &[(String, String)],
    headers: &HeaderMap,
) -> HashMap<String, String> {
    let mut context = defaults.clone();

    for (name, value) in request_cookies(headers) {
        if let Some(binding) = route.input_cookies().find(|c| c.name == name) {
            context.insert(binding.variable().to_string(), value);
        }
    }

    for name in &route.context_parameters {
        let value = raw_params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        context.insert(name.clone(), value);
    }

    for (from, to) in &route.context_headers {
        if let Some(value) = headers.get(from).and_then(|v| v.to_str().ok()) {
            let name = to.as_deref().unwrap_or(from);
            context.insert(name.to_string(), value.to_string());
        }
    }

    context
}

/// Cookies of the request, raw name/value pairs
fn request_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    let mut cookies = Vec::new();

    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                cookies.push((name.to_string(), value.to_string()));
            }
        }
    }

    cookies
}

/// Apply role, session variables and statement timeout to the transaction
pub async fn apply_context(
    tx: &Transaction<'_>,
    statement_timeout_secs: u32,
    role: Option<&str>,
    context_parameter: &str,
    context: &HashMap<String, String>,
) -> Result<()> {
    if let Some(role) = role {
        tx.batch_execute(&format!("SET LOCAL ROLE {}", quote_literal(role)))
            .await?;
    }

    if !context.is_empty() {
        let mut sql = SqlBuilder::new();
        sql.push_sql("SELECT set_config(k,v,true) FROM (VALUES ");
        for (i, (name, value)) in context.iter().enumerate() {
            if i > 0 {
                sql.push_sql(",");
            }
            sql.push_sql("(");
            sql.push_value(pgway_protocol::SqlParam::Text(format!(
                "{context_parameter}.{name}"
            )));
            sql.push_sql(",");
            sql.push_value(pgway_protocol::SqlParam::Text(value.clone()));
            sql.push_sql(")");
        }
        sql.push_sql(") xs(k,v)");

        let (text, values) = sql.into_parts();
        let params: Vec<&(dyn ToSql + Sync)> = values.iter().map(|p| p as _).collect();
        tx.execute(text.as_str(), &params).await?;
    }

    // last, so a set_config cannot raise it again
    tx.batch_execute(&format!(
        "SET statement_timeout = {}",
        u64::from(statement_timeout_secs) * 1000
    ))
    .await?;

    Ok(())
}

/// Read the post-transaction values of every write-cookie variable
pub async fn collect_output_cookies(
    tx: &Transaction<'_>,
    context_parameter: &str,
    route: &Route,
) -> Result<Vec<(CookieBinding, String)>> {
    let bindings: Vec<&CookieBinding> = route.output_cookies().collect();
    if bindings.is_empty() {
        return Ok(Vec::new());
    }

    let mut sql = SqlBuilder::new();
    sql.push_sql("SELECT name,current_setting(name,true) FROM (VALUES ");
    for (i, binding) in bindings.iter().enumerate() {
        if i > 0 {
            sql.push_sql(",");
        }
        sql.push_sql("(");
        sql.push_value(pgway_protocol::SqlParam::Text(format!(
            "{context_parameter}.{}",
            binding.variable()
        )));
        sql.push_sql(")");
    }
    sql.push_sql(") xs(name)");

    let (text, values) = sql.into_parts();
    let params: Vec<&(dyn ToSql + Sync)> = values.iter().map(|p| p as _).collect();

    let prefix_len = context_parameter.len() + 1;
    let mut settings: HashMap<String, String> = HashMap::new();
    for row in tx.query(text.as_str(), &params).await? {
        let name: String = row.try_get(0)?;
        let value: Option<String> = row.try_get(1)?;
        if let Some(value) = value {
            settings.insert(name[prefix_len..].to_string(), value);
        }
    }

    Ok(bindings
        .into_iter()
        .filter_map(|binding| {
            settings
                .get(binding.variable())
                .map(|value| (binding.clone(), value.clone()))
        })
        .collect())
}

/// Render one `Set-Cookie` header value
pub fn format_set_cookie(binding: &CookieBinding, value: &str) -> String {
    let mut cookie = format!("{}={value}", binding.name);

    if binding.max_age > 0 {
        cookie.push_str(&format!("; Max-Age={}", binding.max_age));
    }
    if let Some(domain) = &binding.sub_domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    if let Some(path) = &binding.path {
        cookie.push_str(&format!("; Path={path}"));
    }
    if binding.secure {
        cookie.push_str("; Secure");
    }
    if binding.http_only {
        cookie.push_str("; HttpOnly");
    }

    cookie
}

/// `Cache-Control` per route policy
pub fn cache_control(ttl: i32, is_public: bool) -> String {
    let scope = if is_public { "public" } else { "private" };
    if ttl > 0 {
        format!("{scope}, max-age={ttl}")
    } else {
        format!("{scope}, no-store")
    }
}
