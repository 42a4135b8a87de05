//! Catalog introspection
//!
//! One transaction loads the registry rows and resolves every target:
//! relations enumerate their columns, procedures their arguments and return
//! metadata. Base types use the attribute's type, domains their underlying
//! base, arrays record the element and a `[]` suffix, and composite or enum
//! types fall back to text so values still bind.

use std::collections::HashMap;

use pgway_protocol::{decode_json_value, ParameterType, QueryParams};
use tokio_postgres::Transaction;
use tracing::{debug, info};

use crate::cookies::CookieBinding;
use crate::error::{Result, SchemaError};
use crate::route::{
    Method, ObjectKind, ProcedureReturn, ReturnCategory, Route, Volatility,
};

const RELATION_COLUMNS_SQL: &str = "SELECT att.attname::text, coalesce(etyp.oid, 0::oid), \
     (CASE coalesce(etyp.typtype, typ.typtype) \
        WHEN 'b' THEN att.atttypid::regtype::text \
        WHEN 'd' THEN coalesce(etyp.typbasetype::regtype::text || '[]', typ.typbasetype::regtype::text) \
        ELSE (CASE WHEN typ.typcategory = 'A' THEN 25::regtype::text || '[]' ELSE 25::regtype::text END) \
      END), \
     typ.oid::regtype::text, \
     att.atthasdef OR NOT att.attnotnull \
     FROM pg_attribute att \
     INNER JOIN pg_type typ ON att.atttypid = typ.oid \
     LEFT JOIN pg_type etyp ON typ.typelem = etyp.oid AND typ.typcategory = 'A' \
     WHERE att.attrelid = $1 AND att.attisdropped = false AND att.attnum > 0";

const PROCEDURE_ARGUMENTS_SQL: &str = "SELECT args.name::text, coalesce(etyp.oid, 0::oid), \
     (CASE coalesce(etyp.typtype, typ.typtype) \
        WHEN 'b' THEN args.type::regtype::text \
        WHEN 'd' THEN coalesce(etyp.typbasetype::regtype::text || '[]', typ.typbasetype::regtype::text) \
        ELSE (CASE WHEN typ.typcategory = 'A' THEN 25::regtype::text || '[]' ELSE 25::regtype::text END) \
      END), \
     typ.oid::regtype::text, \
     args.isoptional \
     FROM (SELECT (row_number() OVER ()) BETWEEN (pg_proc.pronargs - pg_proc.pronargdefaults + 1) AND pg_proc.pronargs, \
           unnest.* FROM pg_proc, unnest(pg_proc.proargnames, pg_proc.proargtypes::int[]) \
           WHERE pg_proc.oid = $1) AS args(isoptional, name, type) \
     INNER JOIN pg_type typ ON args.type = typ.oid \
     LEFT JOIN pg_type etyp ON typ.typelem = etyp.oid AND typ.typcategory = 'A'";

const PROCEDURE_RETURN_SQL: &str = "SELECT pro.proretset, pro.provolatile, typ.typtype, \
     typ.oid::regtype::text, typ.oid \
     FROM pg_proc pro INNER JOIN pg_type typ ON pro.prorettype = typ.oid \
     WHERE pro.oid = $1";

/// Loads and resolves the route registry
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    /// Table holding the registry
    pub routes_table: String,
    /// Base domain for cookie normalization
    pub cookies_domain: String,
    /// Base path for cookie normalization
    pub cookies_path: String,
    /// Strip the secure flag from every cookie
    pub cookies_disable_secure: bool,
}

impl SchemaLoader {
    /// Load all routes inside the given transaction.
    ///
    /// `search_path` applies to the transaction first so unqualified object
    /// names resolve the way the registry intends.
    pub async fn load_routes(
        &self,
        tx: &Transaction<'_>,
        search_path: &str,
    ) -> Result<Vec<Route>> {
        info!("loading routes");

        if !search_path.is_empty() {
            if search_path.contains(';') {
                return Err(SchemaError::InvalidSearchPath(search_path.to_string()));
            }
            tx.batch_execute(&format!("SET LOCAL search_path = {search_path}"))
                .await?;
        }

        let select = format!(
            "SELECT route_id, method, url_path, object_name, object_type, ttl, is_public, \
             hidden_fields, readonly_fields, context_mapped_headers, context_mapped_variables, \
             constants, max_limit, context_mapped_cookies \
             FROM {} ORDER BY url_path, \
             CASE method WHEN 'get' THEN 0 WHEN 'post' THEN 1 WHEN 'put' THEN 2 ELSE 9 END",
            quote_column(&self.routes_table)
        );

        let mut loaded = Vec::new();
        for row in tx.query(select.as_str(), &[]).await? {
            loaded.push(self.route_from_row(&row)?);
        }

        let mut routes = Vec::with_capacity(loaded.len());
        for (mut route, raw_constants) in loaded {
            let oid = match route.kind {
                ObjectKind::Relation => relation_oid(tx, &route.object_name).await?,
                ObjectKind::Procedure => procedure_oid(tx, &route.object_name).await?,
            };

            load_parameters(tx, &mut route, oid).await?;
            if route.kind == ObjectKind::Procedure {
                load_procedure_return(tx, &mut route, oid).await?;
            }
            route.description = load_description(tx, oid).await?;
            decode_constants(&mut route, raw_constants)?;

            debug!(
                method = route.method.as_str(),
                url_path = %route.url_path,
                target = %route.object_name,
                parameters = route.parameter_types.len(),
                "route resolved"
            );
            routes.push(route);
        }

        info!(count = routes.len(), "routes loaded");
        Ok(routes)
    }

    fn route_from_row(
        &self,
        row: &tokio_postgres::Row,
    ) -> Result<(Route, Option<serde_json::Value>)> {
        let method: String = row.try_get(1)?;
        let url_path: String = row.try_get(2)?;
        let object_name: String = row.try_get(3)?;
        let object_type: String = row.try_get(4)?;
        let hidden: Option<Vec<String>> = row.try_get(7)?;
        let read_only: Option<Vec<String>> = row.try_get(8)?;
        let headers: Option<HashMap<String, Option<String>>> = row.try_get(9)?;
        let parameters: Option<Vec<String>> = row.try_get(10)?;
        let constants: Option<serde_json::Value> = row.try_get(11)?;
        let cookies_json: Option<serde_json::Value> = row.try_get(13)?;

        let method = Method::parse(&method)?;
        let kind = ObjectKind::parse(&object_type)?;

        let mut cookies: Vec<CookieBinding> = match cookies_json {
            None => Vec::new(),
            Some(raw) => {
                serde_json::from_value(raw).map_err(|source| SchemaError::CookieConfig {
                    method: method.as_str().to_string(),
                    url_path: url_path.clone(),
                    source,
                })?
            }
        };
        for cookie in &mut cookies {
            cookie.normalize(
                &self.cookies_domain,
                &self.cookies_path,
                self.cookies_disable_secure,
            );
        }

        let route = Route {
            id: row.try_get(0)?,
            method,
            url_path,
            object_name,
            kind,
            ttl: row.try_get(5)?,
            is_public: row.try_get(6)?,
            context_headers: headers.unwrap_or_default(),
            context_parameters: parameters.unwrap_or_default(),
            cookies,
            parameter_types: HashMap::new(),
            declared_types: HashMap::new(),
            optional_parameters: Vec::new(),
            constants: QueryParams::new(),
            max_limit: i64::from(row.try_get::<_, i32>(12)?),
            hidden_fields: hidden.unwrap_or_default().into_iter().collect(),
            read_only_fields: read_only.unwrap_or_default().into_iter().collect(),
            selected_columns: String::new(),
            procedure: None,
            description: String::new(),
        };

        Ok((route, constants))
    }
}

/// Constants decode once the introspected types are known; keys without a
/// declared type are dropped the way unknown body keys are
fn decode_constants(route: &mut Route, raw: Option<serde_json::Value>) -> Result<()> {
    let Some(serde_json::Value::Object(object)) = raw else {
        return Ok(());
    };

    let mut decoded = QueryParams::new();
    for (key, value) in &object {
        if let Some(ty) = route.parameter_types.get(key) {
            let param =
                decode_json_value(value, ty).map_err(|source| SchemaError::Constants {
                    method: route.method.as_str().to_string(),
                    url_path: route.url_path.clone(),
                    source,
                })?;
            decoded.push((key.clone(), param));
        }
    }

    route.constants = decoded;
    Ok(())
}

async fn relation_oid(tx: &Transaction<'_>, name: &str) -> Result<u32> {
    let row = tx
        .query_one("SELECT to_regclass($1)::oid", &[&name])
        .await?;
    row.try_get::<_, Option<u32>>(0)?
        .ok_or_else(|| SchemaError::RelationNotFound(name.to_string()))
}

async fn procedure_oid(tx: &Transaction<'_>, name: &str) -> Result<u32> {
    let row = tx
        .query_one("SELECT to_regproc($1)::oid", &[&name])
        .await?;
    row.try_get::<_, Option<u32>>(0)?
        .ok_or_else(|| SchemaError::ProcedureNotFound(name.to_string()))
}

async fn load_parameters(tx: &Transaction<'_>, route: &mut Route, oid: u32) -> Result<()> {
    let sql = match route.kind {
        ObjectKind::Relation => RELATION_COLUMNS_SQL,
        ObjectKind::Procedure => PROCEDURE_ARGUMENTS_SQL,
    };

    let mut selected = Vec::new();

    for row in tx.query(sql, &[&oid]).await? {
        let name: Option<String> = row.try_get(0)?;
        let element_oid: u32 = row.try_get(1)?;
        let type_name: Option<String> = row.try_get(2)?;
        let declared: Option<String> = row.try_get(3)?;
        let mut optional: bool = row.try_get(4)?;

        let (Some(name), Some(type_name)) = (name, type_name) else {
            continue;
        };

        if route.kind == ObjectKind::Relation {
            if !route.hidden_fields.contains(&name) {
                selected.push(quote_column(&name));
            }
            if route.method != Method::Post {
                optional = true;
            }
        }

        if optional {
            route.optional_parameters.push(name.clone());
        }

        route
            .declared_types
            .insert(name.clone(), declared.unwrap_or_else(|| type_name.clone()));
        route.parameter_types.insert(
            name,
            ParameterType {
                name: type_name,
                element_oid,
            },
        );
    }

    route.selected_columns = selected.join(",");
    Ok(())
}

async fn load_procedure_return(tx: &Transaction<'_>, route: &mut Route, oid: u32) -> Result<()> {
    let row = match tx.query_opt(PROCEDURE_RETURN_SQL, &[&oid]).await? {
        Some(row) => row,
        None => return Err(SchemaError::ProcedureNotFound(route.object_name.clone())),
    };

    let returns_set: bool = row.try_get(0)?;
    let provolatile: i8 = row.try_get(1)?;
    let typtype: i8 = row.try_get(2)?;
    let type_name: String = row.try_get(3)?;
    let type_oid: u32 = row.try_get(4)?;

    let is_record = type_oid == postgres_record_oid();

    route.procedure = Some(ProcedureReturn {
        returns_set,
        volatility: Volatility::from_provolatile(provolatile as u8 as char),
        category: ReturnCategory::from_typtype(typtype as u8 as char, is_record),
        type_oid,
        type_name,
    });

    Ok(())
}

async fn load_description(tx: &Transaction<'_>, oid: u32) -> Result<String> {
    let row = tx.query_one("SELECT obj_description($1)", &[&oid]).await?;
    Ok(row.try_get::<_, Option<String>>(0)?.unwrap_or_default())
}

/// OID of the untyped `record` pseudo-type
fn postgres_record_oid() -> u32 {
    tokio_postgres::types::Type::RECORD.oid()
}

/// Identifier quoting, local so this crate and the SQL builder crate stay
/// independent of each other
fn quote_column(name: &str) -> String {
    let name = match name.find('\0') {
        Some(end) => &name[..end],
        None => name,
    };
    format!("\"{}\"", name.replace('"', "\"\""))
}
