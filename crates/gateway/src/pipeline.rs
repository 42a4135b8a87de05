//! Request pipeline
//!
//! Everything between route match and response bytes. The order is fixed:
//! decode inputs, pick the encoder, open the transaction, impersonate,
//! push session context, execute, read output cookies, commit, respond.
//! Any error before commit rolls the transaction back (dropping the
//! transaction rolls back, so every `?` on this path is safe).

use std::sync::Arc;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use futures_util::{pin_mut, TryStreamExt};
use pgway_protocol::{
    decode_json_value, decode_path_value, merge_defaults, merge_overwrite, visit_rows_affected,
    QueryParams, RecordSetReader, RecordSetResponder, RecordSetVisitor, SqlParam,
};
use pgway_schema::{Method, ObjectKind, ReturnCategory, Route};
use pgway_sql::{
    build_delete, build_insert, build_procedure_call, build_select, build_update, ProcedureShape,
    SqlBuilder,
};
use tokio_postgres::types::ToSql;
use tokio_postgres::Transaction;

use crate::auth::{resolve_role, TlsPeer};
use crate::body::{decode_body, read_body};
use crate::context::{
    apply_context, build_context, cache_control, collect_output_cookies, format_set_cookie,
};
use crate::error::{GatewayError, Result};
use crate::querystring::{decode_component, parse_relation_query, raw_pairs, RelationQuery};
use crate::respond::select_responder;
use crate::state::Gateway;

/// Execute one matched request
pub async fn handle_request(
    gw: &Gateway,
    route: &Arc<Route>,
    raw_params: Vec<(String, String)>,
    ext: &str,
    parts: Parts,
    body: Body,
) -> Result<Response> {
    let mut path_params = QueryParams::new();
    for (name, raw) in &raw_params {
        if let Some(ty) = route.parameter_types.get(name) {
            path_params.push((name.clone(), decode_path_value(raw, ty)?));
        }
    }

    let request = RequestState {
        gw,
        route,
        raw_params,
        path_params,
        headers: parts.headers,
        raw_query: parts.uri.query().unwrap_or("").to_string(),
        tls: parts.extensions.get::<TlsPeer>().cloned(),
    };

    match (route.kind, route.method) {
        (ObjectKind::Relation, Method::Get | Method::Delete) => request.relation_read(ext).await,
        (ObjectKind::Relation, _) => request.relation_write(ext, body).await,
        (ObjectKind::Procedure, _) => request.procedure_call(ext, body).await,
    }
}

struct RequestState<'a> {
    gw: &'a Gateway,
    route: &'a Route,
    raw_params: Vec<(String, String)>,
    path_params: QueryParams,
    headers: HeaderMap,
    raw_query: String,
    tls: Option<TlsPeer>,
}

impl RequestState<'_> {
    /// Constants and decoded path parameters as WHERE equality terms
    fn equalities(&self) -> QueryParams {
        let mut equalities = self.route.constants.clone();
        merge_overwrite(&mut equalities, &self.path_params);
        equalities
    }

    fn relation_query(&self) -> Result<RelationQuery> {
        let options = &self.gw.options;
        parse_relation_query(
            &self.raw_query,
            &options.filter_parameter,
            &options.sort_parameter,
            &options.limit_parameter,
            self.route.max_limit,
        )
    }

    /// Impersonate and push session context; the statement timeout lands
    /// last
    async fn prepare_session(&self, tx: &Transaction<'_>) -> Result<()> {
        let options = &self.gw.options;
        let role = resolve_role(
            tx,
            &self.headers,
            self.tls.as_ref(),
            &options.default_client_cn,
        )
        .await?;

        let context = build_context(
            &options.default_context,
            self.route,
            &self.raw_params,
            &self.headers,
        );

        apply_context(
            tx,
            options.statement_timeout_secs,
            role.as_deref(),
            &options.context_parameter_name,
            &context,
        )
        .await
    }

    /// GET and DELETE on a relation
    async fn relation_read(&self, ext: &str) -> Result<Response> {
        let route = self.route;
        let options = &self.gw.options;
        let query = self.relation_query()?;
        let equalities = self.equalities();

        let mut responder = select_responder(ext, route, options)?;
        let visitor: &mut (dyn RecordSetVisitor + Send) = responder.as_mut();

        let mut client = self.gw.client().await?;
        let tx = client.transaction().await?;
        self.prepare_session(&tx).await?;

        let mut sql = SqlBuilder::new();
        match route.method {
            Method::Get => {
                build_select(
                    &mut sql,
                    &options.fts_function,
                    &route.parameter_types,
                    &route.selected_columns,
                    &route.object_name,
                    query.filter.as_ref(),
                    &equalities,
                    &query.order,
                    query.limit,
                );
                let (text, values) = sql.into_parts();
                stream_records(&tx, visitor, &text, &values, false).await?;
            }
            _ => {
                build_delete(
                    &mut sql,
                    &options.fts_function,
                    &route.parameter_types,
                    &route.object_name,
                    query.filter.as_ref(),
                    &equalities,
                );
                let (text, values) = sql.into_parts();
                let affected = execute(&tx, &text, &values).await?;
                visit_rows_affected(visitor, affected)?;
            }
        }

        self.finalize(tx, responder).await
    }

    /// POST and PUT on a relation
    async fn relation_write(&self, ext: &str, body: Body) -> Result<Response> {
        let route = self.route;
        let options = &self.gw.options;

        let bytes = read_body(body, options.max_body_bytes).await?;
        let content_type = self
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let (mut queries, batch) = decode_body(
            content_type,
            &bytes,
            &route.parameter_types,
            Some(&route.read_only_fields),
        )?;

        let query_string = self.relation_query()?;

        let mut responder = select_responder(ext, route, options)?;
        let visitor: &mut (dyn RecordSetVisitor + Send) = responder.as_mut();

        let mut client = self.gw.client().await?;
        let tx = client.transaction().await?;
        self.prepare_session(&tx).await?;

        if batch {
            visitor.begin_batch()?;
        }

        match route.method {
            Method::Post => {
                if query_string.filter.is_some() {
                    return Err(GatewayError::FilterOnPost);
                }

                for query in &mut queries {
                    merge_defaults(query, &route.constants);
                    merge_overwrite(query, &self.path_params);

                    let mut sql = SqlBuilder::new();
                    build_insert(
                        &mut sql,
                        &route.selected_columns,
                        &route.object_name,
                        query,
                    );
                    let (text, values) = sql.into_parts();
                    stream_records(&tx, visitor, &text, &values, false).await?;
                }
            }
            _ => {
                if batch {
                    return Err(GatewayError::BatchPut);
                }
                let query = queries
                    .first()
                    .ok_or_else(|| GatewayError::InvalidBody("empty body".to_string()))?;

                let mut sql = SqlBuilder::new();
                build_update(
                    &mut sql,
                    &options.fts_function,
                    &route.parameter_types,
                    &route.object_name,
                    query_string.filter.as_ref(),
                    &self.equalities(),
                    query,
                );
                let (text, values) = sql.into_parts();
                let affected = execute(&tx, &text, &values).await?;
                visit_rows_affected(visitor, affected)?;
            }
        }

        if batch {
            visitor.end_batch()?;
        }

        self.finalize(tx, responder).await
    }

    /// Any method on a procedure
    async fn procedure_call(&self, ext: &str, body: Body) -> Result<Response> {
        let route = self.route;
        let options = &self.gw.options;
        let proc = route
            .procedure
            .as_ref()
            .ok_or_else(|| GatewayError::internal("procedure metadata missing"))?;

        // 'ERROR: a column definition list is required' at call time
        if proc.returns_set && proc.category == ReturnCategory::Record {
            return Err(GatewayError::SetofRecord);
        }

        let (mut queries, batch) = match route.method {
            Method::Get | Method::Delete => (
                vec![procedure_arguments(&self.raw_query, &route.parameter_types)?],
                false,
            ),
            _ => {
                let bytes = read_body(body, options.max_body_bytes).await?;
                let content_type = self
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok());
                decode_body(content_type, &bytes, &route.parameter_types, None)?
            }
        };

        let mut responder = select_responder(ext, route, options)?;
        let visitor: &mut (dyn RecordSetVisitor + Send) = responder.as_mut();

        let mut client = self.gw.client().await?;
        let tx = client.transaction().await?;
        self.prepare_session(&tx).await?;

        if batch {
            visitor.begin_batch()?;
        }

        let shape = ProcedureShape {
            table_like: proc.returns_set || proc.category == ReturnCategory::Composite,
            jsonize: proc.category == ReturnCategory::Record,
        };

        for query in &mut queries {
            merge_overwrite(query, &route.constants);
            merge_overwrite(query, &self.path_params);

            let mut sql = SqlBuilder::new();
            build_procedure_call(&mut sql, &route.object_name, shape, query)?;
            let (text, values) = sql.into_parts();

            if proc.returns_set {
                stream_records(&tx, visitor, &text, &values, false).await?;
            } else if proc.category == ReturnCategory::Composite {
                stream_records(&tx, visitor, &text, &values, true).await?;
            } else {
                query_scalar(&tx, visitor, &text, &values).await?;
            }
        }

        if batch {
            visitor.end_batch()?;
        }

        self.finalize(tx, responder).await
    }

    /// Output cookies, commit, then assemble the response
    async fn finalize(
        &self,
        tx: deadpool_postgres::Transaction<'_>,
        responder: Box<dyn RecordSetResponder>,
    ) -> Result<Response> {
        let route = self.route;
        let cookies = collect_output_cookies(
            &tx,
            &self.gw.options.context_parameter_name,
            route,
        )
        .await?;

        tx.commit().await?;

        let payload = responder.finish()?;

        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, payload.content_type)
            .header(
                header::CACHE_CONTROL,
                cache_control(route.ttl, route.is_public),
            );
        for (binding, value) in &cookies {
            builder = builder.header(header::SET_COOKIE, format_set_cookie(binding, value));
        }

        builder
            .body(Body::from(payload.body))
            .map_err(|e| GatewayError::internal(e.to_string()))
    }
}

/// Procedure arguments from a GET/DELETE query string: each value is a JSON
/// literal decoded under the declared argument type
fn procedure_arguments(
    raw_query: &str,
    types: &pgway_protocol::ParameterTypes,
) -> Result<QueryParams> {
    let mut query = QueryParams::new();

    for (name, raw_value) in raw_pairs(raw_query) {
        let Some(ty) = types.get(&name) else {
            continue;
        };
        if query.iter().any(|(k, _)| *k == name) {
            continue;
        }
        let decoded = decode_component(raw_value);
        let value: serde_json::Value = serde_json::from_str(&decoded).map_err(|e| {
            GatewayError::InvalidBody(format!("invalid value for argument '{name}': {e}"))
        })?;
        query.push((name, decode_json_value(&value, ty)?));
    }

    Ok(query)
}

fn slice_iter<'a>(
    values: &'a [SqlParam],
) -> impl ExactSizeIterator<Item = &'a (dyn ToSql + Sync)> + 'a {
    values.iter().map(|p| p as _)
}

fn param_refs(values: &[SqlParam]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|p| p as _).collect()
}

/// Run a row-returning statement, streaming each row into the visitor
async fn stream_records(
    tx: &Transaction<'_>,
    visitor: &mut (dyn RecordSetVisitor + Send),
    sql_text: &str,
    values: &[SqlParam],
    single_row: bool,
) -> Result<()> {
    let statement = tx.prepare(sql_text).await?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let reader = RecordSetReader::new(columns, single_row);
    reader.begin(visitor)?;

    let stream = tx.query_raw(&statement, slice_iter(values)).await?;
    pin_mut!(stream);
    while let Some(row) = stream.try_next().await? {
        reader.row(visitor, &row)?;
    }

    reader.finish(visitor)?;
    Ok(())
}

/// Run a scalar-returning statement; only the first row's first column is
/// emitted, with no record framing
async fn query_scalar(
    tx: &Transaction<'_>,
    visitor: &mut (dyn RecordSetVisitor + Send),
    sql_text: &str,
    values: &[SqlParam],
) -> Result<()> {
    let statement = tx.prepare(sql_text).await?;
    let stream = tx.query_raw(&statement, slice_iter(values)).await?;
    pin_mut!(stream);

    if let Some(row) = stream.try_next().await? {
        RecordSetReader::new(Vec::new(), true).scalar(visitor, &row)?;
    }

    Ok(())
}

/// Run a statement for its row count
async fn execute(tx: &Transaction<'_>, sql_text: &str, values: &[SqlParam]) -> Result<u64> {
    let params = param_refs(values);
    Ok(tx.execute(sql_text, &params).await?)
}
