//! Statement composition
//!
//! One builder per statement shape. `columns` is the precomputed, prequoted
//! non-hidden column list; when a route hides everything it is empty and the
//! statement selects no columns, which PostgreSQL permits.

use pgway_filter::{Predicate, SortOrder};
use pgway_protocol::{ParameterTypes, QueryParams, SqlParam};

use crate::builder::SqlBuilder;
use crate::error::{Result, SqlError};
use crate::predicate::{append_predicate, append_sort_orders};

/// WHERE clause from an optional client filter plus route-level equality
/// terms (constants and path parameters). The filter renders first; every
/// equality conjoins with AND, null values as `IS NULL`.
fn append_where(
    sql: &mut SqlBuilder,
    fts_function: &str,
    types: &ParameterTypes,
    filter: Option<&Predicate>,
    equalities: &QueryParams,
) {
    if filter.is_none() && equalities.is_empty() {
        return;
    }

    sql.push_sql(" WHERE ");
    let mut first = true;

    if let Some(filter) = filter {
        append_predicate(sql, fts_function, types, filter);
        first = false;
    }

    for (name, value) in equalities {
        if !first {
            sql.push_sql(" AND ");
        }
        first = false;
        sql.push_identifier(name);
        if matches!(value, SqlParam::Null) {
            sql.push_sql(" IS NULL");
        } else {
            sql.push_sql("=");
            sql.push_value(value.clone());
        }
    }
}

/// `SELECT <columns> FROM "<relation>" [WHERE ...] [ORDER BY ...] [LIMIT $n]`
#[allow(clippy::too_many_arguments)]
pub fn build_select(
    sql: &mut SqlBuilder,
    fts_function: &str,
    types: &ParameterTypes,
    columns: &str,
    relation: &str,
    filter: Option<&Predicate>,
    equalities: &QueryParams,
    order: &[SortOrder],
    limit: i64,
) {
    sql.push_sql("SELECT ");
    sql.push_sql(columns);
    sql.push_sql(" FROM ");
    sql.push_identifier(relation);

    append_where(sql, fts_function, types, filter, equalities);

    if !order.is_empty() {
        sql.push_sql(" ORDER BY ");
        append_sort_orders(sql, order);
    }

    if limit > 0 {
        sql.push_sql(" LIMIT ");
        sql.push_value(SqlParam::Integer(limit));
    }
}

/// `INSERT INTO "<relation>" (...) VALUES (...) RETURNING <columns>`
pub fn build_insert(sql: &mut SqlBuilder, columns: &str, relation: &str, query: &QueryParams) {
    sql.push_sql("INSERT INTO ");
    sql.push_identifier(relation);

    sql.push_sql(" (");
    for (i, (name, _)) in query.iter().enumerate() {
        if i > 0 {
            sql.push_sql(",");
        }
        sql.push_identifier(name);
    }
    sql.push_sql(") VALUES (");
    for (i, (_, value)) in query.iter().enumerate() {
        if i > 0 {
            sql.push_sql(",");
        }
        sql.push_value(value.clone());
    }
    sql.push_sql(") RETURNING ");
    sql.push_sql(columns);
}

/// `UPDATE "<relation>" SET ... [WHERE ...]`
pub fn build_update(
    sql: &mut SqlBuilder,
    fts_function: &str,
    types: &ParameterTypes,
    relation: &str,
    filter: Option<&Predicate>,
    equalities: &QueryParams,
    query: &QueryParams,
) {
    sql.push_sql("UPDATE ");
    sql.push_identifier(relation);

    sql.push_sql(" SET ");
    for (i, (name, value)) in query.iter().enumerate() {
        if i > 0 {
            sql.push_sql(",");
        }
        sql.push_identifier(name);
        sql.push_sql(" = ");
        sql.push_value(value.clone());
    }

    append_where(sql, fts_function, types, filter, equalities);
}

/// `DELETE FROM "<relation>" [WHERE ...]`
pub fn build_delete(
    sql: &mut SqlBuilder,
    fts_function: &str,
    types: &ParameterTypes,
    relation: &str,
    filter: Option<&Predicate>,
    equalities: &QueryParams,
) {
    sql.push_sql("DELETE FROM ");
    sql.push_identifier(relation);

    append_where(sql, fts_function, types, filter, equalities);
}

/// How a procedure's return shapes the calling statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcedureShape {
    /// Returns a set of rows, or a composite type expanded to one row;
    /// either way the call belongs in a FROM clause
    pub table_like: bool,
    /// Returns the untyped `record`; the result is wrapped in
    /// `row_to_json` because no column definition list exists at call time
    pub jsonize: bool,
}

/// `SELECT [* FROM] "<procedure>"(name := $n, ...)` with optional
/// `row_to_json` wrapping
pub fn build_procedure_call(
    sql: &mut SqlBuilder,
    procedure: &str,
    shape: ProcedureShape,
    query: &QueryParams,
) -> Result<()> {
    if shape.table_like {
        if shape.jsonize {
            return Err(SqlError::JsonizeResultSet);
        }
        sql.push_sql("SELECT * FROM ");
    } else if shape.jsonize {
        sql.push_sql("SELECT row_to_json(");
    } else {
        sql.push_sql("SELECT ");
    }

    sql.push_identifier(procedure);
    sql.push_sql("(");
    for (i, (name, value)) in query.iter().enumerate() {
        if i > 0 {
            sql.push_sql(",");
        }
        sql.push_identifier(name);
        sql.push_sql(" := ");
        sql.push_value(value.clone());
    }
    sql.push_sql(")");

    if shape.jsonize {
        sql.push_sql(")");
    }

    Ok(())
}
