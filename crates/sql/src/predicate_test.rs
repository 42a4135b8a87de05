//! Predicate translation golden tests

use pgway_filter::{parse_predicate, parse_sort_orders, Predicate, Value};
use pgway_protocol::{ParameterType, ParameterTypes, SqlParam};

use crate::builder::SqlBuilder;
use crate::predicate::{append_predicate, append_sort_orders};

fn types(entries: &[(&str, &str)]) -> ParameterTypes {
    entries
        .iter()
        .map(|(name, ty)| (name.to_string(), ParameterType::scalar(*ty)))
        .collect()
}

fn translate(types: &ParameterTypes, raw: &str) -> (String, Vec<SqlParam>) {
    let predicate = parse_predicate(raw).unwrap();
    let mut sql = SqlBuilder::new();
    append_predicate(&mut sql, "to_tsquery", types, &predicate);
    sql.into_parts()
}

#[test]
fn comparison_binds_value() {
    let (sql, values) = translate(&types(&[("id", "integer")]), "ge(id,10)");
    assert_eq!(sql, "\"id\">=$1");
    assert_eq!(values, vec![SqlParam::Integer(10)]);
}

#[test]
fn eq_single_null_is_is_null() {
    let (sql, values) = translate(&types(&[("status", "text")]), "eq(status,null)");
    assert_eq!(sql, "\"status\" IS NULL");
    assert!(values.is_empty());
}

#[test]
fn eq_multi_with_null_adds_disjunct() {
    let (sql, values) = translate(&types(&[("status", "text")]), "eq(status,$active,null)");
    assert_eq!(sql, "\"status\" IN ($1) OR \"status\" IS NULL");
    assert_eq!(values, vec![SqlParam::Text("active".to_string())]);
}

#[test]
fn eq_multi_values() {
    let (sql, values) = translate(&types(&[("status", "text")]), "eq(status,$a,$b)");
    assert_eq!(sql, "\"status\" IN ($1,$2)");
    assert_eq!(values.len(), 2);
}

#[test]
fn eq_no_operands_selects_nothing() {
    let (sql, values) = translate(&types(&[("status", "text")]), "eq(status)");
    assert_eq!(sql, "false");
    assert!(values.is_empty());
}

#[test]
fn empty_junctions_use_identity_literals() {
    let (sql, _) = translate(&ParameterTypes::new(), "and()");
    assert_eq!(sql, "(true)");
    let (sql, _) = translate(&ParameterTypes::new(), "or()");
    assert_eq!(sql, "(false)");
}

#[test]
fn junctions_and_negation_parenthesize() {
    let (sql, values) = translate(
        &types(&[("a", "integer"), ("b", "integer")]),
        "not(and(lt(a,1),gt(b,2)))",
    );
    assert_eq!(sql, "(NOT (\"a\"<$1 AND \"b\">$2))");
    assert_eq!(values.len(), 2);
}

#[test]
fn array_field_single_operand_uses_containment() {
    let mut t = ParameterTypes::new();
    t.insert(
        "tags".to_string(),
        ParameterType {
            name: "text[]".to_string(),
            element_oid: 25,
        },
    );
    let (sql, values) = translate(&t, "eq(tags,$blue)");
    assert_eq!(sql, "\"tags\"@>ARRAY[$1]::text[]");
    assert_eq!(values, vec![SqlParam::Text("blue".to_string())]);
}

#[test]
fn array_field_multiple_operands_use_overlap() {
    let mut t = ParameterTypes::new();
    t.insert(
        "tags".to_string(),
        ParameterType {
            name: "text[]".to_string(),
            element_oid: 25,
        },
    );
    let (sql, values) = translate(&t, "eq(tags,$blue,$red)");
    assert_eq!(sql, "\"tags\"&&ARRAY[$1,$2]::text[]");
    assert_eq!(values.len(), 2);
}

#[test]
fn fts_wraps_query_in_configured_function() {
    let (sql, values) = translate(&types(&[("body", "tsvector")]), "fts(body,$fast+cars)");
    assert_eq!(sql, "\"body\" @@ \"to_tsquery\"($1)");
    assert_eq!(values, vec![SqlParam::Text("fast cars".to_string())]);
}

#[test]
fn numbers_coerce_per_declared_type() {
    // integer family: float literal narrows to i64
    let (_, values) = translate(&types(&[("id", "bigint")]), "eq(id,10)");
    assert_eq!(values, vec![SqlParam::Integer(10)]);

    // numeric: stringified, never a binary float
    let (_, values) = translate(&types(&[("total", "numeric")]), "eq(total,12.5)");
    assert_eq!(values, vec![SqlParam::Text("12.5".to_string())]);

    // untyped fields stay floats
    let (_, values) = translate(&ParameterTypes::new(), "eq(x,1.5)");
    assert_eq!(values, vec![SqlParam::Float(1.5)]);
}

#[test]
fn field_identifiers_are_quoted_inert() {
    let (sql, _) = translate(&ParameterTypes::new(), "eq(a%22%3Bdrop,1)");
    // the quote in the field name is doubled, so the identifier closes
    // exactly where the builder closes it
    assert_eq!(sql, "\"a\"\";drop\"=$1");
}

#[test]
fn sort_orders_render_desc_suffix() {
    let orders = parse_sort_orders("!name,age").unwrap();
    let mut sql = SqlBuilder::new();
    append_sort_orders(&mut sql, &orders);
    assert_eq!(sql.sql(), "\"name\" DESC,\"age\"");
}

#[test]
fn hand_built_eq_matches_parser_output() {
    let mut sql = SqlBuilder::new();
    append_predicate(
        &mut sql,
        "to_tsquery",
        &types(&[("id", "integer")]),
        &Predicate::eq_one("id", Value::Number(7.0)),
    );
    assert_eq!(sql.sql(), "\"id\"=$1");
}
