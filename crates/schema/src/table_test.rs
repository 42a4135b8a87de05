//! Route table tests

use std::collections::{HashMap, HashSet};

use crate::route::{
    Method, ObjectKind, ProcedureReturn, ReturnCategory, Route, Volatility,
};
use crate::table::RouteTable;
use crate::SchemaError;

fn route(method: Method, url_path: &str) -> Route {
    Route {
        id: 0,
        method,
        url_path: url_path.to_string(),
        object_name: "users".to_string(),
        kind: ObjectKind::Relation,
        ttl: 0,
        is_public: false,
        context_headers: HashMap::new(),
        context_parameters: Vec::new(),
        cookies: Vec::new(),
        parameter_types: HashMap::new(),
        declared_types: HashMap::new(),
        optional_parameters: Vec::new(),
        constants: Vec::new(),
        max_limit: 0,
        hidden_fields: HashSet::new(),
        read_only_fields: HashSet::new(),
        selected_columns: String::new(),
        procedure: None,
        description: String::new(),
    }
}

fn procedure_route(method: Method, url_path: &str, volatility: Volatility) -> Route {
    let mut r = route(method, url_path);
    r.kind = ObjectKind::Procedure;
    r.procedure = Some(ProcedureReturn {
        returns_set: false,
        volatility,
        category: ReturnCategory::Scalar,
        type_oid: 25,
        type_name: "text".to_string(),
    });
    r
}

#[test]
fn literal_lookup_is_method_aware() {
    let table = RouteTable::build(vec![
        route(Method::Get, "/users"),
        route(Method::Post, "/users"),
    ])
    .unwrap();

    assert_eq!(table.len(), 2);
    assert!(table.lookup(Method::Get, "/users").is_some());
    assert!(table.lookup(Method::Post, "/users").is_some());
    assert!(table.lookup(Method::Delete, "/users").is_none());
    assert!(table.lookup(Method::Get, "/orders").is_none());
}

#[test]
fn params_capture_raw_segments() {
    let table = RouteTable::build(vec![route(Method::Get, "/users/:id/posts/:post")]).unwrap();

    let m = table.lookup(Method::Get, "/users/41%20/posts/7").unwrap();
    assert_eq!(
        m.params,
        vec![
            ("id".to_string(), "41%20".to_string()),
            ("post".to_string(), "7".to_string()),
        ]
    );
}

#[test]
fn literal_beats_param() {
    let table = RouteTable::build(vec![
        route(Method::Get, "/users/me"),
        route(Method::Get, "/users/:id"),
    ])
    .unwrap();

    let m = table.lookup(Method::Get, "/users/me").unwrap();
    assert!(m.params.is_empty());
    let m = table.lookup(Method::Get, "/users/42").unwrap();
    assert_eq!(m.params, vec![("id".to_string(), "42".to_string())]);
}

#[test]
fn wildcard_captures_the_rest() {
    let table = RouteTable::build(vec![route(Method::Get, "/files/*path")]).unwrap();

    let m = table.lookup(Method::Get, "/files/a/b/c.txt").unwrap();
    assert_eq!(m.params, vec![("path".to_string(), "a/b/c.txt".to_string())]);
    // at least one segment is required
    assert!(table.lookup(Method::Get, "/files").is_none());
}

#[test]
fn param_backtracks_to_wildcard() {
    let table = RouteTable::build(vec![
        route(Method::Get, "/docs/:section/index"),
        route(Method::Get, "/docs/*rest"),
    ])
    .unwrap();

    let m = table.lookup(Method::Get, "/docs/guide/index").unwrap();
    assert_eq!(m.params, vec![("section".to_string(), "guide".to_string())]);

    let m = table.lookup(Method::Get, "/docs/guide/other").unwrap();
    assert_eq!(m.params, vec![("rest".to_string(), "guide/other".to_string())]);
}

#[test]
fn root_path_routes() {
    let table = RouteTable::build(vec![route(Method::Get, "/")]).unwrap();
    assert!(table.lookup(Method::Get, "/").is_some());
    assert!(table.lookup(Method::Get, "").is_some());
}

#[test]
fn duplicate_route_is_rejected() {
    let err = RouteTable::build(vec![
        route(Method::Get, "/users"),
        route(Method::Get, "/users"),
    ])
    .unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateRoute { .. }));
}

#[test]
fn wildcard_must_be_terminal() {
    let err = RouteTable::build(vec![route(Method::Get, "/files/*path/extra")]).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidPattern { .. }));
}

#[test]
fn conflicting_param_names_are_rejected() {
    let err = RouteTable::build(vec![
        route(Method::Get, "/users/:id"),
        route(Method::Post, "/users/:user_id"),
    ])
    .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidPattern { .. }));
}

#[test]
fn get_on_volatile_procedure_is_rejected() {
    let err = RouteTable::build(vec![procedure_route(
        Method::Get,
        "/compute",
        Volatility::Volatile,
    )])
    .unwrap_err();
    assert!(matches!(err, SchemaError::VolatileGet { .. }));

    RouteTable::build(vec![procedure_route(
        Method::Get,
        "/compute",
        Volatility::Stable,
    )])
    .unwrap();
}

#[test]
fn post_on_volatile_procedure_is_allowed() {
    RouteTable::build(vec![procedure_route(
        Method::Post,
        "/compute",
        Volatility::Volatile,
    )])
    .unwrap();
}
