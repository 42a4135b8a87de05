//! Session context assembly tests

use std::collections::{HashMap, HashSet};

use axum::http::{HeaderMap, HeaderValue};
use pgway_schema::{CookieBinding, Method, ObjectKind, Route};

use crate::context::{build_context, cache_control, format_set_cookie};

fn base_route() -> Route {
    Route {
        id: 0,
        method: Method::Get,
        url_path: "/users/:org".to_string(),
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

fn cookie(name: &str, read: bool, http_only: bool) -> CookieBinding {
    let mut binding = CookieBinding {
        name: name.to_string(),
        read,
        http_only,
        ..CookieBinding::default()
    };
    binding.normalize("", "", false);
    binding
}

#[test]
fn defaults_seed_the_context() {
    let defaults: HashMap<String, String> =
        [("application".to_string(), "pgway".to_string())].into();
    let context = build_context(&defaults, &base_route(), &[], &HeaderMap::new());
    assert_eq!(context.get("application").unwrap(), "pgway");
}

#[test]
fn whitelisted_cookies_land_under_their_variable() {
    let mut route = base_route();
    route.cookies.push(cookie("session", true, false));
    route.cookies.push(cookie("untracked", false, false));

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::COOKIE,
        HeaderValue::from_static("session=abc; untracked=zzz; other=1"),
    );

    let context = build_context(&HashMap::new(), &route, &[], &headers);
    assert_eq!(context.get("session").unwrap(), "abc");
    assert!(!context.contains_key("untracked"));
    assert!(!context.contains_key("other"));
}

#[test]
fn http_only_read_cookies_never_match_requests() {
    let mut route = base_route();
    route.cookies.push(cookie("session", true, true));

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::COOKIE,
        HeaderValue::from_static("session=abc"),
    );

    let context = build_context(&HashMap::new(), &route, &[], &headers);
    assert!(context.is_empty());
}

#[test]
fn context_parameters_copy_raw_path_values() {
    let mut route = base_route();
    route.context_parameters.push("org".to_string());

    let params = vec![("org".to_string(), "acme".to_string())];
    let context = build_context(&HashMap::new(), &route, &params, &HeaderMap::new());
    assert_eq!(context.get("org").unwrap(), "acme");

    // absent parameters still set an empty variable
    let context = build_context(&HashMap::new(), &route, &[], &HeaderMap::new());
    assert_eq!(context.get("org").unwrap(), "");
}

#[test]
fn mapped_headers_rename_or_keep_their_name() {
    let mut route = base_route();
    route
        .context_headers
        .insert("x-request-id".to_string(), Some("request_id".to_string()));
    route.context_headers.insert("x-tenant".to_string(), None);

    let mut headers = HeaderMap::new();
    headers.insert("x-request-id", HeaderValue::from_static("r-1"));
    headers.insert("x-tenant", HeaderValue::from_static("t-9"));

    let context = build_context(&HashMap::new(), &route, &[], &headers);
    assert_eq!(context.get("request_id").unwrap(), "r-1");
    assert_eq!(context.get("x-tenant").unwrap(), "t-9");
}

#[test]
fn set_cookie_renders_attributes() {
    let mut binding = CookieBinding {
        name: "session".to_string(),
        max_age: 3600,
        sub_domain: Some("app".to_string()),
        path: Some("/portal".to_string()),
        secure: true,
        http_only: true,
        write: true,
        ..CookieBinding::default()
    };
    binding.normalize("example.com", "", false);

    assert_eq!(
        format_set_cookie(&binding, "abc"),
        "session=abc; Max-Age=3600; Domain=app.example.com; Path=/portal; Secure; HttpOnly"
    );
}

#[test]
fn session_cookies_omit_max_age() {
    let binding = cookie("lang", false, false);
    assert_eq!(format_set_cookie(&binding, "fr"), "lang=fr");
}

#[test]
fn cache_control_covers_all_route_policies() {
    assert_eq!(cache_control(60, true), "public, max-age=60");
    assert_eq!(cache_control(60, false), "private, max-age=60");
    assert_eq!(cache_control(0, true), "public, no-store");
    assert_eq!(cache_control(0, false), "private, no-store");
}
