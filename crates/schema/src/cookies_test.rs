//! Cookie binding tests

use crate::cookies::CookieBinding;

fn from_json(raw: &str) -> Vec<CookieBinding> {
    serde_json::from_str(raw).unwrap()
}

#[test]
fn deserializes_registry_shape() {
    let cookies = from_json(
        r#"[{"name":"session","contextVariable":"session_id","maxAge":3600,
             "subDomain":"app","path":"/","secure":true,"httpOnly":true,
             "read":true,"write":true}]"#,
    );
    assert_eq!(cookies.len(), 1);
    let c = &cookies[0];
    assert_eq!(c.name, "session");
    assert_eq!(c.context_variable.as_deref(), Some("session_id"));
    assert_eq!(c.max_age, 3600);
    assert!(c.secure && c.http_only && c.read && c.write);
}

#[test]
fn context_variable_defaults_to_cookie_name() {
    let mut c = from_json(r#"[{"name":"lang","read":true}]"#).remove(0);
    c.normalize("", "", false);
    assert_eq!(c.variable(), "lang");
}

#[test]
fn null_context_variable_also_defaults() {
    let mut c = from_json(r#"[{"name":"lang","contextVariable":null}]"#).remove(0);
    c.normalize("", "", false);
    assert_eq!(c.variable(), "lang");
}

#[test]
fn sub_domain_composes_with_base() {
    let mut c = from_json(r#"[{"name":"s","subDomain":"app"}]"#).remove(0);
    c.normalize("example.com", "", false);
    assert_eq!(c.sub_domain.as_deref(), Some("app.example.com"));

    let mut c = from_json(r#"[{"name":"s"}]"#).remove(0);
    c.normalize("example.com", "", false);
    assert_eq!(c.sub_domain.as_deref(), Some("example.com"));
}

#[test]
fn path_composes_with_base() {
    let mut c = from_json(r#"[{"name":"s","path":"sub"}]"#).remove(0);
    c.normalize("", "/api/", false);
    assert_eq!(c.path.as_deref(), Some("/api/sub"));
}

#[test]
fn disable_secure_clears_flag() {
    let mut c = from_json(r#"[{"name":"s","secure":true}]"#).remove(0);
    c.normalize("", "", true);
    assert!(!c.secure);
}
