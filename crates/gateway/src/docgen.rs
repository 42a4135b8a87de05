//! API reference generation
//!
//! Renders the loaded route registry into a Markdown document: a protocol
//! preamble, a resource index, and one section per route with its
//! parameters, cookies and cache policy. Runs against the same loader as
//! the server, so the reference always mirrors what would be served.

use std::collections::BTreeMap;
use std::fmt::Write;

use pgway_schema::{Method, ObjectKind, Route};

/// Render the API reference for a set of loaded routes
pub fn render_documentation(
    routes: &[Route],
    filter_parameter: &str,
    sort_parameter: &str,
    limit_parameter: &str,
) -> String {
    let mut out = String::new();

    preamble(&mut out, filter_parameter, sort_parameter, limit_parameter);
    resource_index(&mut out, routes);

    for route in routes {
        route_section(&mut out, route);
    }

    out
}

fn preamble(out: &mut String, filter: &str, sort: &str, limit: &str) {
    out.push_str("# API Specification\n\n");
    out.push_str("## Protocol\n\n");
    out.push_str("This web service implements a RESTful compatible interface.\n\n");

    out.push_str("### Requests\n\n");
    out.push_str(
        "A resource is identified by its URL. URLs may contain arguments in two formats:\n\n\
         - `/:arg_name`, matching a single path segment\n\
         - `/*arg_name`, placed at the end of a route, matching the rest of the path\n\n",
    );
    out.push_str(
        "The expected response format is specified by appending an extension `.ext` to the \
         URL. This is compulsory. Available formats:\n\n\
         - `.json`\n\
         - `.xlsx`\n\
         - `.csv`\n\
         - `.bin`\n\
         - Other formats may be available depending on route.\n\n",
    );
    out.push_str(
        "Arguments not expected in the URL go in the query string for *get* and *delete* \
         requests, or in the request body for *post* and *put*. The recommended content type \
         is `application/json`: either one object of parameters, or an array of objects for \
         batch requests (several result sets are then returned). Without a content type, \
         `application/x-www-form-urlencoded` is assumed.\n\n",
    );
    let _ = writeln!(
        out,
        "Requests on *relations* also accept a structured filter, sort order, and limit in \
         the query string:\n\n\
         - `{filter}`, filter condition\n\
         - `{sort}`, sort order\n\
         - `{limit}`, limit\n",
    );

    out.push_str("\n### Responses\n\n");
    out.push_str(
        "Cache-control settings are route specific; see each route below.\n\n\
         *json*: result sets are arrays of objects; batches are arrays of result sets.\n\n\
         *xlsx*: each result set becomes a sheet.\n\n\
         *csv*: a single result set; fields comma-separated, text double-quoted. \
         Batch mode is not supported.\n\n\
         *bin*: raw binary data for routes returning a single scalar.\n\n",
    );
}

fn resource_index(out: &mut String, routes: &[Route]) {
    out.push_str("## Resources\n\n");

    let mut by_path: BTreeMap<&str, Vec<Method>> = BTreeMap::new();
    for route in routes {
        by_path.entry(&route.url_path).or_default().push(route.method);
    }

    for (path, methods) in by_path {
        let methods: Vec<&str> = methods.iter().map(|m| m.as_str()).collect();
        let _ = writeln!(out, "- `{path}` ({})", methods.join(", "));
    }
    out.push('\n');
}

fn route_section(out: &mut String, route: &Route) {
    let _ = writeln!(
        out,
        "### {} `{}`\n",
        route.method.as_str().to_uppercase(),
        route.url_path
    );

    if !route.description.is_empty() {
        let _ = writeln!(out, "{}\n", route.description);
    }

    let kind = match route.kind {
        ObjectKind::Relation => "relation",
        ObjectKind::Procedure => "procedure",
    };
    let _ = writeln!(out, "Target: {kind} `{}`\n", route.object_name);

    let cache = if route.ttl > 0 {
        format!("cacheable for {} seconds", route.ttl)
    } else {
        "not cacheable".to_string()
    };
    let scope = if route.is_public { "public" } else { "private" };
    let _ = writeln!(out, "Cache: {scope}, {cache}.\n");

    if route.max_limit > 0 {
        let _ = writeln!(out, "At most {} rows are returned.\n", route.max_limit);
    }

    parameters_table(out, route);
    cookie_list(out, route);
}

fn parameters_table(out: &mut String, route: &Route) {
    if route.declared_types.is_empty() {
        return;
    }

    out.push_str("| Parameter | Type | Optional |\n|---|---|---|\n");

    let names: BTreeMap<&String, &String> = route.declared_types.iter().collect();
    for (name, declared) in names {
        if route.hidden_fields.contains(name.as_str()) {
            continue;
        }
        let optional = route.optional_parameters.contains(name);
        let read_only = route.read_only_fields.contains(name.as_str());
        let mut flags = String::from(if optional { "yes" } else { "no" });
        if read_only {
            flags.push_str(", read-only");
        }
        let _ = writeln!(out, "| `{name}` | `{declared}` | {flags} |");
    }
    out.push('\n');
}

fn cookie_list(out: &mut String, route: &Route) {
    if route.cookies.is_empty() {
        return;
    }

    out.push_str("Cookies:\n\n");
    for cookie in &route.cookies {
        let mut traits = Vec::new();
        if cookie.read {
            traits.push("read");
        }
        if cookie.write {
            traits.push("written");
        }
        if cookie.secure {
            traits.push("secure");
        }
        if cookie.http_only {
            traits.push("http-only");
        }
        let _ = writeln!(
            out,
            "- `{}` ({}), session variable `{}`",
            cookie.name,
            traits.join(", "),
            cookie.variable()
        );
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn sample_route() -> Route {
        Route {
            id: 1,
            method: Method::Get,
            url_path: "/users/:id".to_string(),
            object_name: "users".to_string(),
            kind: ObjectKind::Relation,
            ttl: 60,
            is_public: true,
            context_headers: HashMap::new(),
            context_parameters: Vec::new(),
            cookies: Vec::new(),
            parameter_types: HashMap::new(),
            declared_types: [
                ("id".to_string(), "integer".to_string()),
                ("name".to_string(), "text".to_string()),
                ("secret".to_string(), "text".to_string()),
            ]
            .into_iter()
            .collect(),
            optional_parameters: vec!["name".to_string()],
            constants: Vec::new(),
            max_limit: 100,
            hidden_fields: ["secret".to_string()].into_iter().collect::<HashSet<_>>(),
            read_only_fields: HashSet::new(),
            selected_columns: String::new(),
            procedure: None,
            description: "All users.".to_string(),
        }
    }

    #[test]
    fn renders_route_and_hides_hidden_fields() {
        let doc = render_documentation(&[sample_route()], "f", "o", "l");
        assert!(doc.contains("### GET `/users/:id`"));
        assert!(doc.contains("All users."));
        assert!(doc.contains("| `id` | `integer` | no |"));
        assert!(doc.contains("| `name` | `text` | yes |"));
        assert!(!doc.contains("`secret`"));
        assert!(doc.contains("public, cacheable for 60 seconds"));
        assert!(doc.contains("At most 100 rows"));
    }

    #[test]
    fn index_groups_methods_by_path() {
        let mut post = sample_route();
        post.method = Method::Post;
        let doc = render_documentation(&[sample_route(), post], "f", "o", "l");
        assert!(doc.contains("- `/users/:id` (get, post)"));
    }
}
