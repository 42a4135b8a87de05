//! Request body decoding
//!
//! Bodies arrive as one JSON object (single query), a JSON array of objects
//! (batch), or a form. Read-only fields strip here, before any value
//! decodes; keys without an introspected type are dropped the same way.

use std::collections::HashSet;

use axum::body::Body;
use bytes::Bytes;
use pgway_protocol::{decode_form_value, decode_json_value, ParameterTypes, QueryParams};
use serde_json::Value as Json;

use crate::error::{GatewayError, Result};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Read the body under the configured size cap
pub async fn read_body(body: Body, max_bytes: usize) -> Result<Bytes> {
    axum::body::to_bytes(body, max_bytes)
        .await
        .map_err(|_| GatewayError::BodyTooLarge)
}

/// Decode a request body into per-entry parameter maps.
///
/// Returns the queries plus whether the body was a batch (JSON array).
pub fn decode_body(
    content_type: Option<&str>,
    bytes: &[u8],
    types: &ParameterTypes,
    read_only: Option<&HashSet<String>>,
) -> Result<(Vec<QueryParams>, bool)> {
    if content_type == Some(FORM_CONTENT_TYPE) {
        let query = decode_form(bytes, types, read_only);
        return Ok((vec![query], false));
    }

    let value: Json = serde_json::from_slice(bytes)
        .map_err(|e| GatewayError::InvalidBody(format!("invalid json body: {e}")))?;

    match value {
        Json::Object(object) => {
            let query = decode_object(&object, types, read_only)?;
            Ok((vec![query], false))
        }
        Json::Array(items) => {
            let mut queries = Vec::with_capacity(items.len());
            for item in &items {
                let object = item.as_object().ok_or_else(|| {
                    GatewayError::InvalidBody(
                        "Invalid json value type, array must contain objects.".to_string(),
                    )
                })?;
                queries.push(decode_object(object, types, read_only)?);
            }
            Ok((queries, true))
        }
        _ => Err(GatewayError::InvalidBody(
            "Invalid json value type, must be array or object.".to_string(),
        )),
    }
}

fn decode_object(
    object: &serde_json::Map<String, Json>,
    types: &ParameterTypes,
    read_only: Option<&HashSet<String>>,
) -> Result<QueryParams> {
    let mut query = QueryParams::new();

    for (key, value) in object {
        if read_only.is_some_and(|fields| fields.contains(key)) {
            continue;
        }
        let Some(ty) = types.get(key) else {
            continue;
        };
        query.push((key.clone(), decode_json_value(value, ty)?));
    }

    Ok(query)
}

/// Form fields: keys lowercase, first occurrence wins, values pass through
/// as text
fn decode_form(
    bytes: &[u8],
    types: &ParameterTypes,
    read_only: Option<&HashSet<String>>,
) -> QueryParams {
    let mut query = QueryParams::new();

    for (key, value) in url::form_urlencoded::parse(bytes) {
        let key = key.to_lowercase();
        if read_only.is_some_and(|fields| fields.contains(&key)) {
            continue;
        }
        let Some(ty) = types.get(&key) else {
            continue;
        };
        if query.iter().any(|(k, _)| *k == key) {
            continue;
        }
        query.push((key, decode_form_value(&value, ty)));
    }

    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgway_protocol::{ParameterType, SqlParam};

    fn types() -> ParameterTypes {
        [("id", "integer"), ("name", "text")]
            .iter()
            .map(|(n, t)| (n.to_string(), ParameterType::scalar(*t)))
            .collect()
    }

    #[test]
    fn single_object_body() {
        let (queries, batch) =
            decode_body(None, br#"{"id": 7, "name": "ada"}"#, &types(), None).unwrap();
        assert!(!batch);
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].len(), 2);
    }

    #[test]
    fn array_body_is_a_batch() {
        let (queries, batch) =
            decode_body(None, br#"[{"id": 1}, {"id": 2}]"#, &types(), None).unwrap();
        assert!(batch);
        assert_eq!(queries.len(), 2);
    }

    #[test]
    fn array_of_non_objects_is_rejected() {
        let err = decode_body(None, b"[1, 2]", &types(), None).unwrap_err();
        assert!(err.to_string().contains("array must contain objects"));
    }

    #[test]
    fn scalar_body_is_rejected() {
        assert!(decode_body(None, b"42", &types(), None).is_err());
    }

    #[test]
    fn read_only_fields_strip() {
        let read_only: HashSet<String> = ["id".to_string()].into_iter().collect();
        let (queries, _) = decode_body(
            None,
            br#"{"id": 999, "name": "ada"}"#,
            &types(),
            Some(&read_only),
        )
        .unwrap();
        assert_eq!(
            queries[0],
            vec![("name".to_string(), SqlParam::Text("ada".to_string()))]
        );
    }

    #[test]
    fn unknown_keys_drop() {
        let (queries, _) = decode_body(None, br#"{"bogus": 1}"#, &types(), None).unwrap();
        assert!(queries[0].is_empty());
    }

    #[test]
    fn form_body_lowercases_and_keeps_first() {
        let (queries, batch) = decode_body(
            Some(FORM_CONTENT_TYPE),
            b"Name=ada&name=ignored&id=7",
            &types(),
            None,
        )
        .unwrap();
        assert!(!batch);
        assert_eq!(
            queries[0],
            vec![
                ("name".to_string(), SqlParam::Text("ada".to_string())),
                ("id".to_string(), SqlParam::Text("7".to_string())),
            ]
        );
    }
}
