//! Query-string handling
//!
//! The filter parameter must stay percent-encoded until the mini-language
//! parser tokenizes it, so this module works on raw pairs: names decode
//! immediately, values stay raw and decode per consumer.

use percent_encoding::percent_decode_str;
use pgway_filter::{parse_predicate, parse_sort_orders, Predicate, SortOrder};

use crate::error::{GatewayError, Result};

/// Parsed relation query string
#[derive(Debug, Default)]
pub struct RelationQuery {
    pub filter: Option<Predicate>,
    pub order: Vec<SortOrder>,
    /// Effective limit after clamping; values <= 0 mean unlimited
    pub limit: i64,
}

/// Split a raw query string into (decoded name, raw value) pairs
pub fn raw_pairs(raw_query: &str) -> Vec<(String, &str)> {
    raw_query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(name), value)
        })
        .collect()
}

/// Percent-decode one query-string component, `+` as space
pub fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Extract filter, sort orders and limit from a relation query string.
///
/// The limit clamps to `max_limit` when that is positive: absent,
/// non-positive, or larger requests all collapse to the maximum.
pub fn parse_relation_query(
    raw_query: &str,
    filter_name: &str,
    sort_name: &str,
    limit_name: &str,
    max_limit: i64,
) -> Result<RelationQuery> {
    let mut query = RelationQuery {
        limit: -1,
        ..Default::default()
    };

    for (name, raw_value) in raw_pairs(raw_query) {
        if name == filter_name {
            query.filter = Some(parse_predicate(raw_value)?);
        } else if name == sort_name {
            query.order = parse_sort_orders(raw_value)?;
        } else if name == limit_name {
            let decoded = decode_component(raw_value);
            query.limit = decoded
                .parse::<i64>()
                .map_err(|_| GatewayError::InvalidLimit(decoded.clone()))?;
        }
    }

    if max_limit > 0 && (query.limit <= 0 || query.limit > max_limit) {
        query.limit = max_limit;
    }

    Ok(query)
}
