//! Query-string parsing tests

use pgway_filter::Predicate;

use crate::querystring::{parse_relation_query, raw_pairs};

#[test]
fn pairs_keep_values_raw() {
    let pairs = raw_pairs("f=eq(a,%241)&o=!name&l=5");
    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs[0], ("f".to_string(), "eq(a,%241)"));
    assert_eq!(pairs[1], ("o".to_string(), "!name"));
}

#[test]
fn full_relation_query() {
    let query = parse_relation_query("f=ge(id,10)&o=!name&l=2", "f", "o", "l", 0).unwrap();
    assert!(matches!(query.filter, Some(Predicate::Ge { .. })));
    assert_eq!(query.order.len(), 1);
    assert!(!query.order[0].ascending);
    assert_eq!(query.limit, 2);
}

#[test]
fn filter_value_decodes_after_tokenizing() {
    let query = parse_relation_query("f=eq(status,%24a%2Cctive)", "f", "o", "l", 0).unwrap();
    match query.filter {
        Some(Predicate::Eq { values, .. }) => {
            assert_eq!(values.len(), 1);
        }
        other => panic!("expected Eq, got {other:?}"),
    }
}

#[test]
fn absent_parameters_leave_defaults() {
    let query = parse_relation_query("", "f", "o", "l", 0).unwrap();
    assert!(query.filter.is_none());
    assert!(query.order.is_empty());
    assert_eq!(query.limit, -1);
}

#[test]
fn limit_clamps_to_max() {
    // above max
    assert_eq!(
        parse_relation_query("l=500", "f", "o", "l", 100).unwrap().limit,
        100
    );
    // below max passes through
    assert_eq!(
        parse_relation_query("l=5", "f", "o", "l", 100).unwrap().limit,
        5
    );
    // absent or non-positive collapse to max
    assert_eq!(parse_relation_query("", "f", "o", "l", 100).unwrap().limit, 100);
    assert_eq!(
        parse_relation_query("l=0", "f", "o", "l", 100).unwrap().limit,
        100
    );
    // no max leaves the request alone
    assert_eq!(
        parse_relation_query("l=500", "f", "o", "l", 0).unwrap().limit,
        500
    );
}

#[test]
fn bad_limit_is_an_error() {
    assert!(parse_relation_query("l=ten", "f", "o", "l", 0).is_err());
}
