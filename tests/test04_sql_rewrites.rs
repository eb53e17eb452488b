#![cfg(feature = "test-utils")]

use std::borrow::Cow;

use chrono::{FixedOffset, TimeZone, Utc};
use spanner_adapter::test_utils::FakeConnector;
use spanner_adapter::{
    SpannerAdapter, SpannerOptions, add_cast, convert_date, format_date, get_auto_increment,
    sanitize_sql,
};

#[test]
fn sanitize_handles_typical_framework_queries() {
    let sql = "SELECT * FROM catalog_product_entity WHERE entity_id IN ('1', '2') \
               AND type_id = 'simple' ORDER BY RAND() LIMIT '10'";
    assert_eq!(
        sanitize_sql(sql),
        "SELECT * FROM catalog_product_entity WHERE entity_id IN (1, 2) \
         AND type_id = 'simple' ORDER BY 1 LIMIT 10"
    );
}

#[test]
fn sanitize_is_a_noop_on_clean_sql() {
    let sql = "SELECT sku FROM catalog_product_entity WHERE type_id = 'simple'";
    assert!(matches!(sanitize_sql(sql), Cow::Borrowed(s) if s == sql));
}

#[test]
fn sanitize_saturates_huge_literals() {
    assert_eq!(
        sanitize_sql("WHERE id = '99999999999999999999999'"),
        format!("WHERE id = {}", i64::MAX)
    );
}

#[test]
fn cast_wraps_join_columns() {
    let sql = "SELECT e.entity_id, v.value FROM catalog_product_entity e \
               JOIN catalog_product_entity_varchar v ON v.entity_id = e.entity_id";
    assert_eq!(
        add_cast(sql, "entity_id", "STRING"),
        "SELECT cast(e.entity_id as STRING), v.value FROM catalog_product_entity e \
         JOIN catalog_product_entity_varchar v ON cast(v.entity_id as STRING) = cast(e.entity_id as STRING)"
    );
}

#[test]
fn cast_leaves_unrelated_sql_borrowed() {
    let sql = "SELECT entity_id_old FROM t -- entity_id\nWHERE note = 'entity_id'";
    assert!(matches!(add_cast(sql, "entity_id", "INT64"), Cow::Borrowed(_)));
}

#[test]
fn dates_always_end_in_utc_millis() {
    let berlin = FixedOffset::east_opt(2 * 3600).unwrap();
    let dt = berlin.with_ymd_and_hms(2024, 5, 1, 12, 20, 30).unwrap();
    let formatted = format_date(&dt);
    assert_eq!(formatted, "2024-05-01T10:20:30.000Z");
    assert!(!formatted.contains("+00:00"));

    for input in [
        "2024-05-01 10:20:30",
        "2024-05-01T10:20:30.456",
        "2024-05-01T10:20:30Z",
        "@1714558830",
    ] {
        assert_eq!(convert_date(input).unwrap(), "2024-05-01T10:20:30.000Z", "{input}");
    }
    assert_eq!(convert_date("2024-05-01").unwrap(), "2024-05-01T00:00:00.000Z");
    assert!(convert_date("yesterday").is_err());
}

#[test]
fn auto_increment_keys_are_uppercase_uuids() {
    let a = get_auto_increment();
    let b = get_auto_increment();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
    assert_eq!(a, a.to_uppercase());
    assert_eq!(a.matches('-').count(), 4);
}

#[test]
fn adapter_helpers_match_free_functions() -> Result<(), Box<dyn std::error::Error>> {
    let adapter = SpannerAdapter::new(SpannerOptions::default(), FakeConnector::new())?;
    let sql = "SELECT a FROM t WHERE b = '5'";
    assert_eq!(adapter.sanitize_sql(sql), sanitize_sql(sql));
    assert_eq!(adapter.add_cast(sql, "a", "INT64"), add_cast(sql, "a", "INT64"));
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(adapter.format_date(&now), "2024-01-02T03:04:05.000Z");
    assert_eq!(adapter.convert_date("2024-01-02 03:04:05")?, "2024-01-02T03:04:05.000Z");
    assert!(!adapter.is_connected());
    Ok(())
}
