//! Tests for the shared line formatters

use indexmap::IndexMap;
use serde_json::json;

use crate::entry::LogEntry;
use crate::format::{format_json, format_plain};
use crate::kind::EntryKind;

#[test]
fn test_plain_full_decoration() {
    let entry = LogEntry::builder(EntryKind::Error, "charge failed")
        .service_name("billing")
        .entity_name("invoice-worker")
        .build();

    assert_eq!(
        format_plain(&entry),
        "[error] [billing] [invoice-worker] charge failed"
    );
}

#[test]
fn test_plain_omits_absent_segments() {
    let entry = LogEntry::new(EntryKind::Info, "started");
    assert_eq!(format_plain(&entry), "[info] started");

    let entry = LogEntry::builder(EntryKind::Warning, "slow query")
        .service_name("db")
        .build();
    assert_eq!(format_plain(&entry), "[warning] [db] slow query");
}

#[test]
fn test_plain_raw_is_bare_message() {
    let entry = LogEntry::builder(EntryKind::Raw, "raw payload")
        .service_name("ignored")
        .entity_name("ignored")
        .build();
    assert_eq!(format_plain(&entry), "raw payload");
}

#[test]
fn test_plain_has_no_trailing_newline() {
    let entry = LogEntry::new(EntryKind::Info, "line");
    assert!(!format_plain(&entry).ends_with('\n'));
}

#[test]
fn test_json_key_order_and_values() {
    let mut params = IndexMap::new();
    params.insert("zeta".to_string(), json!(1));
    params.insert("alpha".to_string(), json!(2));

    let entry = LogEntry::builder(EntryKind::Info, "ordered")
        .timestamp(1_700_000_000_000)
        .service_name("svc")
        .entity_name("ent")
        .params(params)
        .build();

    let line = format_json(&entry).unwrap();
    assert_eq!(
        line,
        r#"{"timestamp":1700000000000,"type":"info","serviceName":"svc","entityName":"ent","message":"ordered","params":{"zeta":1,"alpha":2}}"#
    );
}

#[test]
fn test_json_omits_absent_fields() {
    let entry = LogEntry::builder(EntryKind::Debug, "bare")
        .timestamp(5)
        .build();

    let line = format_json(&entry).unwrap();
    assert_eq!(line, r#"{"timestamp":5,"type":"debug","message":"bare"}"#);
}

#[test]
fn test_json_prefers_redacted_params() {
    let mut params = IndexMap::new();
    params.insert("token".to_string(), json!("s3cr3t"));

    let mut redacted = IndexMap::new();
    redacted.insert("token".to_string(), json!("[redacted]"));

    let mut entry = LogEntry::builder(EntryKind::Info, "auth")
        .timestamp(5)
        .params(params)
        .build();
    entry.redacted_params = Some(redacted);
    entry.redacted_keys = Some(vec!["token".to_string()]);

    let line = format_json(&entry).unwrap();
    assert!(line.contains(r#""token":"[redacted]""#));
    assert!(!line.contains("s3cr3t"));
}

#[test]
fn test_json_raw_serializes_like_any_kind() {
    let entry = LogEntry::builder(EntryKind::Raw, "raw line")
        .timestamp(5)
        .build();
    let line = format_json(&entry).unwrap();
    assert_eq!(line, r#"{"timestamp":5,"type":"raw","message":"raw line"}"#);
}
