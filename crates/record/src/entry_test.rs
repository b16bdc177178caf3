//! Tests for log entry construction

use std::io;

use indexmap::IndexMap;
use serde_json::json;

use crate::entry::LogEntry;
use crate::kind::EntryKind;

#[test]
fn test_builder_minimal() {
    let entry = LogEntry::new(EntryKind::Info, "started");

    assert_eq!(entry.kind, EntryKind::Info);
    assert_eq!(entry.message, "started");
    assert_eq!(entry.template, "started");
    assert!(entry.service_name.is_none());
    assert!(entry.entity_name.is_none());
    assert!(entry.params.is_none());
    assert!(entry.redacted_params.is_none());
    assert!(entry.redacted_keys.is_none());
    assert!(entry.error.is_none());
    assert!(entry.exit_code.is_none());
    assert!(entry.tags.is_none());
}

#[test]
fn test_builder_stamps_timestamp() {
    let before = chrono::Utc::now().timestamp_millis();
    let entry = LogEntry::new(EntryKind::Info, "now");
    let after = chrono::Utc::now().timestamp_millis();

    assert!(entry.timestamp >= before);
    assert!(entry.timestamp <= after);
}

#[test]
fn test_builder_explicit_timestamp() {
    let entry = LogEntry::builder(EntryKind::Info, "then")
        .timestamp(1_700_000_000_000)
        .build();
    assert_eq!(entry.timestamp, 1_700_000_000_000);
}

#[test]
fn test_builder_all_fields() {
    let mut params = IndexMap::new();
    params.insert("user".to_string(), json!("alice"));

    let entry = LogEntry::builder(EntryKind::Error, "charge failed")
        .service_name("billing")
        .entity_name("invoice-worker")
        .template("charge failed for {user}")
        .params(params)
        .error(io::Error::other("card declined"))
        .exit_code(3)
        .tag("payments")
        .build();

    assert_eq!(entry.service_name.as_deref(), Some("billing"));
    assert_eq!(entry.entity_name.as_deref(), Some("invoice-worker"));
    assert_eq!(entry.template, "charge failed for {user}");
    assert_eq!(entry.params.as_ref().unwrap().len(), 1);
    assert!(entry.error.is_some());
    assert_eq!(entry.exit_code, Some(3));
    assert_eq!(entry.tags.as_ref().unwrap(), &vec!["payments".to_string()]);
}

#[test]
fn test_builder_drops_empty_tags() {
    let entry = LogEntry::builder(EntryKind::Info, "no tags")
        .tags(Vec::new())
        .build();
    assert!(entry.tags.is_none());
}

#[test]
fn test_raw_constructor() {
    let entry = LogEntry::raw("preformatted line");
    assert_eq!(entry.kind, EntryKind::Raw);
    assert_eq!(entry.message, "preformatted line");
}

#[test]
fn test_visible_params_prefers_redacted() {
    let mut params = IndexMap::new();
    params.insert("secret".to_string(), json!("hunter2"));

    let mut redacted = IndexMap::new();
    redacted.insert("secret".to_string(), json!("[redacted]"));

    let mut entry = LogEntry::builder(EntryKind::Info, "login")
        .params(params)
        .build();
    assert_eq!(entry.visible_params().unwrap()["secret"], json!("hunter2"));

    entry.redacted_params = Some(redacted);
    entry.redacted_keys = Some(vec!["secret".to_string()]);
    assert_eq!(
        entry.visible_params().unwrap()["secret"],
        json!("[redacted]")
    );
}
