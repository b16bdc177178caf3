//! Tests for entry kinds

use std::str::FromStr;

use crate::kind::EntryKind;

#[test]
fn test_kind_ordering() {
    assert!(EntryKind::Trace < EntryKind::Debug);
    assert!(EntryKind::Debug < EntryKind::Info);
    assert!(EntryKind::Info < EntryKind::Warning);
    assert!(EntryKind::Warning < EntryKind::Error);
    assert!(EntryKind::Error < EntryKind::Fatal);
}

#[test]
fn test_kind_meets_minimum() {
    assert!(EntryKind::Error.meets(EntryKind::Info));
    assert!(EntryKind::Info.meets(EntryKind::Info));
    assert!(!EntryKind::Debug.meets(EntryKind::Info));
    assert!(!EntryKind::Trace.meets(EntryKind::Fatal));
}

#[test]
fn test_raw_always_meets() {
    assert!(EntryKind::Raw.meets(EntryKind::Trace));
    assert!(EntryKind::Raw.meets(EntryKind::Fatal));
}

#[test]
fn test_kind_as_str() {
    assert_eq!(EntryKind::Trace.as_str(), "trace");
    assert_eq!(EntryKind::Debug.as_str(), "debug");
    assert_eq!(EntryKind::Info.as_str(), "info");
    assert_eq!(EntryKind::Warning.as_str(), "warning");
    assert_eq!(EntryKind::Error.as_str(), "error");
    assert_eq!(EntryKind::Fatal.as_str(), "fatal");
    assert_eq!(EntryKind::Raw.as_str(), "raw");
}

#[test]
fn test_kind_display_matches_as_str() {
    assert_eq!(EntryKind::Warning.to_string(), "warning");
    assert_eq!(format!("{}", EntryKind::Raw), "raw");
}

#[test]
fn test_kind_from_str_round_trip() {
    for kind in [
        EntryKind::Trace,
        EntryKind::Debug,
        EntryKind::Info,
        EntryKind::Warning,
        EntryKind::Error,
        EntryKind::Fatal,
        EntryKind::Raw,
    ] {
        assert_eq!(EntryKind::from_str(kind.as_str()).unwrap(), kind);
    }
}

#[test]
fn test_kind_from_str_unknown() {
    let err = EntryKind::from_str("verbose").unwrap_err();
    assert!(err.to_string().contains("verbose"));
}
