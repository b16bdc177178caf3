//! Tests for the memory sink

use std::sync::Arc;

use scribe_record::{EntryKind, LogEntry};

use crate::common::Sink;
use crate::memory::MemorySink;

fn entry(kind: EntryKind, message: &str) -> Arc<LogEntry> {
    Arc::new(LogEntry::new(kind, message))
}

#[tokio::test]
async fn test_buffers_in_arrival_order() {
    let sink = MemorySink::new();
    sink.write(&entry(EntryKind::Info, "first")).await.unwrap();
    sink.write(&entry(EntryKind::Error, "second")).await.unwrap();

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message, "first");
    assert_eq!(entries[1].message, "second");
}

#[tokio::test]
async fn test_min_level_filters() {
    let sink = MemorySink::new().with_min_level(EntryKind::Warning);

    sink.write(&entry(EntryKind::Trace, "dropped")).await.unwrap();
    sink.write(&entry(EntryKind::Fatal, "kept")).await.unwrap();
    sink.write(&Arc::new(LogEntry::raw("raw kept"))).await.unwrap();

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message, "kept");
    assert_eq!(entries[1].message, "raw kept");
}

#[tokio::test]
async fn test_transform_populates_lines() {
    let sink =
        MemorySink::new().with_transform(Arc::new(|entry| format!("line: {}", entry.message)));

    sink.write(&entry(EntryKind::Info, "hello")).await.unwrap();

    assert_eq!(sink.lines(), vec!["line: hello".to_string()]);
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn test_take_drains_buffer() {
    let sink =
        MemorySink::new().with_transform(Arc::new(|entry| entry.message.clone()));
    sink.write(&entry(EntryKind::Info, "one")).await.unwrap();
    sink.write(&entry(EntryKind::Info, "two")).await.unwrap();

    let taken = sink.take();
    assert_eq!(taken.len(), 2);
    assert!(sink.is_empty());
    assert!(sink.lines().is_empty());
}

#[tokio::test]
async fn test_write_after_close_discards() {
    let sink = MemorySink::new();
    sink.close().await.unwrap();
    sink.close().await.unwrap();
    sink.write(&entry(EntryKind::Info, "late")).await.unwrap();
    assert!(sink.is_empty());
}
