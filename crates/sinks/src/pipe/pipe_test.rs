//! Tests for the pipe sink
//!
//! These exercise the real FIFO path: `mkfifo` fixtures, reader attach and
//! detach, and the manual reconnect flow.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::net::unix::pipe;

use scribe_record::{EntryKind, LogEntry};

use crate::common::Sink;
use crate::error::SinkErrorKind;
use crate::pipe::{ConnectionState, PipeSinkConfig, ReconnectStatus, ReconnectingPipeSink};

fn entry(message: &str) -> Arc<LogEntry> {
    Arc::new(LogEntry::new(EntryKind::Info, message))
}

fn make_fifo(path: &Path) {
    mkfifo(path, Mode::S_IRWXU).unwrap();
}

type Reports = Arc<Mutex<Vec<(SinkErrorKind, String)>>>;

fn capturing_config(path: &Path) -> (PipeSinkConfig, Reports) {
    let reports: Reports = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&reports);
    let config = PipeSinkConfig::new(path).with_on_error(Arc::new(move |kind, err| {
        seen.lock().push((kind, err.to_string()));
    }));
    (config, reports)
}

/// Read from the FIFO until `n` newline-terminated lines arrived
async fn read_lines(receiver: &mut pipe::Receiver, n: usize) -> Vec<String> {
    let mut buf = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while buf.iter().filter(|&&b| b == b'\n').count() < n {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {} lines, got {:?}",
            n,
            String::from_utf8_lossy(&buf)
        );
        receiver.readable().await.unwrap();
        let mut chunk = [0u8; 1024];
        match receiver.try_read(&mut chunk) {
            Ok(0) => tokio::time::sleep(Duration::from_millis(5)).await,
            Ok(k) => buf.extend_from_slice(&chunk[..k]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("fifo read failed: {}", e),
        }
    }
    String::from_utf8(buf)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_regular_file_reports_not_a_pipe_exactly_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("not-a-pipe");
    std::fs::write(&path, b"plain file").unwrap();

    let (config, reports) = capturing_config(&path);
    let sink = ReconnectingPipeSink::new(config).unwrap();

    sink.write(&entry("one")).await.unwrap();
    settle().await;
    sink.write(&entry("two")).await.unwrap();
    settle().await;

    let seen = reports.lock().clone();
    assert_eq!(seen.len(), 1, "expected one report, got {:?}", seen);
    assert_eq!(seen[0].0, SinkErrorKind::NotAPipe);
    // no unsolicited retry: the sink waits for a manual reconnect
    assert_eq!(sink.state(), ConnectionState::Uninitialized);
    assert_eq!(sink.metrics().queued_while_down, 2);

    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_path_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.fifo");

    let (config, reports) = capturing_config(&path);
    let sink = ReconnectingPipeSink::new(config).unwrap();

    sink.write(&entry("one")).await.unwrap();
    settle().await;

    let seen = reports.lock().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, SinkErrorKind::NotFound);
    assert_eq!(sink.state(), ConnectionState::Uninitialized);

    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_pre_connect_queue_flushes_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("queued.fifo");
    make_fifo(&path);

    let (config, reports) = capturing_config(&path);
    let sink = ReconnectingPipeSink::new(config).unwrap();

    // no reader yet: entries queue while the open retries on ENXIO
    for msg in ["first", "second", "third"] {
        sink.write(&entry(msg)).await.unwrap();
    }
    settle().await;
    assert_eq!(sink.state(), ConnectionState::Initializing);
    assert_eq!(sink.metrics().queued_while_down, 3);

    let mut receiver = pipe::OpenOptions::new().open_receiver(&path).unwrap();
    let lines = read_lines(&mut receiver, 3).await;
    assert_eq!(
        lines,
        vec!["[info] first", "[info] second", "[info] third"]
    );

    settle().await;
    assert_eq!(sink.state(), ConnectionState::Ready);
    assert_eq!(sink.metrics().lines_written, 3);
    assert!(reports.lock().is_empty());

    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_while_initializing_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lonely.fifo");
    make_fifo(&path);

    let (config, _reports) = capturing_config(&path);
    let sink = ReconnectingPipeSink::new(config).unwrap();

    // trigger initialization with no reader attached
    sink.write(&entry("waiting")).await.unwrap();
    settle().await;
    assert_eq!(sink.state(), ConnectionState::Initializing);

    assert_eq!(sink.reconnect().await, ReconnectStatus::AlreadyReconnecting);

    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_reader_loss_then_manual_reconnect_preserves_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("flaky.fifo");
    make_fifo(&path);

    let (config, reports) = capturing_config(&path);
    let sink = ReconnectingPipeSink::new(config).unwrap();

    let mut receiver = pipe::OpenOptions::new().open_receiver(&path).unwrap();
    sink.write(&entry("one")).await.unwrap();
    assert_eq!(read_lines(&mut receiver, 1).await, vec!["[info] one"]);

    // reader disappears; the next write hits a broken pipe
    drop(receiver);
    settle().await;
    sink.write(&entry("two")).await.unwrap();
    settle().await;

    assert_eq!(sink.state(), ConnectionState::Uninitialized);
    let seen = reports.lock().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, SinkErrorKind::Write);

    // queued behind the undelivered line
    sink.write(&entry("three")).await.unwrap();
    settle().await;
    assert_eq!(sink.state(), ConnectionState::Uninitialized);

    let mut receiver = pipe::OpenOptions::new().open_receiver(&path).unwrap();
    assert_eq!(sink.reconnect().await, ReconnectStatus::Started);

    let lines = read_lines(&mut receiver, 2).await;
    assert_eq!(lines, vec!["[info] two", "[info] three"]);
    settle().await;
    assert_eq!(sink.state(), ConnectionState::Ready);
    assert_eq!(sink.metrics().reconnects, 1);

    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_json_format_over_fifo() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("json.fifo");
    make_fifo(&path);

    let config = PipeSinkConfig::new(&path).with_json_format(true);
    let sink = ReconnectingPipeSink::new(config).unwrap();
    let mut receiver = pipe::OpenOptions::new().open_receiver(&path).unwrap();

    sink.write(&entry("structured")).await.unwrap();
    let lines = read_lines(&mut receiver, 1).await;
    let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(value["type"], "info");
    assert_eq!(value["message"], "structured");

    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_custom_formatter_with_fallback() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("formatted.fifo");
    make_fifo(&path);

    let config = PipeSinkConfig::new(&path).with_formatter(Arc::new(|entry| {
        if entry.message == "bad" {
            Err(crate::SinkError::write("formatter rejected entry"))
        } else {
            Ok(format!("custom|{}", entry.message))
        }
    }));
    let sink = ReconnectingPipeSink::new(config).unwrap();
    let mut receiver = pipe::OpenOptions::new().open_receiver(&path).unwrap();

    sink.write(&entry("good")).await.unwrap();
    sink.write(&entry("bad")).await.unwrap();

    let lines = read_lines(&mut receiver, 2).await;
    // the failing formatter falls back to the default rendering
    assert_eq!(lines, vec!["custom|good", "[info] bad"]);

    sink.close().await.unwrap();
}

#[tokio::test]
async fn test_close_is_idempotent_and_discards_later_writes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("closing.fifo");
    make_fifo(&path);

    let sink = ReconnectingPipeSink::new(PipeSinkConfig::new(&path)).unwrap();
    sink.close().await.unwrap();
    sink.close().await.unwrap();
    assert_eq!(sink.state(), ConnectionState::Closed);

    sink.write(&entry("late")).await.unwrap();
    assert_eq!(sink.metrics().lines_written, 0);
    assert_eq!(sink.reconnect().await, ReconnectStatus::Closed);
}

#[tokio::test]
async fn test_config_validation() {
    assert!(ReconnectingPipeSink::new(PipeSinkConfig::new("")).is_err());
}
