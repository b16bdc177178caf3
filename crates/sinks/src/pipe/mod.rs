//! Pipe Sink - Named pipe (FIFO) delivery with reconnect
//!
//! Writes formatted lines to an OS FIFO, tolerating reader disconnects. The
//! sink opens its writer lazily: while no reader has the FIFO open, the open
//! is retried on a short interval and submitted entries queue in arrival
//! order, flushing as soon as a reader appears.
//!
//! # Architecture
//!
//! ```text
//! [write()] → [queue] → [worker task] → [try_write] → FIFO
//!                            ↓ (full OS buffer)
//!                       [backlog, drained on writability]
//! ```
//!
//! # Connection state machine
//!
//! ```text
//! Uninitialized → Initializing → Ready ⇄ Reconnecting
//!        ↑______________|          |
//!   (fatal error,                Closed
//!    awaits reconnect())
//! ```
//!
//! Losing the reader (`EPIPE`) drops the sink back to `Uninitialized`;
//! delivery resumes only after a manual [`ReconnectingPipeSink::reconnect`].
//! A missing reader at open time (`ENXIO`) is retried automatically.
//!
//! On non-Unix platforms the sink is permanently inert: the first write
//! reports `UnsupportedPlatform` once, every write is a silent no-op.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use scribe_record::LogEntry;

use crate::common::Sink;
use crate::error::{SinkError, SinkErrorKind};

#[cfg(not(unix))]
use std::sync::atomic::AtomicBool;
#[cfg(unix)]
use tokio::sync::{mpsc, oneshot};

/// Custom line formatter; the returned line gets a newline appended
pub type PipeFormatter = Arc<dyn Fn(&LogEntry) -> Result<String, SinkError> + Send + Sync>;

/// Callback invoked when the pipe reports an error, tagged by category
pub type PipeErrorCallback = Arc<dyn Fn(SinkErrorKind, &SinkError) + Send + Sync>;

/// Default bound on close() waiting for the worker to finish
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between open attempts while no reader has the FIFO open
#[cfg(unix)]
const OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Connection state of the pipe sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No writer open; waiting for the first write or a manual reconnect
    Uninitialized,

    /// First open in progress, retrying while no reader is attached
    Initializing,

    /// Writer open, lines deliver
    Ready,

    /// Manual reconnect in progress
    Reconnecting,

    /// Sink shut down; writes are discarded
    Closed,

    /// Platform has no named pipe support; sink is permanently inert
    Unsupported,
}

impl ConnectionState {
    /// Stable string name for the state
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
            Self::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a [`ReconnectingPipeSink::reconnect`] request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectStatus {
    /// Reconnect accepted; the worker is reopening the pipe
    Started,

    /// A reconnect is already in flight; no side effects
    AlreadyReconnecting,

    /// Sink is closed
    Closed,

    /// Platform has no named pipe support
    Unsupported,
}

/// Configuration for the pipe sink
#[derive(Clone)]
pub struct PipeSinkConfig {
    /// Path of the FIFO to deliver to
    pub pipe_path: PathBuf,

    /// Render entries as single-line JSON instead of plain text
    pub json_format: bool,

    /// Bound on close() waiting for the worker to finish
    pub close_timeout: Duration,

    /// Custom line formatter; falls back to the default rendering on error
    pub formatter: Option<PipeFormatter>,

    /// Callback invoked when the pipe reports an error
    pub on_error: Option<PipeErrorCallback>,
}

impl PipeSinkConfig {
    /// Create a config for the given FIFO path
    pub fn new(pipe_path: impl Into<PathBuf>) -> Self {
        Self {
            pipe_path: pipe_path.into(),
            json_format: false,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            formatter: None,
            on_error: None,
        }
    }

    /// Enable or disable JSON output
    #[must_use]
    pub fn with_json_format(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }

    /// Set the close timeout
    #[must_use]
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    /// Set a custom line formatter
    #[must_use]
    pub fn with_formatter(mut self, formatter: PipeFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Set the error callback
    #[must_use]
    pub fn with_on_error(mut self, on_error: PipeErrorCallback) -> Self {
        self.on_error = Some(on_error);
        self
    }

    fn validate(&self) -> Result<(), SinkError> {
        if self.pipe_path.as_os_str().is_empty() {
            return Err(SinkError::config("pipe_path must not be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for PipeSinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeSinkConfig")
            .field("pipe_path", &self.pipe_path)
            .field("json_format", &self.json_format)
            .field("close_timeout", &self.close_timeout)
            .field("formatter", &self.formatter.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Metrics for the pipe sink
#[derive(Debug, Default)]
pub struct PipeSinkMetrics {
    lines_written: AtomicU64,
    write_errors: AtomicU64,
    reconnects: AtomicU64,
    queued_while_down: AtomicU64,
}

impl PipeSinkMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            lines_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            queued_while_down: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> PipeMetricsSnapshot {
        PipeMetricsSnapshot {
            lines_written: self.lines_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            queued_while_down: self.queued_while_down.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of pipe sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipeMetricsSnapshot {
    pub lines_written: u64,
    pub write_errors: u64,
    pub reconnects: u64,
    pub queued_while_down: u64,
}

// =============================================================================
// Shared state
// =============================================================================

/// State shared between the sink handle and its worker task
struct PipeShared {
    state: Mutex<ConnectionState>,
    metrics: PipeSinkMetrics,
}

impl PipeShared {
    fn new(initial: ConnectionState) -> Self {
        Self {
            state: Mutex::new(initial),
            metrics: PipeSinkMetrics::new(),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }
}

/// Messages accepted by the worker task
#[cfg(unix)]
enum PipeMessage {
    /// Deliver one entry
    Write(Arc<LogEntry>),

    /// Drop the current writer and reopen the pipe
    Reconnect(oneshot::Sender<ReconnectStatus>),

    /// Flush what fits, end the stream, acknowledge, and stop
    Close(oneshot::Sender<()>),
}

// =============================================================================
// ReconnectingPipeSink
// =============================================================================

/// Named pipe sink with queueing, backpressure and manual reconnect
pub struct ReconnectingPipeSink {
    /// Sink name for logging
    name: String,

    /// State shared with the worker
    shared: Arc<PipeShared>,

    /// Bound on close() waiting for the worker to finish
    close_timeout: Duration,

    /// Queue into the worker task
    #[cfg(unix)]
    sender: mpsc::UnboundedSender<PipeMessage>,

    /// Error callback, consulted by the one-shot unsupported report
    #[cfg(not(unix))]
    on_error: Option<PipeErrorCallback>,

    /// Set once the unsupported-platform report has fired
    #[cfg(not(unix))]
    reported: AtomicBool,
}

impl ReconnectingPipeSink {
    /// Create the sink and, on Unix, spawn its worker task
    pub fn new(config: PipeSinkConfig) -> Result<Self, SinkError> {
        Self::with_name("pipe", config)
    }

    /// Create the sink with a custom name
    pub fn with_name(name: impl Into<String>, config: PipeSinkConfig) -> Result<Self, SinkError> {
        config.validate()?;
        let name = name.into();
        let close_timeout = config.close_timeout;

        #[cfg(unix)]
        {
            let shared = Arc::new(PipeShared::new(ConnectionState::Uninitialized));
            let (sender, receiver) = mpsc::unbounded_channel();
            let worker = unix::Worker::new(name.clone(), receiver, config, Arc::clone(&shared));
            tokio::spawn(worker.run());
            Ok(Self {
                name,
                shared,
                close_timeout,
                sender,
            })
        }

        #[cfg(not(unix))]
        {
            let shared = Arc::new(PipeShared::new(ConnectionState::Unsupported));
            Ok(Self {
                name,
                shared,
                close_timeout,
                on_error: config.on_error,
                reported: AtomicBool::new(false),
            })
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Point-in-time metrics snapshot
    pub fn metrics(&self) -> PipeMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Drop the current writer and reopen the pipe
    ///
    /// Mutually exclusive: a second call while one is in flight returns
    /// [`ReconnectStatus::AlreadyReconnecting`] with no side effects. Entries
    /// queued while the sink was down flush, in order, once the reopen
    /// succeeds.
    pub async fn reconnect(&self) -> ReconnectStatus {
        #[cfg(unix)]
        {
            let (ack, done) = oneshot::channel();
            if self.sender.send(PipeMessage::Reconnect(ack)).is_err() {
                return ReconnectStatus::Closed;
            }
            done.await.unwrap_or(ReconnectStatus::Closed)
        }

        #[cfg(not(unix))]
        {
            ReconnectStatus::Unsupported
        }
    }
}

#[async_trait]
impl Sink for ReconnectingPipeSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, entry: &Arc<LogEntry>) -> Result<(), SinkError> {
        #[cfg(unix)]
        {
            if self.shared.state() == ConnectionState::Closed {
                return Ok(());
            }
            // send only fails after close; the entry is silently discarded
            let _ = self.sender.send(PipeMessage::Write(Arc::clone(entry)));
            Ok(())
        }

        #[cfg(not(unix))]
        {
            let _ = entry;
            if !self.reported.swap(true, Ordering::AcqRel) {
                let err = SinkError::UnsupportedPlatform;
                match &self.on_error {
                    Some(on_error) => on_error(SinkErrorKind::UnsupportedPlatform, &err),
                    None => {
                        tracing::error!(sink = %self.name, error = %err, "pipe sink unavailable")
                    }
                }
            }
            Ok(())
        }
    }

    async fn close(&self) -> Result<(), SinkError> {
        #[cfg(unix)]
        {
            if self.shared.state() == ConnectionState::Closed {
                return Ok(());
            }
            let (ack, done) = oneshot::channel();
            if self.sender.send(PipeMessage::Close(ack)).is_ok()
                && tokio::time::timeout(self.close_timeout, done).await.is_err()
            {
                tracing::warn!(sink = %self.name, "close timed out waiting for pipe worker");
            }
            self.shared.set_state(ConnectionState::Closed);
            Ok(())
        }

        #[cfg(not(unix))]
        {
            self.shared.set_state(ConnectionState::Closed);
            Ok(())
        }
    }
}

// =============================================================================
// Worker task (Unix only)
// =============================================================================

#[cfg(unix)]
mod unix {
    use std::collections::VecDeque;
    use std::io;
    use std::os::unix::fs::FileTypeExt;

    use tokio::net::unix::pipe;
    use tokio::time::MissedTickBehavior;

    use scribe_record::{format_json, format_plain};

    use crate::util::RateLimitedLogger;

    use super::*;

    /// Why an open attempt did not produce a writer
    enum OpenFailure {
        /// No reader has the FIFO open yet; retry on the interval
        NoReader,

        /// Non-retrying failure; wait for a manual reconnect
        Fatal(SinkError),
    }

    /// Result of pushing one formatted line into the pipe
    enum WriteOutcome {
        /// Line fully delivered
        Done,

        /// OS buffer full; remainder must wait for writability
        Blocked(Vec<u8>),

        /// Stream failed; remainder preserved for redelivery
        Failed(Vec<u8>, io::Error),
    }

    /// Write as much of `bytes` as the pipe accepts without blocking
    fn push_line(writer: &pipe::Sender, bytes: Vec<u8>) -> WriteOutcome {
        let mut offset = 0;
        while offset < bytes.len() {
            match writer.try_write(&bytes[offset..]) {
                Ok(0) => {
                    return WriteOutcome::Failed(
                        bytes[offset..].to_vec(),
                        io::ErrorKind::WriteZero.into(),
                    );
                }
                Ok(n) => offset += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return WriteOutcome::Blocked(bytes[offset..].to_vec());
                }
                Err(e) => return WriteOutcome::Failed(bytes[offset..].to_vec(), e),
            }
        }
        WriteOutcome::Done
    }

    /// Worker task owning the pipe writer
    pub(super) struct Worker {
        name: String,
        receiver: mpsc::UnboundedReceiver<PipeMessage>,
        config: PipeSinkConfig,
        shared: Arc<PipeShared>,

        /// Open pipe writer, present only in `Ready`
        writer: Option<pipe::Sender>,

        /// Entries accepted while no writer was open, in arrival order
        pending: VecDeque<Arc<LogEntry>>,

        /// Formatted lines awaiting pipe writability, oldest first
        backlog: VecDeque<Vec<u8>>,

        /// Set after a fatal error; automatic init stays off until reconnect()
        awaiting_manual: bool,

        /// Fallback error reporting when no callback is configured
        errors: RateLimitedLogger,
    }

    impl Worker {
        pub(super) fn new(
            name: String,
            receiver: mpsc::UnboundedReceiver<PipeMessage>,
            config: PipeSinkConfig,
            shared: Arc<PipeShared>,
        ) -> Self {
            Self {
                name,
                receiver,
                config,
                shared,
                writer: None,
                pending: VecDeque::new(),
                backlog: VecDeque::new(),
                awaiting_manual: false,
                errors: RateLimitedLogger::default_interval(),
            }
        }

        pub(super) async fn run(mut self) {
            tracing::debug!(sink = %self.name, path = %self.config.pipe_path.display(), "pipe sink worker starting");

            let mut retry_tick = tokio::time::interval(OPEN_RETRY_INTERVAL);
            retry_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let connecting = matches!(
                    self.shared.state(),
                    ConnectionState::Initializing | ConnectionState::Reconnecting
                );
                let draining = self.writer.is_some() && !self.backlog.is_empty();

                tokio::select! {
                    message = self.receiver.recv() => {
                        match message {
                            Some(PipeMessage::Write(entry)) => self.handle_write(entry),
                            Some(PipeMessage::Reconnect(ack)) => {
                                let _ = ack.send(self.handle_reconnect());
                            }
                            Some(PipeMessage::Close(ack)) => {
                                self.handle_close();
                                let _ = ack.send(());
                                break;
                            }
                            None => break,
                        }
                    }
                    _ = retry_tick.tick(), if connecting => {
                        self.try_initialize();
                    }
                    result = Self::wait_writable(&self.writer), if draining => {
                        match result {
                            Ok(()) => self.drain_backlog(),
                            Err(e) => self.handle_stream_error(e.into()),
                        }
                    }
                }
            }

            let snapshot = self.shared.metrics.snapshot();
            tracing::debug!(
                sink = %self.name,
                written = snapshot.lines_written,
                errors = snapshot.write_errors,
                "pipe sink worker finished"
            );
        }

        /// Writability future, pending forever while no writer is open
        async fn wait_writable(writer: &Option<pipe::Sender>) -> io::Result<()> {
            match writer {
                Some(sender) => sender.writable().await,
                None => std::future::pending().await,
            }
        }

        fn handle_write(&mut self, entry: Arc<LogEntry>) {
            if self.shared.state() == ConnectionState::Closed {
                return;
            }

            if self.writer.is_some() {
                let bytes = self.format_line(&entry);
                if self.backlog.is_empty() {
                    self.deliver(bytes);
                } else {
                    // order invariant: writes issued during backpressure
                    // queue behind the backlog
                    self.backlog.push_back(bytes);
                }
                return;
            }

            self.pending.push_back(entry);
            self.shared
                .metrics
                .queued_while_down
                .fetch_add(1, Ordering::Relaxed);

            if self.shared.state() == ConnectionState::Uninitialized && !self.awaiting_manual {
                self.shared.set_state(ConnectionState::Initializing);
                self.try_initialize();
            }
        }

        /// Push one line now, spilling to the backlog or failing the stream
        fn deliver(&mut self, bytes: Vec<u8>) {
            let Some(writer) = self.writer.as_ref() else {
                self.backlog.push_back(bytes);
                return;
            };
            match push_line(writer, bytes) {
                WriteOutcome::Done => {
                    self.shared
                        .metrics
                        .lines_written
                        .fetch_add(1, Ordering::Relaxed);
                }
                WriteOutcome::Blocked(rest) => self.backlog.push_back(rest),
                WriteOutcome::Failed(rest, err) => {
                    self.backlog.push_front(rest);
                    self.handle_stream_error(err.into());
                }
            }
        }

        /// Flush backlogged lines in order until the pipe stops accepting
        fn drain_backlog(&mut self) {
            while let Some(bytes) = self.backlog.pop_front() {
                let Some(writer) = self.writer.as_ref() else {
                    self.backlog.push_front(bytes);
                    return;
                };
                match push_line(writer, bytes) {
                    WriteOutcome::Done => {
                        self.shared
                            .metrics
                            .lines_written
                            .fetch_add(1, Ordering::Relaxed);
                    }
                    WriteOutcome::Blocked(rest) => {
                        self.backlog.push_front(rest);
                        return;
                    }
                    WriteOutcome::Failed(rest, err) => {
                        self.backlog.push_front(rest);
                        self.handle_stream_error(err.into());
                        return;
                    }
                }
            }
        }

        /// Fatal stream error: destroy the writer and await reconnect()
        fn handle_stream_error(&mut self, err: SinkError) {
            self.writer = None;
            self.awaiting_manual = true;
            self.shared.set_state(ConnectionState::Uninitialized);
            self.report(SinkErrorKind::Write, &err);
            tracing::debug!(sink = %self.name, error = %err, "pipe stream failed, awaiting reconnect");
        }

        fn try_initialize(&mut self) {
            match self.open_writer() {
                Ok(writer) => {
                    self.writer = Some(writer);
                    self.awaiting_manual = false;
                    self.shared.set_state(ConnectionState::Ready);
                    tracing::debug!(
                        sink = %self.name,
                        path = %self.config.pipe_path.display(),
                        "pipe connected"
                    );
                    self.flush_pending();
                }
                Err(OpenFailure::NoReader) => {
                    // no reader yet; the retry tick tries again
                }
                Err(OpenFailure::Fatal(err)) => {
                    self.awaiting_manual = true;
                    self.shared.set_state(ConnectionState::Uninitialized);
                    self.report(err.kind(), &err);
                }
            }
        }

        fn open_writer(&self) -> Result<pipe::Sender, OpenFailure> {
            let path = &self.config.pipe_path;

            let metadata = match std::fs::metadata(path) {
                Ok(m) => m,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(OpenFailure::Fatal(SinkError::NotFound { path: path.clone() }));
                }
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    return Err(OpenFailure::Fatal(SinkError::Permission {
                        path: path.clone(),
                    }));
                }
                Err(e) => return Err(OpenFailure::Fatal(e.into())),
            };
            if !metadata.file_type().is_fifo() {
                return Err(OpenFailure::Fatal(SinkError::NotAPipe { path: path.clone() }));
            }

            match pipe::OpenOptions::new().open_sender(path) {
                Ok(sender) => Ok(sender),
                Err(e) if e.raw_os_error() == Some(libc::ENXIO) => Err(OpenFailure::NoReader),
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    Err(OpenFailure::Fatal(SinkError::Permission {
                        path: path.clone(),
                    }))
                }
                Err(e) => Err(OpenFailure::Fatal(e.into())),
            }
        }

        /// Format everything queued while down and push it behind the backlog
        fn flush_pending(&mut self) {
            while let Some(entry) = self.pending.pop_front() {
                let bytes = self.format_line(&entry);
                self.backlog.push_back(bytes);
            }
            self.drain_backlog();
        }

        fn handle_reconnect(&mut self) -> ReconnectStatus {
            match self.shared.state() {
                ConnectionState::Initializing | ConnectionState::Reconnecting => {
                    ReconnectStatus::AlreadyReconnecting
                }
                ConnectionState::Closed => ReconnectStatus::Closed,
                ConnectionState::Unsupported => ReconnectStatus::Unsupported,
                ConnectionState::Uninitialized | ConnectionState::Ready => {
                    self.writer = None;
                    self.awaiting_manual = false;
                    self.shared
                        .metrics
                        .reconnects
                        .fetch_add(1, Ordering::Relaxed);
                    self.shared.set_state(ConnectionState::Reconnecting);
                    self.try_initialize();
                    ReconnectStatus::Started
                }
            }
        }

        fn handle_close(&mut self) {
            if self.writer.is_some() {
                // best-effort: flush what the pipe accepts without blocking
                self.flush_pending();
            }
            self.writer = None;
            self.shared.set_state(ConnectionState::Closed);
        }

        fn format_line(&self, entry: &LogEntry) -> Vec<u8> {
            let line = match &self.config.formatter {
                Some(formatter) => match formatter(entry) {
                    Ok(line) => line,
                    Err(err) => {
                        self.errors.error("pipe formatter failed", &err);
                        self.default_line(entry)
                    }
                },
                None => self.default_line(entry),
            };
            let mut bytes = line.into_bytes();
            bytes.push(b'\n');
            bytes
        }

        fn default_line(&self, entry: &LogEntry) -> String {
            if self.config.json_format {
                format_json(entry).unwrap_or_else(|_| format_plain(entry))
            } else {
                format_plain(entry)
            }
        }

        fn report(&self, kind: SinkErrorKind, err: &SinkError) {
            self.shared
                .metrics
                .write_errors
                .fetch_add(1, Ordering::Relaxed);
            match &self.config.on_error {
                Some(on_error) => on_error(kind, err),
                None => {
                    self.errors.error("pipe sink error", err);
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
#[path = "pipe_test.rs"]
mod pipe_test;
