//! File Sink - Rotating on-disk log files with retry
//!
//! Appends formatted lines to a dated log file, rotating by calendar date and
//! by size. Writes are queued and drained by a single worker task that owns
//! the file handle exclusively; a failed write is requeued at the tail with a
//! bumped attempt count until the retry ceiling is reached.
//!
//! # Architecture
//!
//! ```text
//! [write()] → [unbounded queue] → [worker task] → [{basename}-{date}.log]
//!                   ↑ (requeue on failure)  ↓ (size rotation)
//!                   └───────────────  [{basename}-{date}-{epoch}.log]
//! ```
//!
//! # File naming
//!
//! - Active file: `{basename}-{YYYY-MM-DD}.log`
//! - Size-rotated file: `{basename}-{YYYY-MM-DD}-{unix_epoch_secs}.log`
//!
//! A date change finalizes the current file and opens a fresh one for the new
//! date. A size overflow renames the current file to its epoch-suffixed name
//! and reopens the canonical name; the triggering write lands whole in the
//! new file.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use scribe_record::{EntryKind, LogEntry, format_json, format_plain};

use crate::common::{FlushReport, QueuedWrite, Sink, SinkHealth};
use crate::error::SinkError;
use crate::util::RateLimitedLogger;

/// Callback invoked on every failed delivery attempt
pub type FileErrorCallback = Arc<dyn Fn(&SinkError, &LogEntry, u32, bool) + Send + Sync>;

/// Pluggable delay between retry attempts, keyed by attempt number
pub type Backoff = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Default retries beyond the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default bound on close() waiting for the queue to drain
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval while flush() and close() wait for the queue to drain
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration for the file sink
#[derive(Clone)]
pub struct FileSinkConfig {
    /// Directory receiving log files, created on first write
    pub log_dir: PathBuf,

    /// File name stem (e.g. "app" -> "app-2026-08-06.log")
    pub basename: String,

    /// Size rotation threshold in megabytes
    pub max_size_mb: f64,

    /// Render entries as single-line JSON instead of plain text
    pub json_format: bool,

    /// Retries beyond the first attempt before an entry is dropped
    pub max_retries: u32,

    /// Bound on close() waiting for the queue to drain
    pub close_timeout: Duration,

    /// Discard entries below this kind; `Raw` always passes
    pub min_level: Option<EntryKind>,

    /// Callback invoked on every failed delivery attempt
    pub on_error: Option<FileErrorCallback>,

    /// Delay between retry attempts (default: none)
    pub backoff: Option<Backoff>,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            basename: "app".into(),
            max_size_mb: 10.0,
            json_format: false,
            max_retries: DEFAULT_MAX_RETRIES,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            min_level: None,
            on_error: None,
            backoff: None,
        }
    }
}

impl FileSinkConfig {
    /// Set the log directory
    #[must_use]
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Set the file name stem
    #[must_use]
    pub fn with_basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = basename.into();
        self
    }

    /// Set the size rotation threshold in megabytes
    #[must_use]
    pub fn with_max_size_mb(mut self, max_size_mb: f64) -> Self {
        self.max_size_mb = max_size_mb;
        self
    }

    /// Enable or disable JSON output
    #[must_use]
    pub fn with_json_format(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }

    /// Set the retry ceiling
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the close timeout
    #[must_use]
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    /// Set the minimum entry kind
    #[must_use]
    pub fn with_min_level(mut self, min_level: EntryKind) -> Self {
        self.min_level = Some(min_level);
        self
    }

    /// Set the error callback
    #[must_use]
    pub fn with_on_error(mut self, on_error: FileErrorCallback) -> Self {
        self.on_error = Some(on_error);
        self
    }

    /// Set the retry backoff
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    fn validate(&self) -> Result<(), SinkError> {
        if self.log_dir.as_os_str().is_empty() {
            return Err(SinkError::config("log_dir must not be empty"));
        }
        if self.basename.is_empty() {
            return Err(SinkError::config("basename must not be empty"));
        }
        if self.max_size_mb <= 0.0 {
            return Err(SinkError::config("max_size_mb must be positive"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileSinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSinkConfig")
            .field("log_dir", &self.log_dir)
            .field("basename", &self.basename)
            .field("max_size_mb", &self.max_size_mb)
            .field("json_format", &self.json_format)
            .field("max_retries", &self.max_retries)
            .field("close_timeout", &self.close_timeout)
            .field("min_level", &self.min_level)
            .field("on_error", &self.on_error.is_some())
            .field("backoff", &self.backoff.is_some())
            .finish()
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Metrics for the file sink
#[derive(Debug, Default)]
pub struct FileSinkMetrics {
    entries_written: AtomicU64,
    entries_failed: AtomicU64,
    retries: AtomicU64,
    rotations: AtomicU64,
}

impl FileSinkMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries_written: AtomicU64::new(0),
            entries_failed: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> FileMetricsSnapshot {
        FileMetricsSnapshot {
            entries_written: self.entries_written.load(Ordering::Relaxed),
            entries_failed: self.entries_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of file sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileMetricsSnapshot {
    pub entries_written: u64,
    pub entries_failed: u64,
    pub retries: u64,
    pub rotations: u64,
}

// =============================================================================
// Shared state
// =============================================================================

/// State shared between the sink handle and its worker task
struct SharedState {
    /// Entries accepted but not yet finally delivered or dropped
    queue_size: AtomicUsize,

    /// Set once the log directory exists
    initialized: AtomicBool,

    /// Set once close() has run; later writes are discarded
    closed: AtomicBool,

    /// Failures since the last successful delivery
    consecutive_failures: AtomicU64,

    /// Message of the most recent delivery error
    last_error: Mutex<Option<String>>,

    /// Delivery counters
    metrics: FileSinkMetrics,
}

impl SharedState {
    fn new() -> Self {
        Self {
            queue_size: AtomicUsize::new(0),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            consecutive_failures: AtomicU64::new(0),
            last_error: Mutex::new(None),
            metrics: FileSinkMetrics::new(),
        }
    }
}

/// Messages accepted by the worker task
enum WorkerMessage {
    /// Deliver one queued entry
    Write(QueuedWrite),

    /// Finalize the open file, acknowledge, and stop
    Finalize(oneshot::Sender<()>),
}

// =============================================================================
// DurableFileSink
// =============================================================================

/// Rotating file sink with retry-on-failure
pub struct DurableFileSink {
    /// Sink name for logging
    name: String,

    /// Queue into the worker task
    sender: mpsc::UnboundedSender<WorkerMessage>,

    /// State shared with the worker
    shared: Arc<SharedState>,

    /// Discard entries below this kind; `Raw` always passes
    min_level: Option<EntryKind>,

    /// Bound on close() waiting for the queue to drain
    close_timeout: Duration,
}

impl DurableFileSink {
    /// Create the sink and spawn its worker task
    pub fn new(config: FileSinkConfig) -> Result<Self, SinkError> {
        Self::with_name("file", config)
    }

    /// Create the sink with a custom name
    pub fn with_name(name: impl Into<String>, config: FileSinkConfig) -> Result<Self, SinkError> {
        config.validate()?;

        let name = name.into();
        let shared = Arc::new(SharedState::new());
        let (sender, receiver) = mpsc::unbounded_channel();

        let worker = Worker {
            name: name.clone(),
            receiver,
            requeue: sender.clone(),
            config: config.clone(),
            shared: Arc::clone(&shared),
            max_bytes: (config.max_size_mb * 1024.0 * 1024.0) as u64,
            active: None,
            errors: RateLimitedLogger::default_interval(),
        };
        tokio::spawn(worker.run());

        Ok(Self {
            name,
            sender,
            shared,
            min_level: config.min_level,
            close_timeout: config.close_timeout,
        })
    }

    /// Point-in-time health report
    pub fn health(&self) -> SinkHealth {
        let consecutive_failures = self.shared.consecutive_failures.load(Ordering::Relaxed);
        let is_initialized = self.shared.initialized.load(Ordering::Relaxed);
        SinkHealth {
            is_healthy: consecutive_failures == 0 && is_initialized,
            queue_size: self.shared.queue_size.load(Ordering::Relaxed),
            last_error: self.shared.last_error.lock().clone(),
            consecutive_failures,
            is_initialized,
        }
    }

    /// Point-in-time metrics snapshot
    pub fn metrics(&self) -> FileMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Wait for the queue to drain, bounded by `timeout`
    ///
    /// Counts in the report are deltas since this call began. Safe to call
    /// concurrently with writes; timing out never aborts in-flight work.
    pub async fn flush(&self, timeout: Duration) -> FlushReport {
        let start = self.shared.metrics.snapshot();
        let deadline = tokio::time::Instant::now() + timeout;

        let timed_out = loop {
            if self.shared.queue_size.load(Ordering::Relaxed) == 0 {
                break false;
            }
            if tokio::time::Instant::now() >= deadline {
                break true;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        };

        let end = self.shared.metrics.snapshot();
        FlushReport {
            written: end.entries_written - start.entries_written,
            failed: end.entries_failed - start.entries_failed,
            timed_out,
        }
    }
}

#[async_trait]
impl Sink for DurableFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, entry: &Arc<LogEntry>) -> Result<(), SinkError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        if let Some(min) = self.min_level {
            if !entry.kind.meets(min) {
                return Ok(());
            }
        }

        self.shared.queue_size.fetch_add(1, Ordering::Relaxed);
        let queued = QueuedWrite::new(Arc::clone(entry));
        if self
            .sender
            .send(WorkerMessage::Write(queued))
            .is_err()
        {
            // worker already finalized
            self.shared.queue_size.fetch_sub(1, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let deadline = tokio::time::Instant::now() + self.close_timeout;
        while self.shared.queue_size.load(Ordering::Relaxed) > 0
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }

        let (ack, done) = oneshot::channel();
        if self.sender.send(WorkerMessage::Finalize(ack)).is_ok() {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let wait = remaining.max(DRAIN_POLL_INTERVAL);
            if tokio::time::timeout(wait, done).await.is_err() {
                tracing::warn!(sink = %self.name, "close timed out waiting for finalize");
            }
        }

        tracing::debug!(sink = %self.name, "file sink closed");
        Ok(())
    }
}

// =============================================================================
// Worker task
// =============================================================================

/// Currently open log file
struct ActiveFile {
    file: File,
    path: PathBuf,
    date: String,
    size: u64,
}

/// Worker task owning the file handle
struct Worker {
    name: String,
    receiver: mpsc::UnboundedReceiver<WorkerMessage>,

    /// Clone of the intake sender, used to requeue failed writes at the tail
    requeue: mpsc::UnboundedSender<WorkerMessage>,

    config: FileSinkConfig,
    shared: Arc<SharedState>,
    max_bytes: u64,
    active: Option<ActiveFile>,
    errors: RateLimitedLogger,
}

impl Worker {
    async fn run(mut self) {
        tracing::debug!(sink = %self.name, "file sink worker starting");

        while let Some(message) = self.receiver.recv().await {
            match message {
                WorkerMessage::Write(queued) => self.handle_write(queued).await,
                WorkerMessage::Finalize(ack) => {
                    self.finalize();
                    let _ = ack.send(());
                    break;
                }
            }
        }

        let snapshot = self.shared.metrics.snapshot();
        tracing::debug!(
            sink = %self.name,
            written = snapshot.entries_written,
            failed = snapshot.entries_failed,
            rotations = snapshot.rotations,
            "file sink worker finished"
        );
    }

    async fn handle_write(&mut self, queued: QueuedWrite) {
        match self.write_entry(&queued.entry) {
            Ok(()) => {
                self.shared
                    .metrics
                    .entries_written
                    .fetch_add(1, Ordering::Relaxed);
                self.shared
                    .consecutive_failures
                    .store(0, Ordering::Relaxed);
                self.shared.queue_size.fetch_sub(1, Ordering::Relaxed);
            }
            Err(err) => self.handle_failure(queued, err).await,
        }
    }

    async fn handle_failure(&mut self, queued: QueuedWrite, err: SinkError) {
        // a failed stream is destroyed; the next attempt recreates it
        self.active = None;

        self.shared
            .consecutive_failures
            .fetch_add(1, Ordering::Relaxed);
        *self.shared.last_error.lock() = Some(err.to_string());

        let will_retry = queued.attempt <= self.config.max_retries;
        if let Some(on_error) = &self.config.on_error {
            on_error(&err, &queued.entry, queued.attempt, will_retry);
        } else {
            self.errors.error("file sink write failed", &err);
        }

        if will_retry {
            self.shared.metrics.retries.fetch_add(1, Ordering::Relaxed);
            if let Some(backoff) = &self.config.backoff {
                let delay = backoff(queued.attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            // requeue at the tail; queue_size stays claimed by this entry
            let _ = self
                .requeue
                .send(WorkerMessage::Write(queued.next_attempt()));
        } else {
            self.shared
                .metrics
                .entries_failed
                .fetch_add(1, Ordering::Relaxed);
            self.shared.queue_size.fetch_sub(1, Ordering::Relaxed);
        }
    }

    fn write_entry(&mut self, entry: &LogEntry) -> Result<(), SinkError> {
        self.ensure_initialized()?;

        let mut line = if self.config.json_format {
            format_json(entry).map_err(|e| SinkError::write(e.to_string()))?
        } else {
            format_plain(entry)
        };
        line.push('\n');

        self.ensure_open_for(line.len() as u64)?;

        // invariant: ensure_open_for leaves an open file behind
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| SinkError::write("no open log file"))?;
        active.file.write_all(line.as_bytes())?;
        active.size += line.len() as u64;
        Ok(())
    }

    fn ensure_initialized(&mut self) -> Result<(), SinkError> {
        if self.shared.initialized.load(Ordering::Relaxed) {
            return Ok(());
        }
        fs::create_dir_all(&self.config.log_dir)?;
        self.shared.initialized.store(true, Ordering::Relaxed);
        tracing::debug!(
            sink = %self.name,
            dir = %self.config.log_dir.display(),
            "log directory ready"
        );
        Ok(())
    }

    /// Apply date and size rotation, leaving an open file for the new line
    fn ensure_open_for(&mut self, line_bytes: u64) -> Result<(), SinkError> {
        let today = Utc::now().format("%Y-%m-%d").to_string();

        if let Some(active) = &self.active {
            if active.date != today {
                let old = active.date.clone();
                self.active = None;
                self.shared.metrics.rotations.fetch_add(1, Ordering::Relaxed);
                tracing::info!(sink = %self.name, old_date = %old, new_date = %today, "date rotation");
            }
        }

        let overflows = self
            .active
            .as_ref()
            .is_some_and(|a| a.size + line_bytes > self.max_bytes);
        if overflows {
            if let Some(active) = self.active.take() {
                let rotated = self.config.log_dir.join(format!(
                    "{}-{}-{}.log",
                    self.config.basename,
                    active.date,
                    Utc::now().timestamp()
                ));
                drop(active.file);
                fs::rename(&active.path, &rotated)?;
                self.shared.metrics.rotations.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    sink = %self.name,
                    from = %active.path.display(),
                    to = %rotated.display(),
                    "size rotation"
                );
            }
        }

        if self.active.is_none() {
            let path = self
                .config
                .log_dir
                .join(format!("{}-{}.log", self.config.basename, today));
            let file = File::options().create(true).append(true).open(&path)?;
            let size = file.metadata().map(|m| m.len()).unwrap_or(0);
            self.active = Some(ActiveFile {
                file,
                path,
                date: today,
                size,
            });
        }

        Ok(())
    }

    fn finalize(&mut self) {
        if let Some(mut active) = self.active.take() {
            if let Err(e) = active.file.flush() {
                tracing::error!(sink = %self.name, error = %e, "final flush failed");
            }
        }
    }
}
