//! Console Sink - Human-readable stdout output
//!
//! Writes one line per entry to stdout, either plain text with a colored
//! kind tag or single-line JSON. Delivery is inline; there is no internal
//! queue.
//!
//! # Example Output
//!
//! ```text
//! [info] [billing] worker started
//! [error] [billing] [invoice-worker] charge failed
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use owo_colors::{OwoColorize, Style};

use scribe_record::{EntryKind, LogEntry, format_json, format_plain};

use crate::common::Sink;
use crate::error::SinkError;

/// Custom line renderer, replaces the built-in formatters when set
pub type ConsoleTransform = Arc<dyn Fn(&LogEntry) -> String + Send + Sync>;

/// Console sink writing formatted lines to stdout
pub struct ConsoleSink {
    /// Configuration
    config: ConsoleSinkConfig,

    /// Sink name for logging
    name: String,

    /// Set once close() has run; later writes are discarded
    closed: AtomicBool,

    /// Delivery counters
    metrics: ConsoleSinkMetrics,
}

/// Configuration for the console sink
#[derive(Clone, Default)]
pub struct ConsoleSinkConfig {
    /// Render entries as single-line JSON instead of plain text
    pub json_format: bool,

    /// Enable colored kind tags (plain format only)
    pub color: bool,

    /// Discard entries below this kind; `Raw` always passes
    pub min_level: Option<EntryKind>,

    /// Custom line renderer, overrides both built-in formats
    pub transform: Option<ConsoleTransform>,
}

impl ConsoleSinkConfig {
    /// Enable or disable JSON output
    #[must_use]
    pub fn with_json_format(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }

    /// Enable or disable colored output
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Set the minimum entry kind
    #[must_use]
    pub fn with_min_level(mut self, min_level: EntryKind) -> Self {
        self.min_level = Some(min_level);
        self
    }

    /// Set a custom line renderer
    #[must_use]
    pub fn with_transform(mut self, transform: ConsoleTransform) -> Self {
        self.transform = Some(transform);
        self
    }
}

impl std::fmt::Debug for ConsoleSinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSinkConfig")
            .field("json_format", &self.json_format)
            .field("color", &self.color)
            .field("min_level", &self.min_level)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Get style for an entry kind
fn kind_style(kind: EntryKind, enabled: bool) -> Style {
    if !enabled {
        return Style::new();
    }
    match kind {
        EntryKind::Fatal | EntryKind::Error => Style::new().red(),
        EntryKind::Warning => Style::new().yellow(),
        EntryKind::Info | EntryKind::Debug => Style::new(),
        EntryKind::Trace => Style::new().dimmed(),
        EntryKind::Raw => Style::new(),
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Metrics for the console sink
#[derive(Debug, Default)]
pub struct ConsoleSinkMetrics {
    lines_written: AtomicU64,
    lines_filtered: AtomicU64,
}

impl ConsoleSinkMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            lines_written: AtomicU64::new(0),
            lines_filtered: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> ConsoleMetricsSnapshot {
        ConsoleMetricsSnapshot {
            lines_written: self.lines_written.load(Ordering::Relaxed),
            lines_filtered: self.lines_filtered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of console sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleMetricsSnapshot {
    pub lines_written: u64,
    pub lines_filtered: u64,
}

// =============================================================================
// ConsoleSink Implementation
// =============================================================================

impl ConsoleSink {
    /// Create a new console sink with default config
    pub fn new() -> Self {
        Self::with_config(ConsoleSinkConfig::default())
    }

    /// Create a new console sink with custom config
    pub fn with_config(config: ConsoleSinkConfig) -> Self {
        Self::with_name_and_config("console", config)
    }

    /// Create a new console sink with custom name and config
    pub fn with_name_and_config(name: impl Into<String>, config: ConsoleSinkConfig) -> Self {
        Self {
            config,
            name: name.into(),
            closed: AtomicBool::new(false),
            metrics: ConsoleSinkMetrics::new(),
        }
    }

    /// Get reference to metrics
    #[inline]
    pub fn metrics(&self) -> &ConsoleSinkMetrics {
        &self.metrics
    }

    /// Render one entry as a line without a trailing newline
    fn render(&self, entry: &LogEntry) -> Result<String, SinkError> {
        if let Some(transform) = &self.config.transform {
            return Ok(transform(entry));
        }
        if self.config.json_format {
            return format_json(entry).map_err(|e| SinkError::write(e.to_string()));
        }
        if entry.kind == EntryKind::Raw {
            return Ok(format_plain(entry));
        }

        let style = kind_style(entry.kind, self.config.color);
        let mut line = format!("{}", format!("[{}]", entry.kind).style(style));
        if let Some(service) = &entry.service_name {
            line.push_str(&format!(" [{}]", service));
        }
        if let Some(entity) = &entry.entity_name {
            line.push_str(&format!(" [{}]", entity));
        }
        line.push(' ');
        line.push_str(&entry.message);
        Ok(line)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, entry: &Arc<LogEntry>) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        if let Some(min) = self.config.min_level {
            if !entry.kind.meets(min) {
                self.metrics.lines_filtered.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
        }

        let line = self.render(entry)?;
        println!("{}", line);
        self.metrics.lines_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(sink = %self.name, "console sink closed");
        }
        Ok(())
    }
}
