//! Memory Sink - In-process buffering
//!
//! Appends entries to an in-process buffer instead of an external
//! destination. Used as a capture target in tests and as the reference
//! implementation of the sink contract.
//!
//! When a transform closure is configured, the rendered strings are buffered
//! alongside the entries and can be read back with [`MemorySink::lines`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use scribe_record::{EntryKind, LogEntry};

use crate::common::Sink;
use crate::error::SinkError;

/// Custom line renderer applied to each buffered entry
pub type MemoryTransform = Arc<dyn Fn(&LogEntry) -> String + Send + Sync>;

/// Sink that buffers entries in process memory
pub struct MemorySink {
    /// Sink name for logging
    name: String,

    /// Discard entries below this kind; `Raw` always passes
    min_level: Option<EntryKind>,

    /// Optional line renderer; rendered lines land in `lines`
    transform: Option<MemoryTransform>,

    /// Buffered entries in arrival order
    entries: Mutex<Vec<Arc<LogEntry>>>,

    /// Rendered lines, populated only when a transform is set
    lines: Mutex<Vec<String>>,

    /// Set once close() has run; later writes are discarded
    closed: AtomicBool,
}

impl MemorySink {
    /// Create a new memory sink
    pub fn new() -> Self {
        Self::with_name("memory")
    }

    /// Create a new memory sink with a custom name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_level: None,
            transform: None,
            entries: Mutex::new(Vec::new()),
            lines: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Set the minimum entry kind
    #[must_use]
    pub fn with_min_level(mut self, min_level: EntryKind) -> Self {
        self.min_level = Some(min_level);
        self
    }

    /// Set a line renderer; rendered lines are buffered alongside entries
    #[must_use]
    pub fn with_transform(mut self, transform: MemoryTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Snapshot of the buffered entries
    pub fn entries(&self) -> Vec<Arc<LogEntry>> {
        self.entries.lock().clone()
    }

    /// Snapshot of the rendered lines (empty unless a transform is set)
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Drain and return all buffered entries
    pub fn take(&self) -> Vec<Arc<LogEntry>> {
        self.lines.lock().clear();
        std::mem::take(&mut *self.entries.lock())
    }

    /// Number of buffered entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if no entries are buffered
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, entry: &Arc<LogEntry>) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        if let Some(min) = self.min_level {
            if !entry.kind.meets(min) {
                return Ok(());
            }
        }

        if let Some(transform) = &self.transform {
            self.lines.lock().push(transform(entry));
        }
        self.entries.lock().push(Arc::clone(entry));
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;
