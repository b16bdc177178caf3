//! Common types shared by all sinks
//!
//! The [`Sink`] trait is the contract the dispatcher programs against. Every
//! sink accepts entries, fails independently, and shuts down on request.
//!
//! # Contract
//!
//! - `write` delivers or enqueues one entry. Queued sinks return `Ok(())`
//!   once the entry is accepted into the queue, before delivery completes.
//! - `close` drains outstanding work within the sink's own timeout and
//!   releases resources. It is idempotent.
//! - `write` after `close` silently discards the entry and returns `Ok(())`.

use std::sync::Arc;

use async_trait::async_trait;

use scribe_record::LogEntry;

use crate::error::SinkError;

/// Destination for log entries
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sink name, used in logging and dispatcher bookkeeping
    fn name(&self) -> &str;

    /// Deliver or enqueue one entry
    async fn write(&self, entry: &Arc<LogEntry>) -> Result<(), SinkError>;

    /// Drain outstanding work and release resources
    async fn close(&self) -> Result<(), SinkError>;
}

/// Unit of work in a sink's internal queue
///
/// Carries the delivery attempt count so retrying sinks can requeue a failed
/// entry with `attempt + 1` and give up past their retry limit.
#[derive(Debug, Clone)]
pub struct QueuedWrite {
    /// The entry to deliver
    pub entry: Arc<LogEntry>,

    /// Delivery attempt, starting at 1
    pub attempt: u32,
}

impl QueuedWrite {
    /// Wrap an entry as a first delivery attempt
    pub fn new(entry: Arc<LogEntry>) -> Self {
        Self { entry, attempt: 1 }
    }

    /// Copy of this write with the attempt count bumped
    pub fn next_attempt(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
            attempt: self.attempt + 1,
        }
    }
}

/// Point-in-time health report for a queued sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkHealth {
    /// False once the sink has seen consecutive failures without recovery
    pub is_healthy: bool,

    /// Entries accepted but not yet finally delivered or dropped
    pub queue_size: usize,

    /// Message of the most recent delivery error, if any
    pub last_error: Option<String>,

    /// Failures since the last successful delivery
    pub consecutive_failures: u64,

    /// Whether lazy initialization has completed
    pub is_initialized: bool,
}

/// Outcome of a bounded flush
///
/// Counts are deltas since the flush started, not lifetime totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Entries delivered while the flush waited
    pub written: u64,

    /// Entries dropped after exhausting retries while the flush waited
    pub failed: u64,

    /// True if the timeout elapsed with entries still queued
    pub timed_out: bool,
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
