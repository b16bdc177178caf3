//! Scribe Record - Core log entry types for the Scribe pipeline
//!
//! This crate provides the foundational types that flow through the pipeline:
//! - `LogEntry` - Immutable log record shared across sinks via `Arc`
//! - `EntryKind` - Severity/category classification for filtering and display
//! - `format_plain` / `format_json` - The shared line formatters
//!
//! # Design Principles
//!
//! - **Immutable records**: A `LogEntry` is constructed once and never mutated
//!   after it enters the pipeline; sinks share it through `Arc<LogEntry>`.
//! - **Ordered params**: `params` uses `IndexMap` so serialized output keeps
//!   the caller's key order.
//! - **Formatters return bare lines**: No trailing newline; the sink that
//!   writes the line appends it.

mod entry;
mod error;
mod format;
mod kind;

pub use entry::{LogEntry, LogEntryBuilder, Params};
pub use error::RecordError;
pub use format::{format_json, format_plain};
pub use kind::EntryKind;

/// Result type for record operations
pub type Result<T> = std::result::Result<T, RecordError>;

// Test modules - only compiled during testing
#[cfg(test)]
mod entry_test;
#[cfg(test)]
mod format_test;
#[cfg(test)]
mod kind_test;
