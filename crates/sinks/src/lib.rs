//! Scribe - Sinks
//!
//! Output sinks for the Scribe log delivery pipeline. Each sink accepts
//! `Arc<LogEntry>` records through the shared `Sink` trait and delivers them
//! to its destination independently; one sink failing never affects another.
//!
//! # Architecture
//!
//! ```text
//! [Dispatcher] --Arc<LogEntry>--> [Sink::write] --> [queue] --> [worker task] --> [destination]
//! ```
//!
//! The console and memory sinks deliver inline. The file and pipe sinks queue
//! internally and drain from a single spawned worker task that exclusively
//! owns the output handle.
//!
//! # Available Sinks
//!
//! | Sink | Purpose | Queued |
//! |------|---------|--------|
//! | `console` | Colored stdout output | No |
//! | `memory` | In-process buffer (tests, capture) | No |
//! | `file` | Rotating on-disk log files with retry | Yes |
//! | `pipe` | Named pipe (FIFO) with reconnect | Yes |
//!
//! # Example
//!
//! ```ignore
//! use scribe_sinks::file::{DurableFileSink, FileSinkConfig};
//! use scribe_sinks::Sink;
//!
//! let config = FileSinkConfig::default().with_log_dir("/var/log/app");
//! let sink = DurableFileSink::new(config)?;
//! sink.write(&entry).await?;
//! sink.close().await?;
//! ```

// =============================================================================
// Sink implementations (each in its own submodule)
// =============================================================================

/// Console sink - colored stdout output
pub mod console;

/// Memory sink - in-process buffering for capture and tests
pub mod memory;

/// File sink - rotating on-disk log files with retry
pub mod file;

/// Pipe sink - named pipe (FIFO) delivery with reconnect
pub mod pipe;

// =============================================================================
// Shared utilities
// =============================================================================

/// Shared utilities (rate-limited error logging)
pub mod util;

/// Common types shared by all sinks (trait, queue unit, health)
mod common;

/// Sink error types
mod error;

// =============================================================================
// Public re-exports
// =============================================================================

pub use common::{FlushReport, QueuedWrite, Sink, SinkHealth};
pub use error::{SinkError, SinkErrorKind};

pub use console::{ConsoleSink, ConsoleSinkConfig};
pub use file::{DurableFileSink, FileSinkConfig};
pub use memory::MemorySink;
pub use pipe::{ConnectionState, PipeSinkConfig, ReconnectStatus, ReconnectingPipeSink};

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

// Tests are registered in their respective modules via #[cfg(test)]
// See: common.rs, console/mod.rs, file/mod.rs, pipe/mod.rs, etc.
