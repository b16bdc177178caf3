//! Scribe - Dispatch
//!
//! The dispatcher is the single entry point of the Scribe log delivery
//! pipeline. It applies optional parameter redaction, wraps the entry in an
//! `Arc`, and fans it out to every registered sink in registration order.
//! Sink failures are routed through a hook and never reach the caller; one
//! sink failing never affects another.
//!
//! # Architecture
//!
//! ```text
//! [dispatch(entry)] → [redact] → Arc<LogEntry> → [sink 1] [sink 2] ... [sink n]
//!                                                     ↓ (entry.exit_code)
//!                                            [before_exit hook] → [close] → exit
//! ```
//!
//! # Example
//!
//! ```ignore
//! use scribe_dispatch::{DispatcherConfig, LogDispatcher};
//! use scribe_sinks::MemorySink;
//!
//! let sink = Arc::new(MemorySink::new());
//! let dispatcher = LogDispatcher::new(DispatcherConfig::default().with_sink(sink));
//! dispatcher.dispatch(entry).await;
//! dispatcher.close().await;
//! ```

// =============================================================================
// Modules
// =============================================================================

/// Dispatcher configuration and hook types
mod config;

/// The dispatcher itself
mod dispatcher;

/// Dispatch error types
mod error;

// =============================================================================
// Public re-exports
// =============================================================================

pub use config::{
    BeforeExitHook, DispatcherConfig, ExitDirective, RedactFn, Redaction, SinkErrorHook,
};
pub use dispatcher::LogDispatcher;
pub use error::DispatchError;
