//! Dispatcher configuration and hook types

use std::fmt;
use std::sync::Arc;

use scribe_record::Params;
use scribe_sinks::{Sink, SinkError};

// =============================================================================
// Hook types
// =============================================================================

/// What the `before_exit` hook wants the exit sequence to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDirective {
    /// Continue: close the dispatcher and (when enabled) exit the process
    Proceed,

    /// Defer: leave the dispatcher open; the caller exits on its own terms
    Wait,
}

/// Result of a redaction pass over an entry's parameters
#[derive(Debug, Clone)]
pub struct Redaction {
    /// Parameter tree with sensitive values replaced
    pub params: Params,

    /// Dotted paths of the keys that were replaced
    pub keys: Vec<String>,
}

/// Inspects an entry's parameters and returns a redacted copy, or `None`
/// when nothing needs redacting
pub type RedactFn = Arc<dyn Fn(&Params) -> Option<Redaction> + Send + Sync>;

/// Called once per exit request with the exit code and whether this is the
/// first request. A panicking hook is treated as `Proceed`.
pub type BeforeExitHook = Arc<dyn Fn(i32, bool) -> ExitDirective + Send + Sync>;

/// Receives every sink failure as `(error, operation, sink name)` where the
/// operation is `"write"` or `"close"`
pub type SinkErrorHook = Arc<dyn Fn(&SinkError, &str, &str) + Send + Sync>;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`LogDispatcher`](crate::LogDispatcher)
///
/// # Example
///
/// ```ignore
/// let config = DispatcherConfig::default()
///     .with_sink(Arc::new(MemorySink::new()))
///     .with_call_process_exit(false);
/// ```
#[derive(Clone)]
pub struct DispatcherConfig {
    /// Sinks to register, fan-out happens in this order
    pub sinks: Vec<Arc<dyn Sink>>,

    /// Optional parameter redaction applied before fan-out
    pub redact: Option<RedactFn>,

    /// Whether the exit sequence ends in `std::process::exit` (default: true)
    pub call_process_exit: bool,

    /// Hook consulted before the exit sequence closes the dispatcher
    pub before_exit: Option<BeforeExitHook>,

    /// Hook receiving sink failures; defaults to a `tracing::error!` report
    pub on_sink_error: Option<SinkErrorHook>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            sinks: Vec::new(),
            redact: None,
            call_process_exit: true,
            before_exit: None,
            on_sink_error: None,
        }
    }
}

impl DispatcherConfig {
    /// Register a sink; fan-out follows registration order
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Set the redaction function
    #[must_use]
    pub fn with_redact(mut self, redact: RedactFn) -> Self {
        self.redact = Some(redact);
        self
    }

    /// Control whether the exit sequence terminates the process
    #[must_use]
    pub fn with_call_process_exit(mut self, call: bool) -> Self {
        self.call_process_exit = call;
        self
    }

    /// Set the pre-exit hook
    #[must_use]
    pub fn with_before_exit(mut self, hook: BeforeExitHook) -> Self {
        self.before_exit = Some(hook);
        self
    }

    /// Set the sink failure hook
    #[must_use]
    pub fn with_on_sink_error(mut self, hook: SinkErrorHook) -> Self {
        self.on_sink_error = Some(hook);
        self
    }
}

impl fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("DispatcherConfig")
            .field("sinks", &names)
            .field("redact", &self.redact.is_some())
            .field("call_process_exit", &self.call_process_exit)
            .field("before_exit", &self.before_exit.is_some())
            .field("on_sink_error", &self.on_sink_error.is_some())
            .finish()
    }
}
