//! The log dispatcher
//!
//! `LogDispatcher` fans each entry out to every registered sink in
//! registration order. Sink failures are routed through the error hook and
//! never propagate to the caller. An entry carrying an exit code triggers
//! the exit sequence after fan-out completes.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use parking_lot::{Mutex, RwLock};

use scribe_record::LogEntry;
use scribe_sinks::{Sink, SinkError};

use crate::config::{DispatcherConfig, ExitDirective};
use crate::error::DispatchError;

/// Fans log entries out to a set of independently failing sinks
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct LogDispatcher {
    config: DispatcherConfig,
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
    closed: AtomicBool,
    exit_requested: AtomicBool,
    is_pending_exit: AtomicBool,
    did_exit: AtomicBool,
    exit_code: Mutex<Option<i32>>,
}

impl LogDispatcher {
    /// Create a dispatcher from its configuration
    pub fn new(config: DispatcherConfig) -> Self {
        let sinks = config.sinks.clone();
        Self {
            config,
            sinks: RwLock::new(sinks),
            closed: AtomicBool::new(false),
            exit_requested: AtomicBool::new(false),
            is_pending_exit: AtomicBool::new(false),
            did_exit: AtomicBool::new(false),
            exit_code: Mutex::new(None),
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Deliver one entry to every registered sink
    ///
    /// Applies redaction first, then wraps the entry in an `Arc` and writes
    /// it to each sink in registration order. A failing sink is reported
    /// through the error hook and the remaining sinks still receive the
    /// entry. When the entry carries an exit code the exit sequence runs
    /// after fan-out. No-op once the dispatcher is closed.
    pub async fn dispatch(&self, mut entry: LogEntry) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        if let Some(redact) = &self.config.redact {
            let has_params = entry.params.as_ref().is_some_and(|p| !p.is_empty());
            if has_params {
                if let Some(params) = &entry.params {
                    if let Some(redaction) = redact(params) {
                        entry.redacted_params = Some(redaction.params);
                        entry.redacted_keys = Some(redaction.keys);
                    }
                }
            }
        }

        let exit_code = entry.exit_code;
        let entry = Arc::new(entry);

        let sinks = self.sinks.read().clone();
        for sink in &sinks {
            if let Err(err) = sink.write(&entry).await {
                self.report(&err, "write", sink.name());
            }
        }

        if let Some(code) = exit_code {
            self.exit(code).await;
        }
    }

    // =========================================================================
    // Sink management
    // =========================================================================

    /// Append a sink; it receives entries dispatched from now on
    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.sinks.write().push(sink);
    }

    /// Unregister the sink with the given name without closing it
    ///
    /// The caller keeps ownership of the sink's lifecycle; a removed sink
    /// simply stops receiving entries.
    pub fn remove_sink(&self, name: &str) -> Result<Arc<dyn Sink>, DispatchError> {
        let mut sinks = self.sinks.write();
        match sinks.iter().position(|s| s.name() == name) {
            Some(index) => Ok(sinks.remove(index)),
            None => Err(DispatchError::UnknownSink {
                name: name.to_string(),
            }),
        }
    }

    /// Snapshot of the currently registered sinks
    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.sinks.read().clone()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close every registered sink concurrently and clear the registry
    ///
    /// Close failures are routed through the error hook. Idempotent; later
    /// calls return immediately.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let sinks = self.sinks.read().clone();
        let closes = sinks.iter().map(|sink| {
            let sink = Arc::clone(sink);
            async move { (sink.name().to_string(), sink.close().await) }
        });
        for (name, result) in join_all(closes).await {
            if let Err(err) = result {
                self.report(&err, "close", &name);
            }
        }

        self.sinks.write().clear();
        tracing::debug!("dispatcher closed");
    }

    /// Run the exit sequence for the given code
    ///
    /// The first call wins: its code is recorded and later calls see
    /// `is_first == false` in the hook while the recorded code stays put.
    /// A `Wait` directive leaves the dispatcher open for the caller to
    /// finish on its own; `Proceed` closes all sinks and, when
    /// `call_process_exit` is set, terminates the process.
    pub async fn exit(&self, code: i32) {
        let is_first = !self.exit_requested.swap(true, Ordering::AcqRel);
        self.is_pending_exit.store(true, Ordering::Release);
        if is_first {
            *self.exit_code.lock() = Some(code);
        }

        let directive = match &self.config.before_exit {
            Some(hook) => {
                let hook = Arc::clone(hook);
                panic::catch_unwind(AssertUnwindSafe(|| hook(code, is_first)))
                    .unwrap_or(ExitDirective::Proceed)
            }
            None => ExitDirective::Proceed,
        };
        if directive == ExitDirective::Wait {
            return;
        }

        self.close().await;
        self.did_exit.store(true, Ordering::Release);

        if self.config.call_process_exit {
            std::process::exit(code);
        }
    }

    // =========================================================================
    // State accessors
    // =========================================================================

    /// Whether `close` has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether an exit has been requested but the sequence may still be
    /// running or deferred
    pub fn is_pending_exit(&self) -> bool {
        self.is_pending_exit.load(Ordering::Acquire)
    }

    /// Whether the exit sequence finished closing the dispatcher
    pub fn did_exit(&self) -> bool {
        self.did_exit.load(Ordering::Acquire)
    }

    /// The code recorded by the first exit request
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_code.lock()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn report(&self, err: &SinkError, op: &str, sink: &str) {
        match &self.config.on_sink_error {
            Some(hook) => hook(err, op, sink),
            None => {
                tracing::error!(sink = %sink, op = %op, error = %err, "sink operation failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod dispatcher_test;
