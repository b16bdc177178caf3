//! Rate-limited error logging utility
//!
//! Prevents log spam under heavy error conditions by limiting log frequency.
//! Logs at most once per interval, with error count tracking between logs.
//!
//! # Example
//!
//! ```ignore
//! use scribe_sinks::util::RateLimitedLogger;
//! use std::time::Duration;
//!
//! let logger = RateLimitedLogger::new(Duration::from_secs(10));
//!
//! // Only logs once per 10 seconds, even if called frequently
//! for _ in 0..1000 {
//!     logger.error("write failed", &io_error);
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval for rate-limited logging
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Rate-limited logger that prevents log spam
///
/// Under heavy error conditions (e.g., disk full), this prevents flooding
/// logs with repetitive error messages. Instead, it logs at most once per
/// interval, including a count of suppressed errors.
///
/// Thread-safe: uses atomic counters and a mutex for the last log time.
pub struct RateLimitedLogger {
    /// Minimum interval between log messages
    min_interval: Duration,

    /// Last time we logged
    last_log_time: Mutex<Option<Instant>>,

    /// Count of errors since last log
    error_count: AtomicU64,

    /// Total errors ever recorded
    total_errors: AtomicU64,
}

impl RateLimitedLogger {
    /// Create a new rate-limited logger with the specified interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            error_count: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
        }
    }

    /// Create a rate-limited logger with the default interval
    pub fn default_interval() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }

    /// Record an error and log if enough time has passed
    ///
    /// Returns true if the error was logged, false if it was suppressed.
    pub fn error(&self, message: &str, error: &dyn std::fmt::Display) -> bool {
        // Always increment counters
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.total_errors.fetch_add(1, Ordering::Relaxed);

        let should_log = {
            let mut last_time = self.last_log_time.lock();
            let now = Instant::now();

            match *last_time {
                None => {
                    *last_time = Some(now);
                    true
                }
                Some(last) if now.duration_since(last) >= self.min_interval => {
                    *last_time = Some(now);
                    true
                }
                _ => false,
            }
        };

        if should_log {
            let count = self.error_count.swap(0, Ordering::Relaxed);
            let total = self.total_errors.load(Ordering::Relaxed);

            if count > 1 {
                tracing::error!(
                    message = %message,
                    error = %error,
                    suppressed_count = count - 1,
                    total_errors = total,
                    "error (rate-limited)"
                );
            } else {
                tracing::error!(
                    message = %message,
                    error = %error,
                    total_errors = total,
                    "error"
                );
            }
            true
        } else {
            false
        }
    }

    /// Get the current error count since last log
    pub fn pending_error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Get the total error count
    pub fn total_error_count(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.error_count.store(0, Ordering::Relaxed);
        self.total_errors.store(0, Ordering::Relaxed);
        *self.last_log_time.lock() = None;
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::default_interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_rate_limited_logger_new() {
        let logger = RateLimitedLogger::new(Duration::from_secs(5));
        assert_eq!(logger.pending_error_count(), 0);
        assert_eq!(logger.total_error_count(), 0);
    }

    #[test]
    fn test_rate_limited_logger_default() {
        let logger = RateLimitedLogger::default();
        assert_eq!(logger.min_interval, DEFAULT_LOG_INTERVAL);
    }

    #[test]
    fn test_first_error_always_logs() {
        let logger = RateLimitedLogger::new(Duration::from_secs(10));
        let error = io::Error::other("test error");

        let logged = logger.error("test message", &error);
        assert!(logged);
        assert_eq!(logger.total_error_count(), 1);
    }

    #[test]
    fn test_rapid_errors_suppressed() {
        let logger = RateLimitedLogger::new(Duration::from_secs(10));
        let error = io::Error::other("test error");

        // First error logs
        assert!(logger.error("test", &error));

        // Subsequent rapid errors should be suppressed
        for _ in 0..10 {
            let logged = logger.error("test", &error);
            assert!(!logged);
        }

        // All errors counted
        assert_eq!(logger.total_error_count(), 11);
        // Pending count should be 10 (not reset)
        assert_eq!(logger.pending_error_count(), 10);
    }

    #[test]
    fn test_reset() {
        let logger = RateLimitedLogger::new(Duration::from_secs(10));
        let error = io::Error::other("test error");

        logger.error("test", &error);
        assert_eq!(logger.total_error_count(), 1);

        logger.reset();
        assert_eq!(logger.total_error_count(), 0);
        assert_eq!(logger.pending_error_count(), 0);
    }

    #[test]
    fn test_zero_interval_always_logs() {
        let logger = RateLimitedLogger::new(Duration::ZERO);
        let error = io::Error::other("test error");

        assert!(logger.error("test", &error));
        assert!(logger.error("test", &error));
    }
}
