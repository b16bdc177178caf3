//! Shared sink utilities
//!
//! - **rate_limited**: rate-limited error logging for sinks whose
//!   destinations fail repeatedly (disk full, absent pipe reader)

pub mod rate_limited;

pub use rate_limited::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
