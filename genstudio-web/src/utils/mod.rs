//! Utility modules

pub mod backoff;

pub use backoff::{sleep_or_cancel, Backoff, RetryPolicy};
