//! Policies controlling retry behavior.
//!
//! - [`BackoffPolicy`]: pure attempt-count → delay function with capped
//!   exponential growth and low-entropy jitter.

mod backoff;

pub use backoff::BackoffPolicy;
