//! Error types used by the linkvisor runtime.
//!
//! [`LinkError`] covers both construction-time misconfiguration and runtime
//! faults. Misconfiguration is returned synchronously from constructors;
//! runtime faults are delivered over the event plane (see
//! [`EventKind`](crate::EventKind)) so the cooperative, non-blocking model is
//! preserved — nothing in this crate panics on a protocol fault.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the resilience layer.
///
/// Some variants are transient (`PingTimeout`), others are terminal for the
/// current configuration (`MissingTimeout`) or for the current frame
/// (`WrongFormat`).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    /// `ping` was configured without a positive `timeout`.
    ///
    /// Raised by [`Config::validate`](crate::Config::validate) and by
    /// [`Heartbeat::new`](crate::Heartbeat::new) before any connection
    /// activity occurs.
    #[error("tried to use ping without timeout; set timeout option")]
    MissingTimeout,

    /// No pong (nor any other traffic) arrived within the timeout window.
    #[error("no pong answer within {timeout:?}")]
    PingTimeout {
        /// The configured timeout that elapsed.
        timeout: Duration,
    },

    /// A ping/pong frame failed format validation.
    #[error("wrong message format: {frame}")]
    WrongFormat {
        /// Compact JSON text of the offending frame.
        frame: String,
    },

    /// The wrapped transport reported a failure while connecting.
    #[error("transport failure: {message}")]
    Transport {
        /// The underlying transport message.
        message: String,
    },
}

impl LinkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use linkvisor::LinkError;
    ///
    /// assert_eq!(LinkError::MissingTimeout.as_label(), "missing_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LinkError::MissingTimeout => "missing_timeout",
            LinkError::PingTimeout { .. } => "ping_timeout",
            LinkError::WrongFormat { .. } => "wrong_format",
            LinkError::Transport { .. } => "transport",
        }
    }

    /// Indicates whether the fault is safe to retry over the same link.
    ///
    /// Only [`LinkError::PingTimeout`] and [`LinkError::Transport`] are
    /// transient; the others require a configuration or peer-side fix.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LinkError::PingTimeout { .. } | LinkError::Transport { .. }
        )
    }
}
