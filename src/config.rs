//! # Resilience-layer configuration.
//!
//! [`Config`] centralizes the timing knobs of both components:
//!
//! 1. **Reconnect supervisor**: `min_delay`, `max_delay`, `attempts`
//! 2. **Heartbeat watchdog**: `ping`, `timeout`
//!
//! ## Sentinel values
//! - `attempts = None` → unbounded retries
//! - `ping = None` → idle probing disabled (inbound pings are still answered)
//!
//! The configuration contract: whenever `ping` is set, `timeout` must be a
//! positive duration. [`Config::validate`] enforces this; constructors that
//! consume the config fail fast before any connection activity.

use std::time::Duration;

use crate::error::LinkError;
use crate::policies::BackoffPolicy;

/// Timing configuration for the supervisor and the watchdog.
///
/// Immutable after construction by convention: components copy the fields they
/// need when created, so mutating a `Config` later has no effect on live
/// instances.
#[derive(Clone, Debug)]
pub struct Config {
    /// Minimum (base) delay between reconnect attempts.
    pub min_delay: Duration,

    /// Maximum delay between reconnect attempts.
    pub max_delay: Duration,

    /// Maximum reconnect attempts before the supervisor gives up.
    ///
    /// `None` = retry forever.
    pub attempts: Option<u32>,

    /// Idle window after which a ping frame is sent.
    ///
    /// `None` = never probe. Inbound pings are answered either way.
    pub ping: Option<Duration>,

    /// How long to wait for a pong (or any traffic) after a ping.
    ///
    /// Must be non-zero whenever `ping` is set.
    pub timeout: Duration,
}

impl Config {
    /// Checks the cross-field contract.
    ///
    /// # Errors
    /// [`LinkError::MissingTimeout`] when `ping` is set and `timeout` is zero.
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.ping.is_some() && self.timeout.is_zero() {
            return Err(LinkError::MissingTimeout);
        }
        Ok(())
    }

    /// Backoff policy derived from the delay bounds.
    #[inline]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            min_delay: self.min_delay,
            max_delay: self.max_delay,
        }
    }
}

impl Default for Config {
    /// Wire-compatible defaults:
    ///
    /// - `min_delay = 1000ms`, `max_delay = 5000ms`
    /// - `attempts = None` (unbounded)
    /// - `ping = None` (probing disabled), `timeout = 0`
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            attempts: None,
            ping: None,
            timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_wire_protocol() {
        let cfg = Config::default();
        assert_eq!(cfg.min_delay, Duration::from_millis(1000));
        assert_eq!(cfg.max_delay, Duration::from_millis(5000));
        assert_eq!(cfg.attempts, None);
        assert_eq!(cfg.ping, None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn ping_without_timeout_is_rejected() {
        let cfg = Config {
            ping: Some(Duration::from_millis(1000)),
            timeout: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(LinkError::MissingTimeout));
    }

    #[test]
    fn ping_with_timeout_is_accepted() {
        let cfg = Config {
            ping: Some(Duration::from_millis(300)),
            timeout: Duration::from_millis(100),
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
