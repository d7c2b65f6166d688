//! # Observability events emitted by the supervisor and the watchdog.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries metadata such as
//! timestamps, delays, attempt counts, and human-readable reasons. These
//! events are pure observability: nothing in the crate's control flow depends
//! on anyone consuming them.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore exact order when events are processed
//! out of band.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use linkvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ConnectScheduled)
//!     .with_delay(Duration::from_millis(1200))
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, EventKind::ConnectScheduled);
//! assert_eq!(ev.delay_ms, Some(1200));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `source` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `source` (subscriber name), `reason` ("full" / "closed").
    SubscriberOverflow,

    // === Reconnect supervisor events ===
    /// A reconnect timer was armed after a disconnect.
    ///
    /// Sets: `delay_ms` (backoff delay), `attempt` (consecutive failures so
    /// far).
    ConnectScheduled,

    /// The retry budget is exhausted; automatic reconnection stops.
    ///
    /// Sets: `attempt` (the configured ceiling).
    RetriesExhausted,

    /// A fatal protocol error frame arrived; automatic reconnection stops.
    ///
    /// Sets: `reason` (the error code, e.g. `wrong-protocol`).
    FatalProtocol,

    /// A positive environment signal triggered an immediate reconnect.
    ///
    /// Sets: `reason` (which signal woke the supervisor).
    EnvironmentWake,

    /// The environment froze the process; the link was closed transiently.
    Frozen,

    // === Heartbeat watchdog events ===
    /// The idle window elapsed and a ping frame was sent.
    PingSent,

    /// No pong (nor any other traffic) arrived within the timeout window.
    ///
    /// Sets: `timeout_ms` (the configured timeout), `reason` (error message).
    PingTimeout,

    /// An inbound ping/pong frame failed format validation.
    ///
    /// Sets: `reason` (compact JSON text of the offending frame).
    WrongFormat,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Backoff delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Heartbeat timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Consecutive attempt count at the time of the event.
    pub attempt: Option<u32>,
    /// Human-readable reason (error codes, raw frames, panic info).
    pub reason: Option<Arc<str>>,
    /// Name of the component or subscriber the event refers to.
    pub source: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next global sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            delay_ms: None,
            timeout_ms: None,
            attempt: None,
            reason: None,
            source: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a source name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_source(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_source(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_monotonic() {
        let a = Event::new(EventKind::PingSent);
        let b = Event::new(EventKind::PingSent);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_set_compact_fields() {
        let ev = Event::new(EventKind::PingTimeout)
            .with_timeout(Duration::from_millis(100))
            .with_reason("no pong");
        assert_eq!(ev.timeout_ms, Some(100));
        assert_eq!(ev.reason.as_deref(), Some("no pong"));
    }
}
