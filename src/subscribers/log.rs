//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [connect-scheduled] delay=1200ms attempt=2
//! [retries-exhausted] attempt=5
//! [fatal-protocol] code="wrong-credentials"
//! [ping-sent]
//! [ping-timeout] timeout=100ms
//! [wrong-format] frame="[\"ping\",\"abc\"]"
//! ```
//!
//! Enabled via the `logging` feature. Not intended for production use —
//! implement a custom [`Subscribe`] for structured logging or metrics.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ConnectScheduled => {
                println!(
                    "[connect-scheduled] delay={}ms attempt={}",
                    e.delay_ms.unwrap_or(0),
                    e.attempt.unwrap_or(0)
                );
            }
            EventKind::RetriesExhausted => {
                println!("[retries-exhausted] attempt={}", e.attempt.unwrap_or(0));
            }
            EventKind::FatalProtocol => {
                println!("[fatal-protocol] code={reason:?}");
            }
            EventKind::EnvironmentWake => {
                println!("[environment-wake] signal={reason:?}");
            }
            EventKind::Frozen => {
                println!("[frozen]");
            }
            EventKind::PingSent => {
                println!("[ping-sent]");
            }
            EventKind::PingTimeout => {
                println!("[ping-timeout] timeout={}ms", e.timeout_ms.unwrap_or(0));
            }
            EventKind::WrongFormat => {
                println!("[wrong-format] frame={reason:?}");
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] sub={:?} reason={reason:?}",
                    e.source.as_deref().unwrap_or("")
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] sub={:?} info={reason:?}",
                    e.source.as_deref().unwrap_or("")
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
