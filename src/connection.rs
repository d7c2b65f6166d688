//! # Transport abstraction consumed by the resilience layer.
//!
//! [`Connection`] is the capability set the supervisor and the watchdog need
//! from a transport: connect, disconnect with a typed reason, fire-and-forget
//! frame sending, a connected flag, and a broadcast stream of [`LinkEvent`]s.
//!
//! The concrete transport (WebSocket, TCP, in-process pair, ...) lives outside
//! this crate; [`LocalPair`](crate::LocalPair) ships as the in-memory
//! reference implementation used by tests and demos.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::LinkError;
use crate::protocol::RawFrame;

/// Why a link was (or is being) closed.
///
/// The transient reasons — [`Timeout`](DisconnectReason::Timeout),
/// [`Error`](DisconnectReason::Error), [`Freeze`](DisconnectReason::Freeze) —
/// keep automatic reconnection armed; any other reason disables it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The heartbeat watchdog observed no traffic within its timeout.
    Timeout,
    /// A protocol or transport fault closed the link.
    Error,
    /// The host environment froze the process.
    Freeze,
    /// The supervisor instance is being destroyed.
    Destroy,
    /// A user-initiated close.
    Manual,
}

impl DisconnectReason {
    /// True when a retry is expected to follow this disconnect.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DisconnectReason::Timeout | DisconnectReason::Error | DisconnectReason::Freeze
        )
    }

    /// Short stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Timeout => "timeout",
            DisconnectReason::Error => "error",
            DisconnectReason::Freeze => "freeze",
            DisconnectReason::Destroy => "destroy",
            DisconnectReason::Manual => "manual",
        }
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle and traffic events a transport broadcasts to its wrappers.
#[derive(Clone, Debug)]
pub enum LinkEvent {
    /// A connection attempt started.
    Connecting,
    /// The link is established.
    Connect,
    /// The link closed for the given reason.
    Disconnect(DisconnectReason),
    /// An inbound frame arrived.
    Message(RawFrame),
}

/// Capability set of a duplex, message-based transport.
///
/// Implementations must be cheap to share behind an `Arc`; all methods take
/// `&self`. Events are delivered over a broadcast channel so several wrappers
/// (supervisor, watchdog, the node itself) can observe the same link without
/// coordinating.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Starts a connection attempt.
    ///
    /// Completion does not imply the link is up: the transport reports
    /// progress via [`LinkEvent::Connecting`] / [`LinkEvent::Connect`].
    async fn connect(&self) -> Result<(), LinkError>;

    /// Closes the link, broadcasting [`LinkEvent::Disconnect`] with `reason`.
    async fn disconnect(&self, reason: DisconnectReason);

    /// Sends one frame; silently dropped when the link is down.
    fn send(&self, frame: RawFrame);

    /// Whether the link is currently established.
    fn connected(&self) -> bool;

    /// Subscribes to this link's event stream.
    ///
    /// Each call returns an independent receiver that observes events
    /// broadcast after the call.
    fn events(&self) -> broadcast::Receiver<LinkEvent>;
}
