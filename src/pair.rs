//! # In-memory connection pair.
//!
//! [`LocalPair`] wires two [`Connection`] ends together inside one process:
//! a frame sent on the left end surfaces as a [`LinkEvent::Message`] on the
//! right end and vice versa. Both ends share one connected flag, so
//! connecting or disconnecting either side is observed by both.
//!
//! This is the crate's reference transport, used by the heartbeat and
//! supervisor tests and handy for demos and node-level integration tests.
//!
//! ```rust
//! use linkvisor::{Connection, LocalPair, LinkEvent};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pair = LocalPair::new();
//! let mut right_rx = pair.right.events();
//!
//! pair.left.connect().await.unwrap();
//! pair.left.send(json!(["hello"]));
//!
//! assert!(matches!(right_rx.recv().await, Ok(LinkEvent::Connect)));
//! assert!(matches!(right_rx.recv().await, Ok(LinkEvent::Message(_))));
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::connection::{Connection, DisconnectReason, LinkEvent};
use crate::error::LinkError;
use crate::events::Bus;
use crate::protocol::RawFrame;

const PAIR_BUS_CAPACITY: usize = 64;

/// One end of a [`LocalPair`].
pub struct LocalConnection {
    bus: Bus<LinkEvent>,
    peer_bus: Bus<LinkEvent>,
    connected: Arc<AtomicBool>,
}

/// Two [`LocalConnection`] ends joined back to back.
pub struct LocalPair {
    /// The client-like end.
    pub left: Arc<LocalConnection>,
    /// The server-like end.
    pub right: Arc<LocalConnection>,
}

impl LocalPair {
    /// Creates a fresh, disconnected pair.
    pub fn new() -> Self {
        let left_bus: Bus<LinkEvent> = Bus::new(PAIR_BUS_CAPACITY);
        let right_bus: Bus<LinkEvent> = Bus::new(PAIR_BUS_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));

        let left = Arc::new(LocalConnection {
            bus: left_bus.clone(),
            peer_bus: right_bus.clone(),
            connected: Arc::clone(&connected),
        });
        let right = Arc::new(LocalConnection {
            bus: right_bus,
            peer_bus: left_bus,
            connected,
        });
        Self { left, right }
    }
}

impl Default for LocalPair {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for LocalConnection {
    async fn connect(&self) -> Result<(), LinkError> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.bus.publish(LinkEvent::Connecting);
        self.connected.store(true, Ordering::SeqCst);
        // Both ends observe the established link.
        self.bus.publish(LinkEvent::Connect);
        self.peer_bus.publish(LinkEvent::Connect);
        Ok(())
    }

    async fn disconnect(&self, reason: DisconnectReason) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        self.bus.publish(LinkEvent::Disconnect(reason));
        self.peer_bus.publish(LinkEvent::Disconnect(reason));
    }

    fn send(&self, frame: RawFrame) {
        if self.connected.load(Ordering::SeqCst) {
            self.peer_bus.publish(LinkEvent::Message(frame));
        }
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn events(&self) -> broadcast::Receiver<LinkEvent> {
        self.bus.subscribe()
    }
}
