//! # Broadcast bus for runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking publishing from multiple sources. linkvisor uses it twice:
//! transports broadcast [`LinkEvent`](crate::LinkEvent)s to the supervisor and
//! the watchdog, and both components broadcast observability
//! [`Event`](crate::Event)s to whoever subscribes.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or awaits.
//! - **Bounded capacity**: a ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n`
//!   oldest items.
//! - **No persistence**: events are dropped if nobody is subscribed at send
//!   time.

use tokio::sync::broadcast;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender); multiple
/// publishers may publish concurrently and every receiver observes a clone of
/// each event.
#[derive(Clone, Debug)]
pub struct Bus<T: Clone> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone> Bus<T> {
    /// Creates a new bus with the given channel capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<T>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers the event is dropped; the call still returns
    /// immediately.
    pub fn publish(&self, ev: T) {
        let _ = self.tx.send(ev);
    }

    /// Publishes a borrowed event by cloning it.
    pub fn publish_ref(&self, ev: &T) {
        let _ = self.tx.send(ev.clone());
    }

    /// Creates an independent receiver observing subsequent events only.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_every_receiver() {
        let bus: Bus<u32> = Bus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(7);
        assert_eq!(a.recv().await.ok(), Some(7));
        assert_eq!(b.recv().await.ok(), Some(7));
    }

    #[tokio::test]
    async fn publish_without_receivers_is_a_noop() {
        let bus: Bus<u32> = Bus::new(1);
        bus.publish(1);
        // Subscribing afterwards only sees later events.
        let mut rx = bus.subscribe();
        bus.publish(2);
        assert_eq!(rx.recv().await.ok(), Some(2));
    }
}
