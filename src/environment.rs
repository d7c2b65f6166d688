//! # Host-environment signals.
//!
//! Some hosts can tell us when a retry is likely to succeed (a window regained
//! focus, the network came back online, the process resumed) or when the link
//! should be parked (the process is being frozen). [`Environment`] models that
//! capability as a small injectable trait so the supervisor never binds to
//! global host objects directly: absence of the capability is a valid
//! configuration and simply disables these fast paths.
//!
//! [`ManualEnvironment`] is the built-in implementation for hosts and tests
//! that want to drive signals by hand.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

use crate::events::Bus;

/// Which positive signal woke the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakeReason {
    /// The application became visible again.
    VisibilityRestored,
    /// The window or application regained focus.
    FocusGained,
    /// The host reports network connectivity is back.
    NetworkOnline,
    /// The process resumed after a suspension.
    Resumed,
}

impl WakeReason {
    /// Short stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            WakeReason::VisibilityRestored => "visibility-restored",
            WakeReason::FocusGained => "focus-gained",
            WakeReason::NetworkOnline => "network-online",
            WakeReason::Resumed => "resumed",
        }
    }
}

/// A best-effort signal from the host environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvSignal {
    /// A positive signal: retrying now is likely to succeed.
    Wake(WakeReason),
    /// The process is being frozen; park the link transiently.
    Freeze,
}

/// Injectable host-environment capability.
///
/// Implementations broadcast [`EnvSignal`]s and report current connectivity.
/// The supervisor only acts on a wake signal when [`Environment::online`]
/// returns true.
pub trait Environment: Send + Sync + 'static {
    /// Whether the host currently reports network connectivity.
    fn online(&self) -> bool {
        true
    }

    /// Subscribes to this environment's signal stream.
    fn signals(&self) -> broadcast::Receiver<EnvSignal>;
}

/// Hand-driven [`Environment`] for hosts without native signals and for tests.
pub struct ManualEnvironment {
    bus: Bus<EnvSignal>,
    online: AtomicBool,
}

impl ManualEnvironment {
    pub fn new() -> Self {
        Self {
            bus: Bus::new(16),
            online: AtomicBool::new(true),
        }
    }

    /// Flips the reported connectivity flag.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Broadcasts a positive wake signal.
    pub fn wake(&self, reason: WakeReason) {
        self.bus.publish(EnvSignal::Wake(reason));
    }

    /// Broadcasts a freeze signal.
    pub fn freeze(&self) {
        self.bus.publish(EnvSignal::Freeze);
    }
}

impl Default for ManualEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for ManualEnvironment {
    fn online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn signals(&self) -> broadcast::Receiver<EnvSignal> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_environment_broadcasts_signals() {
        let env = ManualEnvironment::new();
        let mut rx = env.signals();

        env.wake(WakeReason::NetworkOnline);
        env.freeze();

        assert_eq!(
            rx.recv().await.ok(),
            Some(EnvSignal::Wake(WakeReason::NetworkOnline))
        );
        assert_eq!(rx.recv().await.ok(), Some(EnvSignal::Freeze));

        assert!(env.online());
        env.set_online(false);
        assert!(!env.online());
    }
}
