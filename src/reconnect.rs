//! # Reconnect supervisor.
//!
//! [`Reconnect`] wraps a [`Connection`] and keeps it alive across transient
//! failures. It subscribes to the wrapped link's event stream, classifies
//! disconnects and inbound error frames, and re-arms the link with capped
//! exponential backoff.
//!
//! ## State machine
//! ```text
//! Idle ──connect()──► Connecting ──Connect──► Connected
//!   ▲                     ▲                       │
//!   │                     │ timer fire /          │ Disconnect
//!   │ non-transient       │ environment wake      ▼
//!   └── disconnect ◄── WaitingToRetry ◄── (reconnecting?)
//! ```
//!
//! ## Rules
//! - At most **one** reconnect timer is pending at any time; arming a new one
//!   supersedes the old.
//! - Timer guards are re-checked at fire time: a manual connect during the
//!   wait must not produce a duplicate attempt.
//! - Inbound `["error", code]` frames with a fatal code (wrong-protocol,
//!   wrong-subprotocol, wrong-credentials) disable reconnection permanently
//!   for this instance — retrying an incompatible peer would loop forever.
//! - `destroy()` cancels the listener, the environment listener, and any
//!   pending timer synchronously, then closes the link with reason `Destroy`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::connection::{Connection, DisconnectReason, LinkEvent};
use crate::environment::{EnvSignal, Environment};
use crate::error::LinkError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;
use crate::protocol::{frame, Frame, RawFrame, FATAL_ERRORS};

/// Mutable supervision state, guarded by a short-section mutex.
struct ReconnectState {
    /// Should the link be re-armed after the next disconnect.
    reconnecting: bool,
    /// A connection attempt is currently in flight.
    connecting: bool,
    /// Consecutive attempts since the last successful connect.
    attempts: u32,
    /// The single pending reconnect timer, if any.
    timer: Option<CancellationToken>,
}

struct Inner {
    conn: Arc<dyn Connection>,
    policy: BackoffPolicy,
    limit: Option<u32>,
    events: Bus<Event>,
    state: Mutex<ReconnectState>,
    root: CancellationToken,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, ReconnectState> {
        // A poisoned lock only means a panic elsewhere; the state itself is
        // plain-old-data and safe to reuse.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Increments the attempt counter, arms reconnection, and delegates to
    /// the wrapped transport. Success of this call does not imply the link is
    /// up; that arrives as [`LinkEvent::Connect`].
    async fn do_connect(&self) -> Result<(), LinkError> {
        {
            let mut st = self.lock_state();
            st.attempts += 1;
            st.reconnecting = true;
        }
        self.conn.connect().await
    }

    /// Closes the link. Non-transient reasons disable reconnection and clear
    /// the pending timer; transient ones (timeout / error / freeze) keep the
    /// retry loop armed.
    async fn do_disconnect(&self, reason: DisconnectReason) {
        if !reason.is_transient() {
            let mut st = self.lock_state();
            st.reconnecting = false;
            if let Some(timer) = st.timer.take() {
                timer.cancel();
            }
        }
        self.conn.disconnect(reason).await;
    }

    fn retry_eligible(&self) -> bool {
        let st = self.lock_state();
        st.reconnecting && !st.connecting && !self.conn.connected()
    }
}

/// Supervises one wrapped [`Connection`], retrying it on every transient
/// disconnect. Implements [`Connection`] itself so a synchronization node can
/// wrap either a raw transport or a supervised one interchangeably.
pub struct Reconnect {
    inner: Arc<Inner>,
}

impl Reconnect {
    /// Wraps `conn` without environment integration.
    pub fn new(conn: Arc<dyn Connection>, cfg: &Config, events: Bus<Event>) -> Self {
        Self::build(conn, cfg, events, None)
    }

    /// Wraps `conn` and reacts to host-environment signals: positive wake
    /// signals trigger an immediate retry (bypassing backoff), freeze parks
    /// the link transiently.
    pub fn with_environment(
        conn: Arc<dyn Connection>,
        cfg: &Config,
        events: Bus<Event>,
        env: Arc<dyn Environment>,
    ) -> Self {
        Self::build(conn, cfg, events, Some(env))
    }

    fn build(
        conn: Arc<dyn Connection>,
        cfg: &Config,
        events: Bus<Event>,
        env: Option<Arc<dyn Environment>>,
    ) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(ReconnectState {
                // A link handed over already-established should be kept alive.
                reconnecting: conn.connected(),
                connecting: false,
                attempts: 0,
                timer: None,
            }),
            conn,
            policy: cfg.backoff(),
            limit: cfg.attempts,
            events,
            root: CancellationToken::new(),
        });
        spawn_link_listener(&inner);
        if let Some(env) = env {
            spawn_env_listener(&inner, env);
        }
        Self { inner }
    }

    /// Starts a connection attempt and arms reconnection for future breaks.
    pub async fn connect(&self) -> Result<(), LinkError> {
        self.inner.do_connect().await
    }

    /// Closes the link; see [`DisconnectReason::is_transient`] for which
    /// reasons keep automatic reconnection armed.
    pub async fn disconnect(&self, reason: DisconnectReason) {
        self.inner.do_disconnect(reason).await;
    }

    /// Tears this supervisor down: cancels the event listeners and any
    /// pending timer, then closes the link with reason `Destroy`.
    ///
    /// Safe to call more than once.
    pub async fn destroy(&self) {
        self.inner.root.cancel();
        {
            let mut st = self.inner.lock_state();
            if let Some(timer) = st.timer.take() {
                timer.cancel();
            }
        }
        self.inner.do_disconnect(DisconnectReason::Destroy).await;
    }

    /// Pass-through to the wrapped connection.
    pub fn send(&self, frame: RawFrame) {
        self.inner.conn.send(frame);
    }

    /// Whether the wrapped link is currently established.
    pub fn connected(&self) -> bool {
        self.inner.conn.connected()
    }

    /// Whether the supervisor will retry after the next disconnect.
    pub fn reconnecting(&self) -> bool {
        self.inner.lock_state().reconnecting
    }

    /// Whether a connection attempt is currently in flight.
    pub fn connecting(&self) -> bool {
        self.inner.lock_state().connecting
    }

    /// Consecutive attempts since the last successful connect.
    pub fn attempts(&self) -> u32 {
        self.inner.lock_state().attempts
    }
}

#[async_trait]
impl Connection for Reconnect {
    async fn connect(&self) -> Result<(), LinkError> {
        self.inner.do_connect().await
    }

    async fn disconnect(&self, reason: DisconnectReason) {
        self.inner.do_disconnect(reason).await;
    }

    fn send(&self, frame: RawFrame) {
        self.inner.conn.send(frame);
    }

    fn connected(&self) -> bool {
        self.inner.conn.connected()
    }

    fn events(&self) -> broadcast::Receiver<LinkEvent> {
        self.inner.conn.events()
    }
}

/// Subscribes to the wrapped link's events until the root token is cancelled.
fn spawn_link_listener(inner: &Arc<Inner>) {
    let mut rx = inner.conn.events();
    let token = inner.root.clone();
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                ev = rx.recv() => match ev {
                    Ok(ev) => on_link_event(&inner, ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });
}

fn on_link_event(inner: &Arc<Inner>, ev: LinkEvent) {
    match ev {
        LinkEvent::Message(raw) => {
            if let Ok(Frame::Error { code }) = frame::parse(&raw) {
                if FATAL_ERRORS.contains(&code.as_str()) {
                    let mut st = inner.lock_state();
                    st.reconnecting = false;
                    if let Some(timer) = st.timer.take() {
                        timer.cancel();
                    }
                    drop(st);
                    inner
                        .events
                        .publish(Event::new(EventKind::FatalProtocol).with_reason(code));
                }
            }
        }
        LinkEvent::Connecting => {
            inner.lock_state().connecting = true;
        }
        LinkEvent::Connect => {
            let mut st = inner.lock_state();
            st.attempts = 0;
            st.connecting = false;
        }
        LinkEvent::Disconnect(_) => {
            let should_retry = {
                let mut st = inner.lock_state();
                st.connecting = false;
                st.reconnecting
            };
            if should_retry {
                schedule_reconnect(inner);
            }
        }
    }
}

/// Arms the single reconnect timer, or gives up when the retry budget is
/// exhausted.
fn schedule_reconnect(inner: &Arc<Inner>) {
    let (timer, delay) = {
        let mut st = inner.lock_state();

        if let Some(limit) = inner.limit {
            if st.attempts >= limit {
                let ceiling = st.attempts;
                st.reconnecting = false;
                st.attempts = 0;
                if let Some(timer) = st.timer.take() {
                    timer.cancel();
                }
                drop(st);
                inner
                    .events
                    .publish(Event::new(EventKind::RetriesExhausted).with_attempt(ceiling));
                return;
            }
        }

        let delay = inner.policy.next(st.attempts);
        // Supersede any previous pending fire.
        if let Some(timer) = st.timer.take() {
            timer.cancel();
        }
        let timer = inner.root.child_token();
        st.timer = Some(timer.clone());
        inner.events.publish(
            Event::new(EventKind::ConnectScheduled)
                .with_delay(delay)
                .with_attempt(st.attempts),
        );
        (timer, delay)
    };
    spawn_timer(inner, timer, delay);
}

fn spawn_timer(inner: &Arc<Inner>, timer: CancellationToken, delay: Duration) {
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::select! {
            _ = timer.cancelled() => return,
            _ = time::sleep(delay) => {}
        }
        // State may have changed during the wait (manual connect, destroy);
        // re-check the guards before firing.
        let eligible = {
            let mut st = inner.lock_state();
            st.timer = None;
            st.reconnecting && !st.connecting && !inner.conn.connected()
        };
        if eligible {
            let _ = inner.do_connect().await;
        }
    });
}

/// Reacts to host-environment signals until the root token is cancelled.
fn spawn_env_listener(inner: &Arc<Inner>, env: Arc<dyn Environment>) {
    let mut rx = env.signals();
    let token = inner.root.clone();
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                sig = rx.recv() => match sig {
                    Ok(EnvSignal::Wake(reason)) => {
                        if inner.retry_eligible() && env.online() {
                            inner.events.publish(
                                Event::new(EventKind::EnvironmentWake)
                                    .with_reason(reason.as_str()),
                            );
                            let _ = inner.do_connect().await;
                        }
                    }
                    Ok(EnvSignal::Freeze) => {
                        inner.events.publish(Event::new(EventKind::Frozen));
                        inner.do_disconnect(DisconnectReason::Freeze).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });
}
