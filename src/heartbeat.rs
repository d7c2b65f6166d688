//! # Heartbeat watchdog.
//!
//! [`Heartbeat`] detects silently dead links. While the link is connected it
//! tracks idle time: once no traffic has moved for the `ping` window it sends
//! `["ping", now]` and arms a timeout. A pong — or any other traffic —
//! cancels the timeout; if nothing arrives, the link is declared broken:
//! a [`EventKind::PingTimeout`] event is published and the connection is
//! closed with reason `Timeout` (transient, so a wrapping
//! [`Reconnect`](crate::Reconnect) will re-arm it).
//!
//! The watchdog also answers the peer's probes: an inbound `["ping", n]` is
//! replied to with `["pong", n]` even when idle probing is not configured.
//! Malformed ping/pong frames are answered with
//! `["error", "wrong-format", <raw frame JSON>]` and close the link — a peer
//! that cannot produce a well-formed number is not worth keeping.
//!
//! ## Rules
//! - At most one ping/timeout pair is outstanding at a time; a second ping is
//!   never sent while one is awaiting its pong.
//! - Timers are armed on `Connect` and disarmed on `Disconnect`/destroy.
//! - Outbound traffic must flow through [`Heartbeat::send`] so it resets the
//!   idle clock the same way inbound traffic does.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::connection::{Connection, DisconnectReason, LinkEvent};
use crate::error::LinkError;
use crate::events::{Bus, Event, EventKind};
use crate::protocol::{frame, Frame, RawFrame};

/// Watchdog timer state, guarded by a short-section mutex.
struct HeartbeatState {
    /// Armed while waiting for the idle window to elapse.
    ping_timer: Option<CancellationToken>,
    /// Armed while waiting for the pong answer.
    timeout_timer: Option<CancellationToken>,
    /// A ping went out and no traffic has arrived since.
    waiting_pong: bool,
    /// Timestamp carried by the outstanding ping.
    last_ping: Option<u64>,
}

struct Inner {
    conn: Arc<dyn Connection>,
    ping: Option<Duration>,
    timeout: Duration,
    events: Bus<Event>,
    state: Mutex<HeartbeatState>,
    root: CancellationToken,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, HeartbeatState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cancels the outstanding timeout; any traffic proves the link alive.
    fn end_timeout(&self) {
        let mut st = self.lock_state();
        if let Some(timer) = st.timeout_timer.take() {
            timer.cancel();
        }
        st.waiting_pong = false;
    }

    /// Disarms everything; called on disconnect and destroy.
    fn disarm(&self) {
        let mut st = self.lock_state();
        if let Some(timer) = st.ping_timer.take() {
            timer.cancel();
        }
        if let Some(timer) = st.timeout_timer.take() {
            timer.cancel();
        }
        st.waiting_pong = false;
        st.last_ping = None;
    }
}

/// Liveness watchdog for one [`Connection`].
///
/// Owned by the synchronization node; the node routes its outbound frames
/// through [`Heartbeat::send`] and otherwise lets the watchdog react to the
/// link's event stream on its own.
pub struct Heartbeat {
    inner: Arc<Inner>,
}

impl Heartbeat {
    /// Creates a watchdog for `conn`.
    ///
    /// # Errors
    /// [`LinkError::MissingTimeout`] when `cfg.ping` is set but `cfg.timeout`
    /// is zero — checked here, before any connection activity occurs.
    pub fn new(
        conn: Arc<dyn Connection>,
        cfg: &Config,
        events: Bus<Event>,
    ) -> Result<Self, LinkError> {
        cfg.validate()?;
        let inner = Arc::new(Inner {
            conn,
            ping: cfg.ping,
            timeout: cfg.timeout,
            events,
            state: Mutex::new(HeartbeatState {
                ping_timer: None,
                timeout_timer: None,
                waiting_pong: false,
                last_ping: None,
            }),
            root: CancellationToken::new(),
        });
        spawn_link_listener(&inner);
        Ok(Self { inner })
    }

    /// Sends one frame and resets the idle clock.
    pub fn send(&self, raw: RawFrame) {
        self.inner.conn.send(raw);
        delay_ping(&self.inner);
    }

    /// Whether a ping is outstanding (sent, no traffic since).
    pub fn waiting_pong(&self) -> bool {
        self.inner.lock_state().waiting_pong
    }

    /// Timestamp (ms since the epoch) carried by the outstanding ping, if any.
    pub fn last_ping(&self) -> Option<u64> {
        self.inner.lock_state().last_ping
    }

    /// Tears the watchdog down: cancels the listener and both timers.
    ///
    /// Safe to call more than once.
    pub fn destroy(&self) {
        self.inner.root.cancel();
        self.inner.disarm();
    }
}

fn spawn_link_listener(inner: &Arc<Inner>) {
    let mut rx = inner.conn.events();
    let token = inner.root.clone();
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                ev = rx.recv() => match ev {
                    Ok(LinkEvent::Connect) => delay_ping(&inner),
                    Ok(LinkEvent::Disconnect(_)) => inner.disarm(),
                    Ok(LinkEvent::Message(raw)) => on_message(&inner, raw).await,
                    Ok(LinkEvent::Connecting) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });
}

async fn on_message(inner: &Arc<Inner>, raw: RawFrame) {
    // Any inbound traffic proves the link alive.
    inner.end_timeout();

    match frame::parse(&raw) {
        Ok(Frame::Ping(n)) => {
            inner.conn.send(frame::pong(&n));
            delay_ping(inner);
        }
        Ok(Frame::Pong(_)) => {
            delay_ping(inner);
        }
        Ok(Frame::Error { .. }) | Ok(Frame::Other) => {
            delay_ping(inner);
        }
        Err(_) => wrong_format(inner, &raw).await,
    }
}

/// Answers a malformed frame with a `wrong-format` error carrying the exact
/// JSON text of the offender, then closes the link.
async fn wrong_format(inner: &Arc<Inner>, raw: &RawFrame) {
    let text = serde_json::to_string(raw).unwrap_or_default();
    inner.conn.send(frame::wrong_format(&text));
    inner
        .events
        .publish(Event::new(EventKind::WrongFormat).with_reason(text));
    inner.conn.disconnect(DisconnectReason::Error).await;
}

/// Re-arms the idle timer. No-op when idle probing is not configured or a
/// ping is already outstanding (one pair at a time).
fn delay_ping(inner: &Arc<Inner>) {
    let Some(ping) = inner.ping else {
        return;
    };
    let mut st = inner.lock_state();
    if let Some(timer) = st.ping_timer.take() {
        timer.cancel();
    }
    if st.waiting_pong {
        return;
    }
    let timer = inner.root.child_token();
    st.ping_timer = Some(timer.clone());
    drop(st);

    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::select! {
            _ = timer.cancelled() => return,
            _ = time::sleep(ping) => {}
        }
        send_ping(&inner).await;
    });
}

async fn send_ping(inner: &Arc<Inner>) {
    let now = now_ms();
    {
        let mut st = inner.lock_state();
        st.ping_timer = None;
        if st.waiting_pong {
            return;
        }
        st.waiting_pong = true;
        st.last_ping = Some(now);
    }
    inner.conn.send(frame::ping(now));
    inner.events.publish(Event::new(EventKind::PingSent));
    start_timeout(inner);
}

fn start_timeout(inner: &Arc<Inner>) {
    let timer = {
        let mut st = inner.lock_state();
        if let Some(timer) = st.timeout_timer.take() {
            timer.cancel();
        }
        let timer = inner.root.child_token();
        st.timeout_timer = Some(timer.clone());
        timer
    };

    let timeout = inner.timeout;
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::select! {
            _ = timer.cancelled() => return,
            _ = time::sleep(timeout) => {}
        }
        {
            let mut st = inner.lock_state();
            st.timeout_timer = None;
            st.waiting_pong = false;
        }
        inner.events.publish(
            Event::new(EventKind::PingTimeout)
                .with_timeout(timeout)
                .with_reason(LinkError::PingTimeout { timeout }.to_string()),
        );
        // The supervisor treats this reason as transient and retries.
        inner.conn.disconnect(DisconnectReason::Timeout).await;
    });
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair::LocalPair;
    use serde_json::json;

    /// Collects frames the right end receives, in order.
    fn collect_right(pair: &LocalPair) -> Arc<Mutex<Vec<RawFrame>>> {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut rx = pair.right.events();
        let out = Arc::clone(&sent);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                if let LinkEvent::Message(frame) = ev {
                    out.lock().unwrap().push(frame);
                }
            }
        });
        sent
    }

    fn ping_config(ping_ms: u64, timeout_ms: u64) -> Config {
        Config {
            ping: Some(Duration::from_millis(ping_ms)),
            timeout: Duration::from_millis(timeout_ms),
            ..Config::default()
        }
    }

    async fn settle() {
        time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn rejects_ping_without_timeout() {
        let pair = LocalPair::new();
        let cfg = ping_config(1000, 0);
        let err = Heartbeat::new(pair.left.clone(), &cfg, Bus::new(16))
            .err()
            .expect("construction must fail");
        assert_eq!(err, LinkError::MissingTimeout);
        assert!(err.to_string().contains("set timeout option"));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn answers_pong_on_ping() {
        let pair = LocalPair::new();
        let _hb = Heartbeat::new(pair.left.clone(), &Config::default(), Bus::new(16)).unwrap();
        let sent = collect_right(&pair);

        pair.left.connect().await.unwrap();
        settle().await;

        pair.right.send(json!(["ping", 1]));
        settle().await;

        assert_eq!(*sent.lock().unwrap(), vec![json!(["pong", 1])]);
        assert!(pair.left.connected());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn sends_ping_on_idle_connection() {
        let pair = LocalPair::new();
        let bus = Bus::new(64);
        let mut events = bus.subscribe();
        let hb = Heartbeat::new(pair.left.clone(), &ping_config(300, 100), bus).unwrap();
        let sent = collect_right(&pair);

        pair.left.connect().await.unwrap();
        settle().await;

        // Traffic in either direction keeps postponing the ping.
        time::sleep(Duration::from_millis(250)).await;
        pair.right.send(json!(["test"]));
        time::sleep(Duration::from_millis(250)).await;
        hb.send(json!(["test"]));
        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(sent.lock().unwrap().len(), 1, "only the outbound test frame");

        // 300ms after the last traffic: exactly one ping.
        time::sleep(Duration::from_millis(100)).await;
        {
            let frames = sent.lock().unwrap();
            assert_eq!(frames.len(), 2);
            assert_eq!(frames[1][0], json!("ping"));
            assert!(frames[1][1].is_number());
        }
        assert!(hb.waiting_pong());
        assert!(hb.last_ping().is_some());

        // The pong lands within the timeout: no error, idle tracking resumes.
        let ts = sent.lock().unwrap()[1][1].clone();
        pair.right.send(json!(["pong", ts]));
        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(sent.lock().unwrap().len(), 2);
        assert!(pair.left.connected());

        // Next idle window elapses: a second ping goes out.
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sent.lock().unwrap().len(), 3);
        assert_eq!(sent.lock().unwrap()[2][0], json!("ping"));

        // No pong this time: the timeout fires and closes the link.
        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(sent.lock().unwrap().len(), 3, "no further ping");
        assert!(!pair.left.connected());
        assert_eq!(hb.last_ping(), None, "disconnect disarms the state");

        let timeout_ev = loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::PingTimeout {
                break ev;
            }
        };
        assert_eq!(timeout_ev.timeout_ms, Some(100));
        assert!(timeout_ev.reason.as_deref().unwrap_or("").contains("no pong"));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn sends_only_one_ping_while_pong_is_outstanding() {
        let pair = LocalPair::new();
        let _hb = Heartbeat::new(pair.left.clone(), &ping_config(100, 300), Bus::new(16)).unwrap();
        let sent = collect_right(&pair);

        pair.left.connect().await.unwrap();
        time::sleep(Duration::from_millis(250)).await;

        let frames = sent.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0], json!("ping"));
        drop(frames);
        assert!(pair.left.connected(), "timeout has not elapsed yet");
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn checks_ping_argument_format() {
        for bad in [json!(["ping"]), json!(["ping", "abc"]), json!(["ping", []])] {
            let pair = LocalPair::new();
            let _hb =
                Heartbeat::new(pair.left.clone(), &Config::default(), Bus::new(16)).unwrap();
            let sent = collect_right(&pair);

            pair.left.connect().await.unwrap();
            settle().await;
            pair.right.send(bad.clone());
            settle().await;

            let text = serde_json::to_string(&bad).unwrap();
            assert_eq!(
                *sent.lock().unwrap(),
                vec![json!(["error", "wrong-format", text])],
                "frame: {bad}"
            );
            assert!(!pair.left.connected());
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn checks_pong_argument_format() {
        for bad in [json!(["pong"]), json!(["pong", "abc"]), json!(["pong", {}])] {
            let pair = LocalPair::new();
            let _hb =
                Heartbeat::new(pair.left.clone(), &Config::default(), Bus::new(16)).unwrap();
            let sent = collect_right(&pair);

            pair.left.connect().await.unwrap();
            settle().await;
            pair.right.send(bad.clone());
            settle().await;

            let text = serde_json::to_string(&bad).unwrap();
            assert_eq!(
                *sent.lock().unwrap(),
                vec![json!(["error", "wrong-format", text])],
                "frame: {bad}"
            );
            assert!(!pair.left.connected());
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn disconnect_disarms_the_timers() {
        let pair = LocalPair::new();
        let _hb = Heartbeat::new(pair.left.clone(), &ping_config(100, 50), Bus::new(16)).unwrap();
        let sent = collect_right(&pair);

        pair.left.connect().await.unwrap();
        settle().await;
        pair.left.disconnect(DisconnectReason::Manual).await;

        time::sleep(Duration::from_secs(1)).await;
        assert!(sent.lock().unwrap().is_empty(), "no ping after disconnect");
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn destroy_leaves_no_armed_timers() {
        let pair = LocalPair::new();
        let hb = Heartbeat::new(pair.left.clone(), &ping_config(100, 50), Bus::new(16)).unwrap();
        let sent = collect_right(&pair);

        pair.left.connect().await.unwrap();
        settle().await;
        hb.destroy();
        hb.destroy(); // idempotent

        time::sleep(Duration::from_secs(1)).await;
        assert!(sent.lock().unwrap().is_empty());
        // The transport itself is untouched; only the watchdog is gone.
        assert!(pair.left.connected());
    }
}
