//! # Example: heartbeat_watchdog
//!
//! A heartbeat watchdog probing an idle link, with a peer that answers one
//! ping and then goes silent.
//!
//! Demonstrates how to:
//! - Configure idle probing via [`Config::ping`] and [`Config::timeout`].
//! - Watch [`EventKind::PingSent`] / [`EventKind::PingTimeout`] on the bus.
//! - See the watchdog close a dead link with reason `Timeout`.
//!
//! ## Flow
//! ```text
//! LocalPair ──► Heartbeat::new()
//!     ├─► connect()
//!     ├─► idle 200ms ──► send ["ping", ts] ──► peer answers ["pong", ts]
//!     ├─► idle 200ms ──► send ["ping", ts] ──► peer stays silent
//!     │     └─► 100ms later: Bus.publish(PingTimeout), disconnect(Timeout)
//!     └─► destroy()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example heartbeat_watchdog
//! ```

use std::time::Duration;

use linkvisor::{Bus, Config, Connection, Heartbeat, LinkEvent, LocalPair};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Probe after 200ms of silence, give the peer 100ms to answer.
    let cfg = Config {
        ping: Some(Duration::from_millis(200)),
        timeout: Duration::from_millis(100),
        ..Config::default()
    };

    let events = Bus::new(64);
    let mut rx = events.subscribe();

    let pair = LocalPair::new();
    let watchdog = Heartbeat::new(pair.left.clone(), &cfg, events.clone())?;

    // 2. The right end answers exactly one ping, then goes silent.
    let right = pair.right.clone();
    tokio::spawn(async move {
        let mut frames = right.events();
        let mut answered = false;
        while let Ok(ev) = frames.recv().await {
            if let LinkEvent::Message(frame) = ev {
                if !answered && frame[0] == "ping" {
                    answered = true;
                    right.send(serde_json::json!(["pong", frame[1].clone()]));
                }
            }
        }
    });

    pair.left.connect().await?;

    // 3. Watch the watchdog work: ping, pong, ping, silence, timeout.
    tokio::spawn(async move {
        while let Ok(ev) = rx.recv().await {
            println!("[event] {:?}", ev.kind);
        }
    });

    tokio::time::sleep(Duration::from_millis(800)).await;
    println!("connected: {}", pair.left.connected());

    watchdog.destroy();
    Ok(())
}
