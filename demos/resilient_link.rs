//! # Example: resilient_link
//!
//! A supervised in-process link that survives a simulated transport fault.
//!
//! Demonstrates how to:
//! - Wrap a [`Connection`] in a [`Reconnect`] supervisor.
//! - Observe resilience events ([`EventKind::ConnectScheduled`], ...) from the bus.
//! - Tear everything down with `destroy()`.
//!
//! ## Flow
//! ```text
//! LocalPair ──► Reconnect::new()
//!     ├─► connect()
//!     ├─► transport fault (disconnect with reason Error)
//!     │     └─► Bus.publish(ConnectScheduled { delay, attempt })
//!     ├─► backoff timer fires ──► connect() again
//!     └─► destroy()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example resilient_link
//! ```

use std::sync::Arc;
use std::time::Duration;

use linkvisor::{Bus, Config, Connection, DisconnectReason, EventKind, LocalPair, Reconnect};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Short delays so the demo finishes quickly.
    let cfg = Config {
        min_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(500),
        ..Config::default()
    };

    let events = Bus::new(64);
    let mut rx = events.subscribe();

    // 2. Wrap the left end of an in-process pair.
    let pair = LocalPair::new();
    let link = Arc::new(Reconnect::new(pair.left.clone(), &cfg, events.clone()));

    // 3. Print resilience events in the background.
    let printer = tokio::spawn(async move {
        while let Ok(ev) = rx.recv().await {
            match ev.kind {
                EventKind::ConnectScheduled => println!(
                    "[event] retry in {}ms (attempt {})",
                    ev.delay_ms.unwrap_or(0),
                    ev.attempt.unwrap_or(0)
                ),
                kind => println!("[event] {kind:?}"),
            }
        }
    });

    link.connect().await?;
    println!("connected: {}", link.connected());

    // 4. Simulate a transport fault; Error is transient, so a retry is armed.
    pair.left.disconnect(DisconnectReason::Error).await;
    println!("connected after fault: {}", link.connected());

    // 5. Wait past the backoff window; the supervisor re-established the link.
    tokio::time::sleep(Duration::from_millis(700)).await;
    println!("connected after backoff: {}", link.connected());

    link.destroy().await;
    printer.abort();
    Ok(())
}
