//! # linkvisor
//!
//! **Linkvisor** is a connection resilience library for Rust.
//!
//! It wraps any message-oriented duplex link behind the [`Connection`] trait
//! and keeps it alive: a reconnect supervisor re-arms the link after
//! transient failures with capped, jittered exponential backoff, and a
//! heartbeat watchdog detects silently dead links with a ping/pong exchange.
//! The crate is designed as a building block for synchronization clients and
//! other long-lived protocol nodes.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!               ┌─────────────────────────────┐
//!               │  node / application code    │
//!               └──────┬──────────────┬───────┘
//!                      │ send()       │ send()
//!                      ▼              ▼
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │ Reconnect (supervisor)   │  │ Heartbeat (watchdog)     │
//! │ - classifies disconnects │  │ - idle ping timer        │
//! │ - capped backoff timer   │  │ - pong timeout timer     │
//! │ - environment wake/freeze│  │ - wrong-format guard     │
//! └──────┬───────────────────┘  └──────┬───────────────────┘
//!        │ Connection trait            │ Connection trait
//!        ▼                             ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  transport (any Connection impl; LocalPair for tests)     │
//! │  events(): Connecting / Connect / Disconnect / Message    │
//! └───────────────────────────────────────────────────────────┘
//!
//!        │ publish Events:                │ publish Events:
//!        │ - ConnectScheduled             │ - PingSent
//!        │ - RetriesExhausted             │ - PingTimeout
//!        │ - FatalProtocol                │ - WrongFormat
//!        ▼                                ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Bus<Event> (broadcast channel)           │
//! └─────────────────────────────┬─────────────────────────────┘
//!                               ▼
//!                         SubscriberSet
//!                        (per-sub queues)
//!                     ┌─────────┼─────────┐
//!                     ▼         ▼         ▼
//!                  worker1   worker2   workerN
//!                     ▼         ▼         ▼
//!                 sub1.on_  sub2.on_  subN.on_
//!                  event()   event()   event()
//! ```
//!
//! ### Retry lifecycle
//! ```text
//! connect() ──► attempts += 1, reconnecting = true ──► transport connect
//!
//! on Disconnect (while reconnecting) {
//!   ├─► attempts >= limit ─► publish RetriesExhausted, go idle
//!   ├─► delay = backoff.next(attempts)       (base 2^n, ±50% jitter, capped)
//!   ├─► publish ConnectScheduled{ delay, attempt }
//!   └─► arm single timer ─► re-check guards ─► connect()
//! }
//!
//! on Connect            ─► attempts = 0
//! on ["error", fatal]   ─► reconnecting = false      (incompatible peer)
//! on environment wake   ─► connect() immediately     (skip backoff)
//! on environment freeze ─► disconnect(Freeze)        (transient, stays armed)
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                       |
//! |-------------------|--------------------------------------------------------------------|------------------------------------------|
//! | **Transport API** | Plug in any duplex message link.                                   | [`Connection`], [`LinkEvent`]            |
//! | **Supervision**   | Automatic reconnection with backoff, retry budget, fatal handling. | [`Reconnect`], [`BackoffPolicy`]         |
//! | **Liveness**      | Ping/pong watchdog over idle links.                                | [`Heartbeat`]                            |
//! | **Environment**   | React to host wake/freeze/online signals.                          | [`Environment`], [`ManualEnvironment`]   |
//! | **Subscriber API**| Hook into resilience events (logging, metrics, custom subscribers).| [`Subscribe`], [`SubscriberSet`]         |
//! | **Errors**        | Typed errors for configuration and link failures.                  | [`LinkError`]                            |
//! | **Configuration** | Centralize delays, budgets, and heartbeat windows.                 | [`Config`]                               |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use linkvisor::{Bus, Config, Connection, Heartbeat, LocalPair, Reconnect};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.ping = Some(Duration::from_secs(10));
//!     cfg.timeout = Duration::from_secs(5);
//!
//!     let events = Bus::new(64);
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn linkvisor::Subscribe>> = {
//!         use linkvisor::LogWriter;
//!         vec![Arc::new(LogWriter)]
//!     };
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn linkvisor::Subscribe>> = Vec::new();
//!     let set = Arc::new(linkvisor::SubscriberSet::new(subs, events.clone()));
//!     linkvisor::SubscriberSet::forward(set, &events);
//!
//!     // An in-process transport; swap in your own Connection impl.
//!     let pair = LocalPair::new();
//!
//!     let link = Arc::new(Reconnect::new(pair.left.clone(), &cfg, events.clone()));
//!     let heartbeat = Heartbeat::new(link.clone() as Arc<dyn Connection>, &cfg, events.clone())?;
//!
//!     link.connect().await?;
//!     heartbeat.send(serde_json::json!(["hello"]));
//!
//!     heartbeat.destroy();
//!     link.destroy().await;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod environment;
mod error;
mod events;
mod heartbeat;
mod pair;
mod policies;
mod protocol;
mod reconnect;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use connection::{Connection, DisconnectReason, LinkEvent};
pub use environment::{EnvSignal, Environment, ManualEnvironment, WakeReason};
pub use error::LinkError;
pub use events::{Bus, Event, EventKind};
pub use heartbeat::Heartbeat;
pub use pair::{LocalConnection, LocalPair};
pub use policies::BackoffPolicy;
pub use protocol::{Frame, FrameError, RawFrame, FATAL_ERRORS, WRONG_FORMAT};
pub use reconnect::Reconnect;
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
