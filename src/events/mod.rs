//! Event plumbing: the broadcast [`Bus`] and the observability [`Event`]
//! model shared by the supervisor and the watchdog.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
