//! Observability subscribers: the [`Subscribe`] extension point and the
//! [`SubscriberSet`] fan-out that drives it.

mod set;
mod subscribe;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;
