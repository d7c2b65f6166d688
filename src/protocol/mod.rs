//! Control-protocol wire format: frame builders and the inbound classifier.

pub mod frame;

pub use frame::{Frame, FrameError, RawFrame, FATAL_ERRORS, WRONG_FORMAT};
