//! # Wire frames for the control protocol.
//!
//! Every frame is a small ordered sequence encoded as a JSON array whose first
//! element is the command name:
//!
//! ```text
//! ["ping", 1693300000000]
//! ["pong", 1693300000000]
//! ["error", "wrong-format", "[\"ping\",\"abc\"]"]
//! ["error", "wrong-protocol", ...]
//! ```
//!
//! [`parse`] classifies an inbound [`RawFrame`] without allocating for the
//! happy path; the numeric argument of ping/pong is kept as a
//! [`serde_json::Number`] so replies echo the peer's value byte-for-byte.

use serde_json::{json, Number, Value};

/// An unparsed wire frame. Always a JSON array on the happy path, but inbound
/// data may be anything — validation happens in [`parse`].
pub type RawFrame = Value;

/// Error code sent back on malformed ping/pong frames.
pub const WRONG_FORMAT: &str = "wrong-format";

/// Error codes indicating permanent incompatibility: retrying against the same
/// peer cannot succeed, so the supervisor stops re-arming on these.
pub const FATAL_ERRORS: [&str; 3] = ["wrong-protocol", "wrong-subprotocol", "wrong-credentials"];

/// A classified inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// `["ping", n]` — liveness probe; must be answered with `["pong", n]`.
    Ping(Number),
    /// `["pong", n]` — answer to an earlier ping.
    Pong(Number),
    /// `["error", code, ...]` — peer-reported error.
    Error {
        /// The error code (second element).
        code: String,
    },
    /// Any other well-formed command frame; opaque to this layer.
    Other,
}

impl Frame {
    /// True when the frame is an error whose code is in [`FATAL_ERRORS`].
    pub fn is_fatal_error(&self) -> bool {
        match self {
            Frame::Error { code } => FATAL_ERRORS.contains(&code.as_str()),
            _ => false,
        }
    }
}

/// Why an inbound frame was rejected.
///
/// Either way the reaction is the same: answer with a `wrong-format` error
/// frame carrying the exact JSON text of the offender, then close the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// Not a JSON array, or the first element is not a string.
    NotACommand,
    /// A ping/pong frame whose argument is missing or not a JSON number.
    BadArgument,
}

/// Classifies an inbound frame.
///
/// Structural rules: the frame must be an array whose first element is a
/// string command. Ping and pong additionally require a JSON-number argument
/// (strings, arrays, objects, and a missing argument are all rejected).
/// Unknown commands are passed through as [`Frame::Other`] — this layer only
/// interprets its own control frames.
pub fn parse(raw: &RawFrame) -> Result<Frame, FrameError> {
    let items = raw.as_array().ok_or(FrameError::NotACommand)?;
    let name = items
        .first()
        .and_then(Value::as_str)
        .ok_or(FrameError::NotACommand)?;

    match name {
        "ping" => number_arg(items).map(Frame::Ping),
        "pong" => number_arg(items).map(Frame::Pong),
        "error" => Ok(Frame::Error {
            code: items
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        _ => Ok(Frame::Other),
    }
}

fn number_arg(items: &[Value]) -> Result<Number, FrameError> {
    match items.get(1) {
        Some(Value::Number(n)) => Ok(n.clone()),
        _ => Err(FrameError::BadArgument),
    }
}

/// Builds a `["ping", ts]` frame.
pub fn ping(ts: u64) -> RawFrame {
    json!(["ping", ts])
}

/// Builds a `["pong", n]` frame echoing the peer's ping argument.
pub fn pong(n: &Number) -> RawFrame {
    json!(["pong", n])
}

/// Builds an `["error", "wrong-format", raw]` frame where `raw` is the exact
/// compact JSON text of the offending frame.
pub fn wrong_format(raw_text: &str) -> RawFrame {
    json!(["error", WRONG_FORMAT, raw_text])
}
