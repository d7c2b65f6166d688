//! # Backoff policy for reconnect delays.
//!
//! [`BackoffPolicy`] is a pure function from a consecutive-attempt count to a
//! delay. The base delay doubles per attempt (`min_delay × 2^attempts`) and a
//! randomized deviation is added so that many clients losing the same server
//! do not retry in lockstep. The result is capped at
//! [`BackoffPolicy::max_delay`].
//!
//! One uniform draw `r ∈ [0, 1)` drives both the deviation magnitude and the
//! sign flip: `deviation = ⌊r × 0.5 × base⌋`, negated when `⌊r × 10⌋ == 1`.
//! The shared draw makes shorter-than-base delays rare (one decile) while
//! keeping the policy a single-sample function. This coupling is part of the
//! wire-compatible behavior and must not be split into independent draws.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use linkvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy {
//!     min_delay: Duration::from_millis(1000),
//!     max_delay: Duration::from_millis(5000),
//! };
//!
//! for attempt in 0..20 {
//!     let delay = backoff.next(attempt);
//!     assert!(delay <= Duration::from_millis(5000));
//! }
//! ```

use std::time::Duration;

use rand::Rng;

/// Reconnect backoff policy.
///
/// Encapsulates the two durations that bound every computed delay:
/// - [`BackoffPolicy::min_delay`] — base delay for attempt 0;
/// - [`BackoffPolicy::max_delay`] — hard ceiling for every delay.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Base delay; doubled for each consecutive failed attempt.
    pub min_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    /// Returns the wire-compatible defaults: `min_delay = 1s`, `max_delay = 5s`.
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given consecutive-attempt count (0-indexed).
    ///
    /// The result is always within `[0, max_delay]`. It is mostly increasing
    /// as `attempts` grows, occasionally shorter than the base (roughly one
    /// draw in ten), and capped at `max_delay`.
    pub fn next(&self, attempts: u32) -> Duration {
        self.next_with(rand::rng().random::<f64>(), attempts)
    }

    /// Deterministic core of [`next`](Self::next): the caller supplies the
    /// uniform draw `r ∈ [0, 1)`.
    ///
    /// `2^attempts` overflows `f64` for very large counts; the NaN that can
    /// arise from `∞ + (-∞)` collapses to 0, everything else is clamped to
    /// `[0, max_delay]`.
    fn next_with(&self, r: f64, attempts: u32) -> Duration {
        let max = self.max_delay.as_millis() as f64;
        let exp = attempts.min(i32::MAX as u32) as i32;
        let base = self.min_delay.as_millis() as f64 * 2f64.powi(exp);

        let mut deviation = (r * 0.5 * base).floor();
        if (r * 10.0).floor() as i64 == 1 {
            deviation = -deviation;
        }

        let delay = base + deviation;
        let delay = if delay.is_nan() { 0.0 } else { delay.min(max) };
        Duration::from_millis(delay.max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }

    #[test]
    fn zero_draw_returns_exact_base() {
        let p = policy();
        assert_eq!(p.next_with(0.0, 0), Duration::from_millis(1000));
        assert_eq!(p.next_with(0.0, 1), Duration::from_millis(2000));
        assert_eq!(p.next_with(0.0, 2), Duration::from_millis(4000));
        assert_eq!(p.next_with(0.0, 3), Duration::from_millis(5000));
    }

    #[test]
    fn deviation_is_half_base_at_most() {
        let p = BackoffPolicy {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(60_000),
        };
        // r just below 1.0: deviation approaches base/2 from below.
        let delay = p.next_with(0.999, 0);
        assert_eq!(delay, Duration::from_millis(1499));
    }

    #[test]
    fn second_decile_negates_deviation() {
        // floor(r * 10) == 1 for r in [0.1, 0.2): the same draw flips the sign.
        let p = BackoffPolicy {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(60_000),
        };
        // r = 0.15: deviation = floor(0.15 * 500) = 75, negated.
        assert_eq!(p.next_with(0.15, 0), Duration::from_millis(925));
        // r = 0.25 sits outside the decile: deviation stays positive.
        assert_eq!(p.next_with(0.25, 0), Duration::from_millis(1125));
    }

    #[test]
    fn random_draws_stay_within_bounds() {
        let p = policy();
        for attempts in 0..16 {
            for _ in 0..200 {
                let delay = p.next(attempts);
                assert!(
                    delay <= p.max_delay,
                    "attempts {attempts}: delay {delay:?} above cap"
                );
            }
        }
    }

    #[test]
    fn grows_until_capped() {
        let p = policy();
        // With a zero draw the sequence is exactly base doubling, then flat.
        let mut prev = Duration::ZERO;
        for attempts in 0..10 {
            let delay = p.next_with(0.0, attempts);
            assert!(delay >= prev, "attempts {attempts} shrank: {delay:?}");
            prev = delay;
        }
        assert_eq!(prev, p.max_delay);
    }

    #[test]
    fn huge_attempt_count_clamps_to_max() {
        let p = policy();
        assert_eq!(p.next_with(0.5, 100), p.max_delay);
        assert_eq!(p.next_with(0.5, u32::MAX), p.max_delay);
    }

    #[test]
    fn overflow_with_negated_deviation_collapses_to_zero() {
        // base = ∞ and deviation = -∞ produce NaN, which maps to 0 rather
        // than poisoning the timer arithmetic.
        let p = policy();
        assert_eq!(p.next_with(0.15, 4000), Duration::ZERO);
    }
}
