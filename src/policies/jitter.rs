//! # Jitter applied to backoff bounds.
//!
//! [`JitterPolicy`] turns the exponential bound computed by a
//! [`BackoffSequence`](crate::BackoffSequence) into the delay actually waited.
//!
//! - [`JitterPolicy::None`] waits exactly the bound
//! - [`JitterPolicy::Full`] waits uniformly in `[0, bound]` (default)
//! - [`JitterPolicy::Equal`] waits `bound/2 + uniform[0, bound/2]`

use rand::Rng;
use std::time::Duration;

/// Randomization applied to each backoff bound.
///
/// Independent retriers that share the same bound would otherwise wake up
/// together; jitter spreads them across the window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Exact bound, no randomness. Useful for deterministic pacing and tests.
    None,

    /// Uniform delay in `[0, bound]` ("Full Jitter").
    #[default]
    Full,

    /// `bound/2 + uniform[0, bound/2]`; keeps at least half of the bound.
    Equal,
}

impl JitterPolicy {
    /// Applies the policy to `bound`, at millisecond granularity.
    pub fn apply(&self, bound: Duration) -> Duration {
        let ms = bound.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        match self {
            JitterPolicy::None => bound,
            JitterPolicy::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                let extra = if half == 0 {
                    0
                } else {
                    rand::rng().random_range(0..=half)
                };
                Duration::from_millis(half + extra)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_returns_bound() {
        let bound = Duration::from_millis(750);
        assert_eq!(JitterPolicy::None.apply(bound), bound);
    }

    #[test]
    fn test_zero_bound_is_zero() {
        for policy in [JitterPolicy::None, JitterPolicy::Full, JitterPolicy::Equal] {
            assert_eq!(policy.apply(Duration::ZERO), Duration::ZERO);
        }
    }

    #[test]
    fn test_full_within_bound() {
        let bound = Duration::from_millis(400);
        for _ in 0..200 {
            assert!(JitterPolicy::Full.apply(bound) <= bound);
        }
    }

    #[test]
    fn test_equal_keeps_half() {
        let bound = Duration::from_millis(1000);
        for _ in 0..200 {
            let d = JitterPolicy::Equal.apply(bound);
            assert!(d >= Duration::from_millis(500), "{d:?} below half");
            assert!(d <= bound, "{d:?} above bound");
        }
    }

    #[test]
    fn test_default_is_full() {
        assert_eq!(JitterPolicy::default(), JitterPolicy::Full);
    }
}
