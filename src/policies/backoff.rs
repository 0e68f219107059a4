//! # Exponential backoff with jitter.
//!
//! [`BackoffPolicy`] is the immutable recipe (`base`, `cap`, `jitter`);
//! [`BackoffSequence`] is the stateful generator built from it, one per
//! retry engine.
//!
//! The `k`-th call to [`BackoffSequence::next`] (0-indexed) draws from
//! `[0, min(cap, base × 2^k)]` under the default [`JitterPolicy::Full`].
//! Growth saturates at `cap`; it never wraps.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use retryvisor::{BackoffPolicy, JitterPolicy};
//!
//! let policy = BackoffPolicy {
//!     base: Duration::from_millis(100),
//!     cap: Duration::from_secs(1),
//!     jitter: JitterPolicy::None,
//! };
//! let mut seq = policy.sequence();
//!
//! assert_eq!(seq.next(), Duration::from_millis(100));
//! assert_eq!(seq.next(), Duration::from_millis(200));
//! assert_eq!(seq.next(), Duration::from_millis(400));
//! assert_eq!(seq.next(), Duration::from_millis(800));
//! assert_eq!(seq.next(), Duration::from_secs(1));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Default `base` delay.
pub const DEFAULT_BASE_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default `cap` on the computed bound.
pub const DEFAULT_MAX_TIMEOUT: Duration = Duration::from_millis(3000);

/// Backoff recipe.
///
/// - [`BackoffPolicy::base`]: bound of the first delay;
/// - [`BackoffPolicy::cap`]: ceiling on every bound;
/// - [`BackoffPolicy::jitter`]: how a delay is drawn from its bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Bound of the first delay; doubled on every subsequent call.
    pub base: Duration,
    /// Maximum bound.
    pub cap: Duration,
    /// Randomization applied to each bound.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `base = 1000ms`, `cap = 3000ms`, full jitter.
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_TIMEOUT,
            cap: DEFAULT_MAX_TIMEOUT,
            jitter: JitterPolicy::Full,
        }
    }
}

impl BackoffPolicy {
    /// Starts a fresh sequence at iteration `-1`.
    pub fn sequence(&self) -> BackoffSequence {
        BackoffSequence::new(*self)
    }

    /// Upper bound for the given 0-indexed iteration: `min(cap, base × 2^iteration)`.
    ///
    /// Saturates to `cap` when the multiplication overflows.
    pub fn bound(&self, iteration: u32) -> Duration {
        2u32.checked_pow(iteration)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |d| d.min(self.cap))
    }
}

/// Stateful generator of successive backoff delays.
///
/// Not restartable: build a new one with [`BackoffPolicy::sequence`] to reset.
#[derive(Debug)]
pub struct BackoffSequence {
    policy: BackoffPolicy,
    iteration: i64,
}

impl BackoffSequence {
    /// Creates a sequence that has not produced any delay yet.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            iteration: -1,
        }
    }

    /// Advances the iteration and draws the next delay.
    pub fn next(&mut self) -> Duration {
        self.iteration = self.iteration.saturating_add(1);
        let exp = u32::try_from(self.iteration).unwrap_or(u32::MAX);
        self.policy.jitter.apply(self.policy.bound(exp))
    }

    /// Iteration of the last produced delay (`-1` before the first call).
    pub fn iteration(&self) -> i64 {
        self.iteration
    }

    /// Policy this sequence was built from.
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }
}
