//! # Per-run retry parameters.
//!
//! [`RetryParams`] describes how one run paces and bounds its attempts. It can
//! be created:
//! - **Explicitly** with [`RetryParams::new`] and the `with_*` setters
//! - **From config** with [`RetryParams::with_defaults`]

use std::time::Duration;

use crate::core::RetryConfig;
use crate::policies::BackoffPolicy;

/// Parameters of a single retry run.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use retryvisor::{BackoffPolicy, RetryConfig, RetryParams};
///
/// let params = RetryParams::new(BackoffPolicy::default(), 5)
///     .with_deadline(Some(Duration::from_secs(10)));
/// assert_eq!(params.max_attempts(), 5);
///
/// let from_cfg = RetryParams::with_defaults(&RetryConfig::default());
/// assert!(from_cfg.deadline().is_none());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct RetryParams {
    backoff: BackoffPolicy,
    first_delay: Option<Duration>,
    max_attempts: i64,
    deadline: Option<Duration>,
}

impl RetryParams {
    /// Creates parameters with no deadline and a backoff-drawn first window.
    ///
    /// ### Parameters
    /// - `backoff`: pacing of attempt windows
    /// - `max_attempts`: windows per run (`< 0` = unlimited)
    pub fn new(backoff: BackoffPolicy, max_attempts: i64) -> Self {
        Self {
            backoff,
            first_delay: None,
            max_attempts,
            deadline: None,
        }
    }

    /// Creates parameters inheriting the config defaults.
    pub fn with_defaults(cfg: &RetryConfig) -> Self {
        Self {
            backoff: cfg.backoff(),
            first_delay: cfg.default_first_delay(),
            max_attempts: cfg.max_attempts,
            deadline: cfg.default_deadline(),
        }
    }

    /// Returns the backoff policy.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Returns the fixed first window, if configured.
    pub fn first_delay(&self) -> Option<Duration> {
        self.first_delay
    }

    /// Returns the attempt budget (`< 0` = unlimited).
    pub fn max_attempts(&self) -> i64 {
        self.max_attempts
    }

    /// Returns the overall deadline, if configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// True when only a success, the deadline or cancellation can end the run.
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts < 0
    }

    /// True when attempt `n` (1-based) fits the budget.
    #[inline]
    pub fn allows(&self, n: u32) -> bool {
        self.is_unbounded() || i64::from(n) <= self.max_attempts
    }

    /// Returns new parameters with an updated backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns new parameters with an updated first window.
    pub fn with_first_delay(mut self, first_delay: Option<Duration>) -> Self {
        self.first_delay = first_delay;
        self
    }

    /// Returns new parameters with an updated attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: i64) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns new parameters with an updated deadline.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

impl Default for RetryParams {
    fn default() -> Self {
        Self::with_defaults(&RetryConfig::default())
    }
}
