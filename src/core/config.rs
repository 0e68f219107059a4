//! # Retry runtime configuration.
//!
//! Provides [`RetryConfig`], the shared defaults of a [`Retrier`](crate::Retrier).
//!
//! Config is used in two ways:
//! 1. **Retrier creation**: `Retrier::builder(config)`
//! 2. **RetryParams defaults**: `RetryParams::with_defaults(&config)`
//!
//! ## Sentinel values
//! - `max_attempts < 0` → unlimited attempts
//! - `deadline = 0s` → no overall deadline
//! - `first_delay = 0s` → the first window is drawn from the backoff sequence

use std::time::Duration;

use crate::core::Delay;
use crate::error::TimerError;
use crate::events::{DEFAULT_BUS_CAPACITY, MIN_BUS_CAPACITY};
use crate::policies::{BackoffPolicy, DEFAULT_BASE_TIMEOUT, DEFAULT_MAX_TIMEOUT, JitterPolicy};

/// Default attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: i64 = 3;

/// Shared configuration for retry runs.
///
/// ## Field semantics
/// - `base_timeout`: bound of the first backoff delay
/// - `max_timeout`: cap on every backoff bound
/// - `jitter`: how delays are drawn from their bound
/// - `first_delay`: fixed first attempt window (`0s` = use the backoff sequence)
/// - `max_attempts`: attempt windows per run (`< 0` = unlimited)
/// - `deadline`: overall time bound per run (`0s` = none)
/// - `bus_capacity`: per-run signal bus ring buffer size (min [`MIN_BUS_CAPACITY`])
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid sprinkling
/// sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Bound of the first backoff delay.
    pub base_timeout: Duration,

    /// Cap on every computed backoff bound.
    pub max_timeout: Duration,

    /// Randomization applied to each bound.
    pub jitter: JitterPolicy,

    /// Fixed length of the first attempt window.
    ///
    /// - `Duration::ZERO` = first window comes from the backoff sequence
    /// - `> 0` = first window is exactly this long
    pub first_delay: Duration,

    /// Number of attempt windows a run may open.
    ///
    /// - `< 0` = unlimited (only the deadline or a success stops the run)
    /// - `0` = exhausted immediately
    pub max_attempts: i64,

    /// Overall deadline of a run.
    ///
    /// - `Duration::ZERO` = no deadline
    /// - `> 0` = the run fails with `DeadlineExceeded` once it elapses
    pub deadline: Duration,

    /// Capacity of each run's signal bus.
    pub bus_capacity: usize,
}

impl RetryConfig {
    /// Builds a config from raw millisecond numbers, as found in external
    /// configuration sources.
    ///
    /// ### Errors
    /// [`TimerError::InvalidTimeout`] when a timeout is not a finite,
    /// non-negative number.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use retryvisor::RetryConfig;
    ///
    /// let cfg = RetryConfig::from_millis(100.0, 1000.0, 5).unwrap();
    /// assert_eq!(cfg.base_timeout, Duration::from_millis(100));
    /// assert!(RetryConfig::from_millis(f64::NAN, 1000.0, 5).is_err());
    /// ```
    pub fn from_millis(
        base_timeout: f64,
        max_timeout: f64,
        max_attempts: i64,
    ) -> Result<Self, TimerError> {
        Ok(Self {
            base_timeout: Delay::Millis(base_timeout).resolve()?,
            max_timeout: Delay::Millis(max_timeout).resolve()?,
            max_attempts,
            ..Self::default()
        })
    }

    /// Backoff policy assembled from `base_timeout`, `max_timeout` and `jitter`.
    #[inline]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            base: self.base_timeout,
            cap: self.max_timeout,
            jitter: self.jitter,
        }
    }

    /// Returns the overall deadline as an `Option`.
    #[inline]
    pub fn default_deadline(&self) -> Option<Duration> {
        if self.deadline == Duration::ZERO {
            None
        } else {
            Some(self.deadline)
        }
    }

    /// Returns the fixed first window as an `Option`.
    #[inline]
    pub fn default_first_delay(&self) -> Option<Duration> {
        if self.first_delay == Duration::ZERO {
            None
        } else {
            Some(self.first_delay)
        }
    }

    /// Returns the bus capacity clamped to [`MIN_BUS_CAPACITY`].
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(MIN_BUS_CAPACITY)
    }
}

impl Default for RetryConfig {
    /// Default configuration:
    ///
    /// - `base_timeout = 1000ms`, `max_timeout = 3000ms`, full jitter
    /// - `first_delay = 0s` (backoff sequence)
    /// - `max_attempts = 3`
    /// - `deadline = 0s` (none)
    /// - `bus_capacity = 64`
    fn default() -> Self {
        Self {
            base_timeout: DEFAULT_BASE_TIMEOUT,
            max_timeout: DEFAULT_MAX_TIMEOUT,
            jitter: JitterPolicy::Full,
            first_delay: Duration::ZERO,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            deadline: Duration::ZERO,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}
