//! Error types used by the retry runtime and by actions.
//!
//! - [`TimerError`]: raised synchronously when a delay cannot be scheduled.
//! - [`AttemptError`]: outcome of one failed action attempt.
//! - [`RetryError`]: what crosses the orchestrator boundary.
//!
//! Every type provides `as_label` (stable snake_case for logs/metrics) and
//! `as_message` helpers.

use std::time::Duration;
use thiserror::Error;

use crate::core::Delay;

/// # Errors produced while scheduling a timer.
///
/// A malformed delay is a configuration error: it is never retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum TimerError {
    /// The resolved delay is not a finite, non-negative number of milliseconds.
    #[error("unexpected timeout value: {value}")]
    InvalidTimeout {
        /// Offending value, in milliseconds.
        value: f64,
    },
}

impl TimerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use retryvisor::TimerError;
    ///
    /// let err = TimerError::InvalidTimeout { value: f64::NAN };
    /// assert_eq!(err.as_label(), "timer_invalid_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TimerError::InvalidTimeout { .. } => "timer_invalid_timeout",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TimerError::InvalidTimeout { value } => format!("invalid timeout: {value}ms"),
        }
    }
}

/// # Failure of a single action attempt.
///
/// The action decides how its failure is classified; the payload (for example
/// a rejected HTTP response) is handed back to the caller when the failure
/// ends the run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AttemptError<E> {
    /// Transient failure: the engine opens another attempt window.
    ///
    /// `retry_after` overrides the computed backoff for the next window only.
    #[error("attempt failed (retryable): {payload:?}")]
    Retryable {
        /// Failure payload.
        payload: E,
        /// Explicit delay before the next attempt, if the action knows one.
        retry_after: Option<Delay>,
    },

    /// Non-retryable failure: the run stops and reports it.
    #[error("attempt failed (terminal): {payload:?}")]
    Terminal {
        /// Failure payload.
        payload: E,
    },
}

impl<E> AttemptError<E> {
    /// Retryable failure without a delay override.
    pub fn retryable(payload: E) -> Self {
        AttemptError::Retryable {
            payload,
            retry_after: None,
        }
    }

    /// Retryable failure that asks for an explicit delay before the next attempt.
    pub fn retry_after(payload: E, delay: impl Into<Delay>) -> Self {
        AttemptError::Retryable {
            payload,
            retry_after: Some(delay.into()),
        }
    }

    /// Terminal failure.
    pub fn terminal(payload: E) -> Self {
        AttemptError::Terminal { payload }
    }

    /// Indicates whether the engine should keep going after this failure.
    ///
    /// # Example
    /// ```
    /// use retryvisor::AttemptError;
    ///
    /// assert!(AttemptError::retryable("503").is_retryable());
    /// assert!(!AttemptError::terminal("404").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Retryable { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AttemptError::Retryable { .. } => "attempt_retryable",
            AttemptError::Terminal { .. } => "attempt_terminal",
        }
    }

    /// Borrows the failure payload.
    pub fn payload(&self) -> &E {
        match self {
            AttemptError::Retryable { payload, .. } | AttemptError::Terminal { payload } => {
                payload
            }
        }
    }

    /// Consumes the error and returns the failure payload.
    pub fn into_payload(self) -> E {
        match self {
            AttemptError::Retryable { payload, .. } | AttemptError::Terminal { payload } => {
                payload
            }
        }
    }
}

/// # Errors surfaced by a retry run.
///
/// Transient failures never appear here; only the outcomes that end a run do.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// A delay could not be scheduled (fatal configuration error).
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// The action reported a non-retryable failure.
    #[error("action failed: {payload:?}")]
    Terminal {
        /// Failure payload of the last attempt.
        payload: E,
    },

    /// The engine ran out of attempts before any success.
    #[error("unable to complete action: retry limit of {attempts} attempts reached")]
    RetryLimitExceeded {
        /// Number of attempt windows that were opened.
        attempts: u32,
    },

    /// The overall deadline elapsed before any success.
    #[error("unable to complete action: deadline of {deadline:?} exceeded")]
    DeadlineExceeded {
        /// The configured overall deadline.
        deadline: Duration,
    },

    /// The run was cancelled from outside.
    #[error("retry cancelled")]
    Cancelled,
}

impl<E> RetryError<E> {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use retryvisor::RetryError;
    ///
    /// let err: RetryError<()> = RetryError::RetryLimitExceeded { attempts: 3 };
    /// assert_eq!(err.as_label(), "retry_limit_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryError::Timer(e) => e.as_label(),
            RetryError::Terminal { .. } => "retry_action_terminal",
            RetryError::RetryLimitExceeded { .. } => "retry_limit_exceeded",
            RetryError::DeadlineExceeded { .. } => "retry_deadline_exceeded",
            RetryError::Cancelled => "retry_cancelled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RetryError::Timer(e) => e.as_message(),
            RetryError::Terminal { .. } => "action failed with a non-retryable error".to_string(),
            RetryError::RetryLimitExceeded { attempts } => {
                format!("retry limit reached after {attempts} attempts")
            }
            RetryError::DeadlineExceeded { deadline } => {
                format!("deadline exceeded after {deadline:?}")
            }
            RetryError::Cancelled => "retry cancelled".to_string(),
        }
    }

    /// True for the external-cancellation marker.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled)
    }

    /// Returns the terminal failure payload, if the action produced one.
    pub fn into_payload(self) -> Option<E> {
        match self {
            RetryError::Terminal { payload } => Some(payload),
            _ => None,
        }
    }
}
