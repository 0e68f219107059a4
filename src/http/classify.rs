//! Status code classification.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::core::Delay;
use crate::error::AttemptError;
use crate::http::retry_after::retry_after_delay_at;

/// How a response status should steer the retry run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// The request succeeded.
    Success,
    /// Try again; `retry_after` overrides the next window when the server sent one.
    Retryable {
        /// Server-requested delay.
        retry_after: Option<Duration>,
    },
    /// Retrying will not help.
    Terminal,
}

impl StatusClass {
    /// Turns the class into an attempt outcome carrying `response` as payload.
    ///
    /// # Example
    /// ```
    /// use retryvisor::http::StatusClass;
    ///
    /// let res = StatusClass::Terminal.into_attempt("404 body");
    /// assert!(!res.unwrap_err().is_retryable());
    /// ```
    pub fn into_attempt<R>(self, response: R) -> Result<R, AttemptError<R>> {
        match self {
            StatusClass::Success => Ok(response),
            StatusClass::Retryable { retry_after } => Err(AttemptError::Retryable {
                payload: response,
                retry_after: retry_after.map(Delay::Exact),
            }),
            StatusClass::Terminal => Err(AttemptError::terminal(response)),
        }
    }
}

/// Classifies a response by status code and `Retry-After` header.
///
/// 429 and 503 are treated identically: with the header present both request
/// an explicit next window.
pub fn classify(status: u16, retry_after: Option<&str>, now: DateTime<Utc>) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        429 | 503 if retry_after.is_some() => StatusClass::Retryable {
            retry_after: Some(retry_after_delay_at(retry_after, now)),
        },
        408 | 429 | 500..=599 => StatusClass::Retryable { retry_after: None },
        _ => StatusClass::Terminal,
    }
}
