//! # HTTP helpers for retryable requests.
//!
//! Pure functions, no I/O: plug them into an [`Action`](crate::Action) that
//! performs the request with the client of your choice.
//!
//! - [`retry_after_delay`] / [`retry_after_delay_at`]: `Retry-After` header → delay
//! - [`classify`]: status code (+ `Retry-After`) → [`StatusClass`]
//!
//! ```text
//! 2xx                              ─► Success
//! 429 | 503  with Retry-After      ─► Retryable { retry_after: Some(parsed) }
//! 408 | 429 | 5xx                  ─► Retryable { retry_after: None }
//! anything else                    ─► Terminal
//! ```

mod classify;
mod retry_after;

pub use classify::{StatusClass, classify};
pub use retry_after::{
    DEFAULT_RETRY_AFTER, MAX_RETRY_AFTER, RETRY_AFTER_HEADER, retry_after_delay,
    retry_after_delay_at,
};
