//! Backoff and jitter policies.
//!
//! This module groups the knobs that control **how long** a retry engine waits
//! between attempt windows.
//!
//! ## Contents
//! - [`BackoffPolicy`]   recipe: base / cap / jitter
//! - [`BackoffSequence`] stateful generator owned by one engine
//! - [`JitterPolicy`]    randomization strategy to avoid thundering herd
//!
//! ## Quick wiring
//! ```text
//! RetryParams { backoff: BackoffPolicy, first_delay, max_attempts, deadline }
//!      └─► core::engine::RetryEngine owns backoff.sequence()
//!           - sequence.next() at every timer schedule
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → base=1000ms, cap=3000ms, jitter=Full.

mod backoff;
mod jitter;

pub use backoff::{BackoffPolicy, BackoffSequence, DEFAULT_BASE_TIMEOUT, DEFAULT_MAX_TIMEOUT};
pub use jitter::JitterPolicy;
