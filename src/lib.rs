//! # retryvisor
//!
//! **Retryvisor** runs async actions under a cancellable, bounded retry
//! schedule with exponential full-jitter backoff.
//!
//! Each run is a small set of cooperating components that talk only through a
//! per-run signal bus: an orchestrator starting attempts, an engine opening
//! attempt windows, and single-shot timers backing each window.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            ┌──────────────────────────────┐
//!            │ Retrier (shared config, subs)│
//!            └──────────────┬───────────────┘
//!                           ▼ one per run
//! ┌───────────────────────────────────────────────────────────────┐
//! │ SignalBus (broadcast, scoped)                                 │
//! │                                                               │
//! │   Orchestrator ◄──── Started / NextIteration ──── RetryEngine │
//! │        │       ◄──── Exhausted / Failed ─────────      │      │
//! │        ├──── Terminate / Reschedule ────────────►      │      │
//! │        ▼                                                ▼      │
//! │   Action::attempt(child token)           Timer (window), Timer │
//! │                                          (deadline) ─► Elapsed │
//! └───────────────────────────┬───────────────────────────────────┘
//!                             ▼
//!               listener ─► SubscriberSet ─► LogWriter / custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! engine.start ─► window #1 + Started ─► attempt #1
//!
//! loop {
//!   attempt Ok           ─► Terminate engine ─► Ok(payload)
//!   attempt Terminal     ─► Terminate engine ─► Err(Terminal)
//!   attempt Retryable    ─► (Reschedule if the action asked for a delay)
//!   window elapsed       ─► budget left? ─► NextIteration ─► cancel attempt, start next
//!                                      └─► Exhausted     ─► Err(RetryLimitExceeded)
//!   deadline elapsed     ─► Failed ─► Err(DeadlineExceeded)
//!   token cancelled      ─► Err(Cancelled)
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                          | Key types / traits                          |
//! |-------------------|------------------------------------------------------|---------------------------------------------|
//! | **Actions**       | Cancellable attempts as trait objects or closures.   | [`Action`], [`ActionFn`], [`ActionRef`]     |
//! | **Scheduling**    | Attempt windows, timers, deadlines.                  | [`RetryEngine`], [`Timer`], [`Orchestrator`]|
//! | **Policies**      | Exponential backoff with jitter.                     | [`BackoffPolicy`], [`JitterPolicy`]         |
//! | **Signals**       | Per-run bus with scoped addressing.                  | [`SignalBus`], [`Signal`], [`SignalKind`]   |
//! | **Subscribers**   | Observe every run without slowing it down.           | [`Subscribe`], [`SubscriberSet`]            |
//! | **Errors**        | Typed outcomes of attempts and runs.                 | [`AttemptError`], [`RetryError`]            |
//! | **Configuration** | Shared defaults and per-run parameters.              | [`RetryConfig`], [`RetryParams`]            |
//! | **HTTP**          | Status classification and `Retry-After` parsing.     | [`http::classify`]                          |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber (renders signals via `tracing`).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use retryvisor::{ActionFn, AttemptError, RetryConfig, Retrier};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = RetryConfig {
//!         base_timeout: Duration::from_millis(20),
//!         max_timeout: Duration::from_millis(100),
//!         max_attempts: 5,
//!         ..RetryConfig::default()
//!     };
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn retryvisor::Subscribe>> = vec![Arc::new(retryvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn retryvisor::Subscribe>> = Vec::new();
//!
//!     let retrier = Retrier::builder(cfg).with_subscribers(subs).build();
//!
//!     let calls = Arc::new(AtomicU32::new(0));
//!     let c = Arc::clone(&calls);
//!     let flaky = ActionFn::new("flaky", move |_ctx: CancellationToken| {
//!         let n = c.fetch_add(1, Ordering::SeqCst) + 1;
//!         async move {
//!             if n < 2 {
//!                 Err(AttemptError::retryable("not yet"))
//!             } else {
//!                 Ok(n)
//!             }
//!         }
//!     });
//!
//!     let value = retrier.run(&flaky).await?;
//!     assert_eq!(value, 2);
//!     retrier.shutdown().await;
//!     Ok(())
//! }
//! ```
mod actions;
mod core;
mod error;
mod events;
pub mod http;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use crate::actions::{Action, ActionFn, ActionRef, BoxActionFuture};
pub use crate::core::{
    DEFAULT_MAX_ATTEMPTS, Delay, EngineExit, EngineState, Orchestrator, Retrier, RetrierBuilder,
    RetryConfig, RetryContext, RetryEngine, RetryParams, Timer, TimerState,
};
pub use crate::error::{AttemptError, RetryError, TimerError};
pub use crate::events::{
    DEFAULT_BUS_CAPACITY, MIN_BUS_CAPACITY, ScopeId, Signal, SignalBus, SignalKind, Subscription,
};
pub use crate::policies::{
    BackoffPolicy, BackoffSequence, DEFAULT_BASE_TIMEOUT, DEFAULT_MAX_TIMEOUT, JitterPolicy,
};
pub use crate::subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in `tracing` subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use crate::subscribers::LogWriter;
