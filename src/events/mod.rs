//! Signals: types and the per-run bus.
//!
//! This module groups the signal **data model** and the **bus** used to relay
//! signals between the components of one retry run.
//!
//! ## Contents
//! - [`SignalKind`], [`Signal`], [`ScopeId`] classification, payload and addressing
//! - [`SignalBus`], [`Subscription`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Orchestrator` (terminate, reschedule), `RetryEngine`
//!   (started, next-iteration, exhausted, failed), timers (elapsed, deadline terminate).
//! - **Consumers**: `RetryEngine`, `Orchestrator`, and the `Retrier` listener
//!   that forwards every signal to the `SubscriberSet`.

mod bus;
mod signal;

pub use bus::{DEFAULT_BUS_CAPACITY, MIN_BUS_CAPACITY, SignalBus, Subscription};
pub use signal::{ScopeId, Signal, SignalKind};
