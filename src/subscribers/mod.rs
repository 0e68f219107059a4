//! # Signal subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`] (feature `logging`).
//!
//! ## Architecture
//! ```text
//! run ── publish(Signal) ──► SignalBus ──► per-run listener ──► SubscriberSet::emit
//!                                                                   │
//!                                                     ┌─────────────┼─────────┐
//!                                                     ▼             ▼         ▼
//!                                                  LogWriter     Metrics    Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
