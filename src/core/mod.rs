//! Runtime core: timers, engine and orchestration.
//!
//! Internal modules:
//! - [`timer`]: single-shot cancellable timer;
//! - [`engine`]: bounded sequence of attempt windows driven by timers;
//! - [`orchestrator`]: runs one action through an engine;
//! - [`retrier`]: shared configuration, subscribers and per-run wiring;
//! - [`config`] / [`params`]: shared defaults and per-run parameters.

mod builder;
mod config;
mod engine;
mod orchestrator;
mod params;
mod retrier;
mod timer;

pub use builder::RetrierBuilder;
pub use config::{DEFAULT_MAX_ATTEMPTS, RetryConfig};
pub use engine::{EngineExit, EngineState, RetryContext, RetryEngine};
pub use orchestrator::Orchestrator;
pub use params::RetryParams;
pub use retrier::Retrier;
pub use timer::{Delay, Timer, TimerState};
