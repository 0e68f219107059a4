//! # Retryable actions.
//!
//! This module provides the action-related types:
//! - [`Action`] - trait for one cancellable attempt of a retryable operation
//! - [`ActionFn`] - closure-backed action implementation
//! - [`ActionRef`] - shared reference to an action (`Arc<dyn Action>`)

mod action;
mod action_fn;

pub use action::{Action, ActionRef, BoxActionFuture};
pub use action_fn::ActionFn;
