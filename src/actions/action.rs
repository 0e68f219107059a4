//! # Action abstraction.
//!
//! An [`Action`] produces a fresh attempt future per call. Each attempt gets
//! its own [`CancellationToken`]; the token is cancelled when the attempt is
//! superseded by the next window or when the whole run ends.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::AttemptError;

/// Boxed future returned by [`Action::attempt`].
pub type BoxActionFuture<T, E> =
    Pin<Box<dyn Future<Output = Result<T, AttemptError<E>>> + Send + 'static>>;

/// Shared handle to an action.
pub type ActionRef<T, E> = Arc<dyn Action<Output = T, Error = E>>;

/// # Asynchronous, cancellable, retryable operation.
///
/// Every call to [`attempt`](Action::attempt) starts an independent attempt.
/// Failures are classified by the action itself:
/// [`AttemptError::Retryable`] waits for the next window,
/// [`AttemptError::Terminal`] ends the run.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use retryvisor::{Action, AttemptError, BoxActionFuture};
///
/// struct Ping;
///
/// impl Action for Ping {
///     type Output = &'static str;
///     type Error = String;
///
///     fn name(&self) -> &str { "ping" }
///
///     fn attempt(&self, ctx: CancellationToken) -> BoxActionFuture<&'static str, String> {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Err(AttemptError::terminal("cancelled".to_string()));
///             }
///             Ok("pong")
///         })
///     }
/// }
/// ```
pub trait Action: Send + Sync + 'static {
    /// Value of a successful attempt.
    type Output: Send + 'static;
    /// Payload of a failed attempt.
    type Error: Send + 'static;

    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Starts one attempt.
    ///
    /// Implementations should watch `ctx` and stop promptly once it is
    /// cancelled; the result of a superseded attempt is discarded.
    fn attempt(&self, ctx: CancellationToken) -> BoxActionFuture<Self::Output, Self::Error>;
}
