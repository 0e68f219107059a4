//! # Closure-backed action (`ActionFn`)
//!
//! [`ActionFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per attempt. State shared between attempts must be made
//! explicit with `Arc<...>` inside the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use retryvisor::{ActionFn, ActionRef, AttemptError};
//!
//! let a: ActionRef<u32, String> = ActionFn::arc("answer", |_ctx: CancellationToken| async {
//!     Ok::<_, AttemptError<String>>(42)
//! });
//! assert_eq!(a.name(), "answer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::actions::action::{Action, BoxActionFuture};
use crate::error::AttemptError;

/// Function-backed action implementation.
#[derive(Debug)]
pub struct ActionFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ActionFn<F> {
    /// Creates a new function-backed action.
    ///
    /// Prefer [`ActionFn::arc`] when you immediately need an [`ActionRef`](crate::ActionRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the action and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut, T, E> Action for ActionFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, AttemptError<E>>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    fn name(&self) -> &str {
        &self.name
    }

    fn attempt(&self, ctx: CancellationToken) -> BoxActionFuture<T, E> {
        Box::pin((self.f)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionRef;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_fresh_future_per_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let action: ActionRef<u32, ()> = ActionFn::arc("count", move |_ctx: CancellationToken| {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, AttemptError<()>>(n) }
        });

        assert_eq!(action.attempt(CancellationToken::new()).await.ok(), Some(1));
        assert_eq!(action.attempt(CancellationToken::new()).await.ok(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_attempt_sees_its_token() {
        let action = ActionFn::new("watch", |ctx: CancellationToken| async move {
            if ctx.is_cancelled() {
                Err(AttemptError::terminal("cancelled"))
            } else {
                Ok(())
            }
        });
        let token = CancellationToken::new();
        token.cancel();
        let err = action.attempt(token).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(action.name(), "watch");
    }
}
