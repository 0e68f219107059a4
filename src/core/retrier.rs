//! # Retrier: shared entry point for retry runs.
//!
//! The [`Retrier`] owns the shared [`RetryConfig`] and a [`SubscriberSet`].
//! Every run gets its own [`SignalBus`], [`RetryEngine`](crate::RetryEngine)
//! and [`Orchestrator`]; nothing is shared between runs except the subscribers.
//!
//! ## High-level architecture
//! ```text
//! run_until_cancelled(action, params, token)
//!   │
//!   ├─► SignalBus::new(cfg.bus_capacity)
//!   ├─► listener: bus.observe() ─► SubscriberSet::emit(&Signal)   (skipped without subscribers)
//!   ├─► Orchestrator::new(bus, params).run(action, token)
//!   │        └─► RetryEngine ─► Timer(s)
//!   └─► drop bus ─► listener drains and exits ─► return outcome
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use retryvisor::{ActionFn, AttemptError, RetryConfig, Retrier};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = RetryConfig {
//!         base_timeout: Duration::from_millis(10),
//!         max_timeout: Duration::from_millis(50),
//!         ..RetryConfig::default()
//!     };
//!     let retrier = Retrier::builder(cfg).build();
//!
//!     let action = ActionFn::new("hello", |_ctx: CancellationToken| async {
//!         Ok::<_, AttemptError<()>>("hi")
//!     });
//!     assert_eq!(retrier.run(&action).await.unwrap(), "hi");
//!     retrier.shutdown().await;
//! }
//! ```

use std::sync::Arc;

use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    actions::Action,
    core::{RetryConfig, RetryParams, builder::RetrierBuilder, orchestrator::Orchestrator},
    error::RetryError,
    events::SignalBus,
    subscribers::SubscriberSet,
};

/// Runs actions under shared configuration and fans their signals out to
/// subscribers.
pub struct Retrier {
    cfg: RetryConfig,
    subs: Arc<SubscriberSet>,
    listeners: TaskTracker,
}

impl Retrier {
    /// Creates a builder for a retrier.
    pub fn builder(cfg: RetryConfig) -> RetrierBuilder {
        RetrierBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: RetryConfig, subs: Arc<SubscriberSet>) -> Self {
        Self {
            cfg,
            subs,
            listeners: TaskTracker::new(),
        }
    }

    /// Shared configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.cfg
    }

    /// Per-run parameters derived from the shared configuration.
    pub fn params(&self) -> RetryParams {
        RetryParams::with_defaults(&self.cfg)
    }

    /// Runs `action` with the configured defaults.
    pub async fn run<A>(&self, action: &A) -> Result<A::Output, RetryError<A::Error>>
    where
        A: Action + ?Sized,
    {
        self.run_with(action, self.params()).await
    }

    /// Runs `action` with explicit parameters.
    pub async fn run_with<A>(
        &self,
        action: &A,
        params: RetryParams,
    ) -> Result<A::Output, RetryError<A::Error>>
    where
        A: Action + ?Sized,
    {
        self.run_until_cancelled(action, params, &CancellationToken::new())
            .await
    }

    /// Runs `action` until it is decided or `token` is cancelled.
    ///
    /// Cancelling `token` cancels the in-flight attempt and every timer and
    /// resolves with [`RetryError::Cancelled`]. Dropping the returned future
    /// has the same effect, without an outcome.
    pub async fn run_until_cancelled<A>(
        &self,
        action: &A,
        params: RetryParams,
        token: &CancellationToken,
    ) -> Result<A::Output, RetryError<A::Error>>
    where
        A: Action + ?Sized,
    {
        let bus = SignalBus::new(self.cfg.bus_capacity_clamped());
        let listener = self.subscriber_listener(&bus);

        let outcome = Orchestrator::new(bus, params).run(action, token).await;

        if let Some(handle) = listener {
            let _ = handle.await;
        }
        outcome
    }

    /// Graceful shutdown: waits until every emitted signal has been handled
    /// by the subscribers.
    ///
    /// Listeners of runs whose futures were dropped keep forwarding until
    /// their bus closes; shutdown waits for them before draining the set.
    pub async fn shutdown(self) {
        self.listeners.close();
        self.listeners.wait().await;
        match Arc::try_unwrap(self.subs) {
            Ok(set) => set.shutdown().await,
            Err(_) => report_shared_subscribers(),
        }
    }

    /// Observes `bus` and forwards its signals to the subscriber set until
    /// the bus closes.
    fn subscriber_listener(&self, bus: &SignalBus) -> Option<tokio::task::JoinHandle<()>> {
        if self.subs.is_empty() {
            return None;
        }
        let mut rx = bus.observe();
        let set = Arc::clone(&self.subs);
        Some(self.listeners.spawn(async move {
            while let Some(sig) = rx.recv().await {
                set.emit(&sig);
            }
        }))
    }
}

#[cfg(feature = "logging")]
fn report_shared_subscribers() {
    tracing::warn!("subscriber set still shared at shutdown; workers not drained");
}

#[cfg(not(feature = "logging"))]
fn report_shared_subscribers() {
    eprintln!("[retryvisor] subscriber set still shared at shutdown; workers not drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionFn;
    use crate::error::AttemptError;
    use crate::events::{Signal, SignalKind};
    use crate::policies::JitterPolicy;
    use crate::subscribers::Subscribe;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Kinds(Mutex<Vec<SignalKind>>);

    #[async_trait]
    impl Subscribe for Kinds {
        async fn on_signal(&self, signal: &Signal) {
            self.0.lock().unwrap().push(signal.kind);
        }
    }

    fn cfg() -> RetryConfig {
        RetryConfig {
            base_timeout: Duration::from_millis(100),
            max_timeout: Duration::from_millis(100),
            jitter: JitterPolicy::None,
            ..RetryConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_whole_run() {
        let kinds = Arc::new(Kinds::default());
        let retrier = Retrier::builder(cfg())
            .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
            .build();

        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let action = ActionFn::new("twice", move |_ctx: CancellationToken| {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 2 {
                    Err(AttemptError::retryable("busy"))
                } else {
                    Ok(n)
                }
            }
        });

        assert_eq!(retrier.run(&action).await.unwrap(), 2);
        retrier.shutdown().await;

        let seen = kinds.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                SignalKind::Started,
                SignalKind::Elapsed,
                SignalKind::NextIteration,
                SignalKind::Terminate,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_are_independent() {
        let retrier = Retrier::builder(cfg()).build();
        let ok = ActionFn::new("ok", |_ctx: CancellationToken| async {
            Ok::<_, AttemptError<()>>(1)
        });
        let never = ActionFn::new("never", |_ctx: CancellationToken| async {
            Err::<u32, _>(AttemptError::retryable(()))
        });

        let (a, b) = tokio::join!(retrier.run(&ok), retrier.run(&never));
        assert_eq!(a.unwrap(), 1);
        assert!(matches!(b, Err(RetryError::RetryLimitExceeded { attempts: 3 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_cancelled() {
        let retrier = Retrier::builder(cfg()).build();
        let never = ActionFn::new("never", |_ctx: CancellationToken| async {
            Err::<(), _>(AttemptError::retryable(()))
        });
        let token = CancellationToken::new();
        token.cancel();

        let params = retrier.params().with_max_attempts(-1);
        let err = retrier
            .run_until_cancelled(&never, params, &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_from_config() {
        let retrier = Retrier::builder(RetryConfig {
            max_attempts: -1,
            deadline: Duration::from_millis(450),
            ..cfg()
        })
        .build();
        let never = ActionFn::new("never", |_ctx: CancellationToken| async {
            Err::<(), _>(AttemptError::retryable(()))
        });

        let err = retrier.run(&never).await.unwrap_err();
        assert_eq!(err.as_label(), "retry_deadline_exceeded");
    }

    struct Slow(Mutex<Vec<SignalKind>>);

    #[async_trait]
    impl Subscribe for Slow {
        async fn on_signal(&self, signal: &Signal) {
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.0.lock().unwrap().push(signal.kind);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_abandoned_run() {
        let slow = Arc::new(Slow(Mutex::new(Vec::new())));
        let retrier = Retrier::builder(cfg())
            .with_subscribers(vec![slow.clone() as Arc<dyn Subscribe>])
            .build();
        let never = ActionFn::new("never", |_ctx: CancellationToken| async {
            Err::<(), _>(AttemptError::retryable(()))
        });

        let abandoned = tokio::time::timeout(Duration::from_millis(50), retrier.run(&never));
        assert!(abandoned.await.is_err());
        assert!(slow.0.lock().unwrap().is_empty());

        retrier.shutdown().await;
        assert_eq!(slow.0.lock().unwrap().first(), Some(&SignalKind::Started));
    }
}
