//! # Orchestrator: drives one action through a [`RetryEngine`].
//!
//! Starts an attempt whenever the engine opens a window, classifies every
//! attempt outcome and stops the engine as soon as the run is decided.
//!
//! ## Flow
//! ```text
//! Started / NextIteration ─► cancel running attempt ─► start attempt (child token)
//!
//! attempt Ok(v)                    ─► Terminate(engine) ─► Ok(v)
//! attempt Terminal(p)              ─► Terminate(engine) ─► Err(Terminal{p})
//! attempt Retryable{retry_after}   ─► Reschedule(engine, ms) ─► wait for next window
//! attempt Retryable                ─► wait for next window
//!
//! Exhausted ─► Err(RetryLimitExceeded)
//! Failed    ─► Err(DeadlineExceeded)
//! token     ─► Err(Cancelled)
//! engine terminated by another scope ─► cancel running attempt ─► Err(Cancelled)
//! ```
//!
//! ## Rules
//! - At most **one** attempt is in flight; a new window supersedes the
//!   previous attempt by cancelling its token and dropping its future.
//! - The first decided outcome wins; anything observed afterwards is ignored.
//! - On return the engine, its timers and both subscriptions are dropped.

use std::future::pending;
use std::pin::pin;

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{
    actions::{Action, BoxActionFuture},
    core::{
        RetryParams,
        engine::{EngineExit, RetryEngine},
    },
    error::{AttemptError, RetryError},
    events::{ScopeId, Signal, SignalBus, SignalKind},
};

struct Inflight<T, E> {
    token: CancellationToken,
    fut: BoxActionFuture<T, E>,
}

impl<T, E> Inflight<T, E> {
    fn abort(self) {
        self.token.cancel();
    }
}

async fn poll_inflight<T, E>(slot: &mut Option<Inflight<T, E>>) -> Result<T, AttemptError<E>> {
    match slot {
        Some(a) => a.fut.as_mut().await,
        None => pending().await,
    }
}

/// Runs one action under the pacing and bounds of [`RetryParams`].
pub struct Orchestrator {
    scope: ScopeId,
    bus: SignalBus,
    params: RetryParams,
}

impl Orchestrator {
    /// Creates an orchestrator publishing on `bus`.
    pub fn new(bus: SignalBus, params: RetryParams) -> Self {
        Self {
            scope: bus.scope("orchestrator"),
            bus,
            params,
        }
    }

    /// Scope the orchestrator publishes from.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Runs `action` until it succeeds or the run is decided otherwise.
    ///
    /// ### Errors
    /// - [`RetryError::Terminal`] when an attempt fails with a terminal error
    /// - [`RetryError::RetryLimitExceeded`] when every window elapsed
    /// - [`RetryError::DeadlineExceeded`] when the overall deadline elapsed
    /// - [`RetryError::Cancelled`] when `token` is cancelled
    /// - [`RetryError::Timer`] when a window could not be scheduled
    pub async fn run<A>(
        self,
        action: &A,
        token: &CancellationToken,
    ) -> Result<A::Output, RetryError<A::Error>>
    where
        A: Action + ?Sized,
    {
        let mut sub = self.bus.subscribe(self.scope);
        let engine = RetryEngine::new(self.bus.clone(), self.params);
        let engine_scope = engine.scope();
        let mut engine_run = pin!(engine.run(token.child_token()));
        let mut current: Option<Inflight<A::Output, A::Error>> = None;

        let outcome = loop {
            select! {
                biased;
                _ = token.cancelled() => break Err(RetryError::Cancelled),

                res = &mut engine_run => {
                    match res {
                        Err(e) => break Err(RetryError::Timer(e)),
                        Ok(exit) => break Err(self.exit_error(exit)),
                    }
                }

                res = poll_inflight(&mut current), if current.is_some() => {
                    current = None;
                    match res {
                        Ok(v) => {
                            self.terminate(engine_scope);
                            break Ok(v);
                        }
                        Err(AttemptError::Terminal { payload }) => {
                            self.terminate(engine_scope);
                            break Err(RetryError::Terminal { payload });
                        }
                        Err(AttemptError::Retryable { retry_after: Some(delay), .. }) => {
                            self.reschedule(engine_scope, delay.as_millis_f64());
                        }
                        Err(AttemptError::Retryable { retry_after: None, .. }) => {}
                    }
                }

                sig = sub.recv() => {
                    let Some(sig) = sig else { continue };
                    if !sig.is_from(engine_scope) {
                        continue;
                    }
                    match sig.kind {
                        SignalKind::Started | SignalKind::NextIteration => {
                            if let Some(prev) = current.take() {
                                prev.abort();
                            }
                            let child = token.child_token();
                            let fut = action.attempt(child.clone());
                            current = Some(Inflight { token: child, fut });
                        }
                        SignalKind::Exhausted => {
                            break Err(RetryError::RetryLimitExceeded {
                                attempts: sig.attempt().unwrap_or(0),
                            });
                        }
                        SignalKind::Failed => {
                            break Err(RetryError::DeadlineExceeded {
                                deadline: self.params.deadline().unwrap_or_default(),
                            });
                        }
                        _ => {}
                    }
                }
            }
        };

        if let Some(prev) = current.take() {
            prev.abort();
        }
        outcome
    }

    /// Maps an engine exit observed while the run is still undecided.
    ///
    /// The orchestrator's own `Terminate` is always followed by a `break`, so a
    /// `Terminated` engine seen here was stopped by some other scope. No window
    /// can open after that, so the run settles as cancelled.
    fn exit_error<E>(&self, exit: EngineExit) -> RetryError<E> {
        match exit {
            EngineExit::Exhausted { attempts } => RetryError::RetryLimitExceeded { attempts },
            EngineExit::DeadlineElapsed => RetryError::DeadlineExceeded {
                deadline: self.params.deadline().unwrap_or_default(),
            },
            EngineExit::Cancelled | EngineExit::Terminated => RetryError::Cancelled,
        }
    }

    fn terminate(&self, engine: ScopeId) {
        self.bus
            .publish(Signal::new(SignalKind::Terminate, self.scope).with_target(engine));
    }

    fn reschedule(&self, engine: ScopeId, ms: f64) {
        self.bus.publish(
            Signal::new(SignalKind::Reschedule, self.scope)
                .with_target(engine)
                .with_metadata(ms),
        );
    }
}
