//! # RetryEngine: bounded sequence of attempt windows.
//!
//! Opens one attempt window at a time, each backed by a [`Timer`]. Every
//! window expiry opens the next one until the attempt budget runs out, the
//! overall deadline elapses, or someone terminates the engine.
//!
//! ## State machine
//! ```text
//! Idle ──start──► Scheduled ──timer──► Elapsed ──budget left──► Scheduled
//!                    │                    └──budget spent──► Exhausted
//!                    ├──Reschedule(ms)──► Scheduled (same attempt, explicit window)
//!                    └──Terminate───────► Terminated
//! ```
//!
//! ## Signal flow
//! ```text
//! start:      arm window #1 (+ deadline timer) ─► publish Started{1}
//! Elapsed:    attempt += 1 ─► arm window       ─► publish NextIteration{attempt}
//!                         └─► budget spent     ─► publish Exhausted{windows}
//! Terminate:  cancel window + deadline ─► unsubscribe
//!             (from the deadline timer) ─► publish Failed{deadline_ms}
//! Reschedule: cancel window ─► arm window with metadata ms
//! ```
//!
//! ## Rules
//! - At most **one** live window timer; the previous one is cancelled before
//!   the next is armed.
//! - Expiries of stale timers are ignored; each live expiry is counted once.
//! - `max_attempts = N` opens at most `N` windows, observes at most `N`
//!   expiries and publishes `Exhausted` exactly once. `N = 0` is exhausted at
//!   start; `N < 0` never exhausts.

use std::time::Duration;

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{Delay, RetryParams, Timer},
    error::TimerError,
    events::{ScopeId, Signal, SignalBus, SignalKind, Subscription},
    policies::BackoffSequence,
};

/// Engine lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, not started.
    Idle,
    /// A window timer is armed.
    Scheduled,
    /// The window timer expired; deciding what comes next.
    Elapsed,
    /// Attempt budget spent.
    Exhausted,
    /// Stopped by a terminate request, the deadline or cancellation.
    Terminated,
}

/// Why [`RetryEngine::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineExit {
    /// Every allowed window elapsed.
    Exhausted {
        /// Windows opened.
        attempts: u32,
    },
    /// The overall deadline elapsed.
    DeadlineElapsed,
    /// A `Terminate` signal addressed to the engine arrived.
    Terminated,
    /// The runtime token was cancelled.
    Cancelled,
}

/// Mutable bookkeeping of one engine.
#[derive(Debug, Default)]
pub struct RetryContext {
    attempt: u32,
    fired: u32,
    current: Option<Timer>,
}

impl RetryContext {
    /// Attempt windows opened so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Window expiries observed so far.
    pub fn fired(&self) -> u32 {
        self.fired
    }

    /// The live window timer, if any.
    pub fn current(&self) -> Option<&Timer> {
        self.current.as_ref()
    }
}

/// Drives attempt windows for one run and reports progress on the bus.
pub struct RetryEngine {
    scope: ScopeId,
    bus: SignalBus,
    params: RetryParams,
    backoff: BackoffSequence,
    ctx: RetryContext,
    state: EngineState,
    deadline: Option<Timer>,
    sub: Option<Subscription>,
}

impl RetryEngine {
    /// Creates an idle engine and subscribes it to `bus`.
    ///
    /// Subscribing here (not in `run`) guarantees that signals addressed to
    /// the engine between construction and the first poll are not lost.
    pub fn new(bus: SignalBus, params: RetryParams) -> Self {
        let scope = bus.scope("engine");
        let sub = bus.subscribe(scope);
        Self {
            scope,
            backoff: params.backoff().sequence(),
            bus,
            params,
            ctx: RetryContext::default(),
            state: EngineState::Idle,
            deadline: None,
            sub: Some(sub),
        }
    }

    /// Scope to address `Terminate` / `Reschedule` signals to.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Read-only view of the bookkeeping.
    pub fn context(&self) -> &RetryContext {
        &self.ctx
    }

    /// Runs the engine until exhaustion, termination or cancellation.
    ///
    /// ### Errors
    /// [`TimerError::InvalidTimeout`] when a window (for instance one requested
    /// through `Reschedule`) carries a malformed delay. This is fatal: every
    /// timer is cancelled when the engine is dropped.
    pub async fn run(mut self, token: CancellationToken) -> Result<EngineExit, TimerError> {
        let Some(mut sub) = self.sub.take() else {
            return Ok(EngineExit::Terminated);
        };
        if let Some(exit) = self.start()? {
            return Ok(exit);
        }

        loop {
            let sig = select! {
                biased;
                _ = token.cancelled() => {
                    self.teardown();
                    return Ok(EngineExit::Cancelled);
                }
                sig = sub.recv() => sig,
            };
            let Some(sig) = sig else {
                self.teardown();
                return Ok(EngineExit::Terminated);
            };
            if let Some(exit) = self.handle(&sig)? {
                return Ok(exit);
            }
        }
    }

    /// Idle → Scheduled (or straight to Exhausted for an empty budget).
    fn start(&mut self) -> Result<Option<EngineExit>, TimerError> {
        if !self.params.allows(1) {
            return Ok(Some(self.exhaust()));
        }
        if let Some(limit) = self.params.deadline() {
            self.arm_deadline(limit)?;
        }

        match self.params.first_delay() {
            Some(d) => self.arm(|_| d)?,
            None => self.arm(|backoff| backoff.next())?,
        }
        self.ctx.attempt = 1;
        self.state = EngineState::Scheduled;
        self.publish(SignalKind::Started, Some(1.0));
        Ok(None)
    }

    fn handle(&mut self, sig: &Signal) -> Result<Option<EngineExit>, TimerError> {
        match sig.kind {
            SignalKind::Elapsed if self.is_current(sig.origin) => self.on_elapsed(),
            SignalKind::Terminate if sig.is_addressed_to(self.scope) => {
                Ok(Some(self.on_terminate(sig.origin)))
            }
            SignalKind::Reschedule if sig.is_addressed_to(self.scope) => {
                self.on_reschedule(sig.metadata)?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn on_elapsed(&mut self) -> Result<Option<EngineExit>, TimerError> {
        self.state = EngineState::Elapsed;
        self.ctx.fired += 1;
        self.ctx.current = None;

        let next = self.ctx.attempt.saturating_add(1);
        if !self.params.allows(next) {
            return Ok(Some(self.exhaust()));
        }

        self.arm(|backoff| backoff.next())?;
        self.ctx.attempt = next;
        self.state = EngineState::Scheduled;
        self.publish(SignalKind::NextIteration, Some(f64::from(next)));
        Ok(None)
    }

    fn on_terminate(&mut self, origin: ScopeId) -> EngineExit {
        let by_deadline = self.deadline.as_ref().is_some_and(|t| t.scope() == origin);
        self.teardown();

        if by_deadline {
            let ms = self
                .params
                .deadline()
                .map_or(0.0, |d| d.as_secs_f64() * 1000.0);
            self.publish(SignalKind::Failed, Some(ms));
            EngineExit::DeadlineElapsed
        } else {
            EngineExit::Terminated
        }
    }

    fn on_reschedule(&mut self, metadata: Option<f64>) -> Result<(), TimerError> {
        let Some(ms) = metadata else {
            return Ok(());
        };
        if self.state != EngineState::Scheduled {
            return Ok(());
        }
        self.arm(|_| Delay::Millis(ms))
    }

    /// Publishes `Exhausted` and stops every timer.
    fn exhaust(&mut self) -> EngineExit {
        self.teardown();
        self.state = EngineState::Exhausted;
        let attempts = self.ctx.attempt;
        self.publish(SignalKind::Exhausted, Some(f64::from(attempts)));
        EngineExit::Exhausted { attempts }
    }

    /// Cancels the live window and the deadline timer.
    fn teardown(&mut self) {
        if let Some(t) = self.ctx.current.take() {
            t.cancel();
        }
        if let Some(t) = self.deadline.take() {
            t.cancel();
        }
        self.state = EngineState::Terminated;
    }

    /// Replaces the live window timer. The old one is cancelled first.
    ///
    /// `delay` is evaluated once while the timer is scheduled; backoff-driven
    /// windows advance the sequence only when a window is actually armed.
    fn arm<G, D>(&mut self, delay: G) -> Result<(), TimerError>
    where
        G: FnOnce(&mut BackoffSequence) -> D,
        D: Into<Delay>,
    {
        if let Some(prev) = self.ctx.current.take() {
            prev.cancel();
        }
        let scope = self.bus.scope("timer");
        let bus = self.bus.clone();
        let owner = self.scope;
        let backoff = &mut self.backoff;
        let timer = Timer::schedule_with(scope, || delay(backoff), move || {
            bus.publish(Signal::new(SignalKind::Elapsed, scope).with_target(owner));
        })?;
        self.ctx.current = Some(timer);
        Ok(())
    }

    fn arm_deadline(&mut self, limit: Duration) -> Result<(), TimerError> {
        let scope = self.bus.scope("deadline");
        let bus = self.bus.clone();
        let owner = self.scope;
        let timer = Timer::schedule(scope, limit, move || {
            bus.publish(Signal::new(SignalKind::Terminate, scope).with_target(owner));
        })?;
        self.deadline = Some(timer);
        Ok(())
    }

    fn is_current(&self, origin: ScopeId) -> bool {
        self.ctx.current.as_ref().is_some_and(|t| t.scope() == origin)
    }

    fn publish(&self, kind: SignalKind, metadata: Option<f64>) {
        let mut sig = Signal::new(kind, self.scope);
        sig.metadata = metadata;
        self.bus.publish(sig);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::{BackoffPolicy, JitterPolicy};
    use tokio::time::{self, Instant};

    fn fixed(ms: u64) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(ms),
            cap: Duration::from_millis(ms),
            jitter: JitterPolicy::None,
        }
    }

    fn drain(obs: &mut Subscription) -> Vec<Signal> {
        std::iter::from_fn(|| obs.try_recv()).collect()
    }

    fn count(sigs: &[Signal], kind: SignalKind) -> usize {
        sigs.iter().filter(|s| s.kind == kind).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_budget() {
        for n in 0..6i64 {
            let bus = SignalBus::new(256);
            let mut obs = bus.observe();
            let engine = RetryEngine::new(bus.clone(), RetryParams::new(fixed(100), n));

            let exit = engine.run(CancellationToken::new()).await.unwrap();
            let sigs = drain(&mut obs);

            assert_eq!(exit, EngineExit::Exhausted { attempts: n as u32 });
            assert_eq!(count(&sigs, SignalKind::Elapsed), n as usize, "budget {n}");
            assert_eq!(count(&sigs, SignalKind::Exhausted), 1, "budget {n}");
            assert_eq!(
                count(&sigs, SignalKind::Started),
                usize::from(n > 0),
                "budget {n}"
            );
            assert_eq!(
                count(&sigs, SignalKind::NextIteration),
                (n as usize).saturating_sub(1),
                "budget {n}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_iteration_carries_counter() {
        let bus = SignalBus::new(64);
        let mut obs = bus.observe();
        let engine = RetryEngine::new(bus.clone(), RetryParams::new(fixed(10), 3));
        engine.run(CancellationToken::new()).await.unwrap();

        let counters: Vec<u32> = drain(&mut obs)
            .iter()
            .filter(|s| matches!(s.kind, SignalKind::Started | SignalKind::NextIteration))
            .filter_map(Signal::attempt)
            .collect();
        assert_eq!(counters, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_never_exhausts() {
        let bus = SignalBus::new(1024);
        let mut obs = bus.observe();
        let engine = RetryEngine::new(bus.clone(), RetryParams::new(fixed(10), -1));
        let token = CancellationToken::new();

        let stopper = {
            let token = token.clone();
            let mut watch = bus.observe();
            tokio::spawn(async move {
                let mut seen = 0;
                while let Some(sig) = watch.recv().await {
                    if sig.kind == SignalKind::NextIteration {
                        seen += 1;
                        if seen == 200 {
                            token.cancel();
                            break;
                        }
                    }
                }
            })
        };

        let exit = engine.run(token).await.unwrap();
        stopper.await.unwrap();

        assert_eq!(exit, EngineExit::Cancelled);
        let sigs = drain(&mut obs);
        assert_eq!(count(&sigs, SignalKind::Exhausted), 0);
        assert!(count(&sigs, SignalKind::NextIteration) >= 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_stops_timers() {
        let bus = SignalBus::new(64);
        let caller = bus.scope("caller");
        let mut obs = bus.observe();
        let engine = RetryEngine::new(bus.clone(), RetryParams::new(fixed(100), 5));
        let target = engine.scope();
        let handle = tokio::spawn(engine.run(CancellationToken::new()));

        time::sleep(Duration::from_millis(150)).await;
        bus.publish(Signal::new(SignalKind::Terminate, caller).with_target(target));
        bus.publish(Signal::new(SignalKind::Terminate, caller).with_target(target));
        let exit = handle.await.unwrap().unwrap();
        assert_eq!(exit, EngineExit::Terminated);

        drain(&mut obs);
        time::sleep(Duration::from_secs(5)).await;
        let after = drain(&mut obs);
        assert_eq!(count(&after, SignalKind::Elapsed), 0);
        assert_eq!(count(&after, SignalKind::NextIteration), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_for_other_scope_is_ignored() {
        let bus = SignalBus::new(64);
        let caller = bus.scope("caller");
        let stranger = bus.scope("stranger");
        let engine = RetryEngine::new(bus.clone(), RetryParams::new(fixed(100), 2));
        let handle = tokio::spawn(engine.run(CancellationToken::new()));

        tokio::task::yield_now().await;
        bus.publish(Signal::new(SignalKind::Terminate, caller).with_target(stranger));
        let exit = handle.await.unwrap().unwrap();
        assert_eq!(exit, EngineExit::Exhausted { attempts: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_untargeted_terminate_stops_engine() {
        let bus = SignalBus::new(64);
        let outsider = bus.scope("outsider");
        let mut obs = bus.observe();
        let engine = RetryEngine::new(bus.clone(), RetryParams::new(fixed(100), 5));
        let handle = tokio::spawn(engine.run(CancellationToken::new()));

        time::sleep(Duration::from_millis(50)).await;
        bus.publish(Signal::new(SignalKind::Terminate, outsider));
        let exit = handle.await.unwrap().unwrap();
        assert_eq!(exit, EngineExit::Terminated);

        drain(&mut obs);
        time::sleep(Duration::from_secs(5)).await;
        let after = drain(&mut obs);
        assert_eq!(count(&after, SignalKind::Elapsed), 0);
        assert_eq!(count(&after, SignalKind::Exhausted), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_uses_explicit_delay() {
        let bus = SignalBus::new(64);
        let caller = bus.scope("caller");
        let mut obs = bus.observe();
        let engine = RetryEngine::new(bus.clone(), RetryParams::new(fixed(100), 2));
        let target = engine.scope();
        let handle = tokio::spawn(engine.run(CancellationToken::new()));

        let started = loop {
            let sig = obs.recv().await.unwrap();
            if sig.kind == SignalKind::Started {
                break Instant::now();
            }
        };
        bus.publish(
            Signal::new(SignalKind::Reschedule, caller)
                .with_target(target)
                .with_metadata(500.0),
        );

        let next = loop {
            let sig = obs.recv().await.unwrap();
            if sig.kind == SignalKind::NextIteration {
                break sig;
            }
        };
        let waited = Instant::now() - started;
        assert!(waited >= Duration::from_millis(500), "waited {waited:?}");
        assert!(waited < Duration::from_millis(501), "waited {waited:?}");
        assert_eq!(next.attempt(), Some(2));

        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_reschedule_is_fatal() {
        let bus = SignalBus::new(64);
        let caller = bus.scope("caller");
        let engine = RetryEngine::new(bus.clone(), RetryParams::new(fixed(100), 3));
        let target = engine.scope();
        let handle = tokio::spawn(engine.run(CancellationToken::new()));

        tokio::task::yield_now().await;
        bus.publish(
            Signal::new(SignalKind::Reschedule, caller)
                .with_target(target)
                .with_metadata(f64::NAN),
        );
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.as_label(), "timer_invalid_timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_short_circuits_budget() {
        let bus = SignalBus::new(256);
        let mut obs = bus.observe();
        let params = RetryParams::new(fixed(100), -1).with_deadline(Some(Duration::from_millis(250)));
        let engine = RetryEngine::new(bus.clone(), params);

        let begin = Instant::now();
        let exit = engine.run(CancellationToken::new()).await.unwrap();
        assert_eq!(exit, EngineExit::DeadlineElapsed);
        assert!(Instant::now() - begin >= Duration::from_millis(250));

        let sigs = drain(&mut obs);
        assert_eq!(count(&sigs, SignalKind::Failed), 1);
        assert_eq!(count(&sigs, SignalKind::Terminate), 1);
        assert_eq!(count(&sigs, SignalKind::Exhausted), 0);
        assert_eq!(count(&sigs, SignalKind::Elapsed), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_delay_overrides_backoff() {
        let bus = SignalBus::new(64);
        let params = RetryParams::new(fixed(1000), 1).with_first_delay(Some(Duration::from_millis(50)));
        let engine = RetryEngine::new(bus, params);

        let begin = Instant::now();
        let exit = engine.run(CancellationToken::new()).await.unwrap();
        assert_eq!(exit, EngineExit::Exhausted { attempts: 1 });
        assert!(Instant::now() - begin < Duration::from_millis(1000));
    }

    #[test]
    fn test_new_engine_is_idle_and_subscribed() {
        let bus = SignalBus::new(8);
        let engine = RetryEngine::new(bus.clone(), RetryParams::default());
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.context().attempt(), 0);
        assert!(engine.context().current().is_none());
        assert_eq!(bus.listener_count(), 1);
        drop(engine);
        assert_eq!(bus.listener_count(), 0);
    }
}
