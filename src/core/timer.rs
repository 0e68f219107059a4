//! # Single-shot cancellable timer.
//!
//! [`Timer::schedule`] validates the delay synchronously, then arms a tokio
//! sleep on a background task. The returned [`Timer`] is the only cancel handle.
//! [`Timer::schedule_with`] takes a delay-producing function instead; it is
//! called exactly once, before anything is armed.
//!
//! ## State machine
//! ```text
//!            expiry (CAS wins)
//! Pending ─────────────────────► Fired      (on_fire runs exactly once)
//!    │
//!    └──── cancel() (CAS wins) ─► Cancelled  (on_fire never runs)
//! ```
//!
//! ## Rules
//! - Both terminal transitions race on one compare-and-swap, so a timer that
//!   was cancelled can never fire, even when its deadline lands in the same tick.
//! - `cancel()` is idempotent and a no-op once fired.
//! - Dropping the handle cancels the timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::TimerError;
use crate::events::ScopeId;

/// Delay accepted by [`Timer::schedule`].
///
/// Raw millisecond values come from untrusted places (configuration, server
/// hints) and are validated when the timer is scheduled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Delay {
    /// A delay that is valid by construction.
    Exact(Duration),
    /// A raw number of milliseconds; must be finite and non-negative.
    Millis(f64),
}

impl Delay {
    /// Resolves to a [`Duration`], rejecting non-finite or negative values.
    pub fn resolve(self) -> Result<Duration, TimerError> {
        match self {
            Delay::Exact(d) => Ok(d),
            Delay::Millis(ms) if ms.is_finite() && ms >= 0.0 => {
                Duration::try_from_secs_f64(ms / 1000.0)
                    .map_err(|_| TimerError::InvalidTimeout { value: ms })
            }
            Delay::Millis(ms) => Err(TimerError::InvalidTimeout { value: ms }),
        }
    }

    /// Delay in milliseconds, as carried by signal metadata.
    pub fn as_millis_f64(&self) -> f64 {
        match self {
            Delay::Exact(d) => d.as_secs_f64() * 1000.0,
            Delay::Millis(ms) => *ms,
        }
    }
}

impl From<Duration> for Delay {
    fn from(d: Duration) -> Self {
        Delay::Exact(d)
    }
}

impl From<f64> for Delay {
    fn from(ms: f64) -> Self {
        Delay::Millis(ms)
    }
}

impl From<u64> for Delay {
    fn from(ms: u64) -> Self {
        Delay::Exact(Duration::from_millis(ms))
    }
}

/// Observable state of a [`Timer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// Armed, neither fired nor cancelled.
    Pending,
    /// Expired; the callback ran.
    Fired,
    /// Cancelled before expiry; the callback will never run.
    Cancelled,
}

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

struct Slot(AtomicU8);

impl Slot {
    /// Attempts `Pending → to`. Only one caller ever wins.
    fn settle(&self, to: u8) -> bool {
        self.0
            .compare_exchange(PENDING, to, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_ok()
    }

    fn state(&self) -> TimerState {
        match self.0.load(AtomicOrdering::Acquire) {
            PENDING => TimerState::Pending,
            FIRED => TimerState::Fired,
            _ => TimerState::Cancelled,
        }
    }
}

/// Handle to an armed single-shot timer.
pub struct Timer {
    scope: ScopeId,
    delay: Duration,
    slot: Arc<Slot>,
    token: CancellationToken,
}

impl Timer {
    /// Arms a timer that runs `on_fire` once after `delay`.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// ### Errors
    /// [`TimerError::InvalidTimeout`] when the delay is not a finite,
    /// non-negative number. Nothing is armed in that case.
    pub fn schedule<F>(
        scope: ScopeId,
        delay: impl Into<Delay>,
        on_fire: F,
    ) -> Result<Self, TimerError>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::schedule_with(scope, move || delay, on_fire)
    }

    /// Like [`Timer::schedule`], but the delay comes from `delay_fn`.
    ///
    /// `delay_fn` runs exactly once, synchronously, before validation.
    ///
    /// ### Errors
    /// [`TimerError::InvalidTimeout`] when the produced delay is not a finite,
    /// non-negative number. Nothing is armed in that case.
    pub fn schedule_with<G, D, F>(
        scope: ScopeId,
        delay_fn: G,
        on_fire: F,
    ) -> Result<Self, TimerError>
    where
        G: FnOnce() -> D,
        D: Into<Delay>,
        F: FnOnce() + Send + 'static,
    {
        let delay = delay_fn().into().resolve()?;
        let slot = Arc::new(Slot(AtomicU8::new(PENDING)));
        let token = CancellationToken::new();

        let (s, t) = (Arc::clone(&slot), token.clone());
        tokio::spawn(async move {
            select! {
                biased;
                _ = t.cancelled() => {}
                _ = time::sleep(delay) => {
                    if s.settle(FIRED) {
                        on_fire();
                    }
                }
            }
        });

        Ok(Self {
            scope,
            delay,
            slot,
            token,
        })
    }

    /// Cancels the timer. Idempotent; no effect after it fired.
    pub fn cancel(&self) {
        self.slot.settle(CANCELLED);
        self.token.cancel();
    }

    /// Current state.
    pub fn state(&self) -> TimerState {
        self.slot.state()
    }

    /// True while neither fired nor cancelled.
    pub fn is_pending(&self) -> bool {
        self.state() == TimerState::Pending
    }

    /// Identity used to address and recognize this timer.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Resolved delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("scope", &self.scope)
            .field("delay", &self.delay)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn scope() -> ScopeId {
        ScopeId::new(1, "timer")
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        (hits, move || {
            h.fetch_add(1, AtomicOrdering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let (hits, on_fire) = counter();
        let timer = Timer::schedule(scope(), Duration::from_millis(100), on_fire).unwrap();
        assert!(timer.is_pending());

        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(timer.state(), TimerState::Fired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_deadline_suppresses_fire() {
        let (hits, on_fire) = counter();
        let timer = Timer::schedule(scope(), Duration::from_millis(100), on_fire).unwrap();

        time::sleep(Duration::from_millis(99)).await;
        timer.cancel();
        time::sleep(Duration::from_millis(50)).await;

        assert_eq!(hits.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(timer.state(), TimerState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_in_same_tick_as_deadline() {
        let (hits, on_fire) = counter();
        let timer = Timer::schedule(scope(), Duration::ZERO, on_fire).unwrap();
        timer.cancel();

        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(timer.state(), TimerState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_and_cancel_race_is_exclusive() {
        for _ in 0..20 {
            let (hits, on_fire) = counter();
            let timer = Timer::schedule(scope(), Duration::from_millis(5), on_fire).unwrap();
            time::sleep(Duration::from_millis(5)).await;
            timer.cancel();
            tokio::task::yield_now().await;

            let fired = hits.load(AtomicOrdering::SeqCst);
            match timer.state() {
                TimerState::Fired => assert_eq!(fired, 1),
                TimerState::Cancelled => assert_eq!(fired, 0),
                TimerState::Pending => panic!("timer still pending after cancel"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let (hits, on_fire) = counter();
        let timer = Timer::schedule(scope(), Duration::from_millis(10), on_fire).unwrap();
        timer.cancel();
        timer.cancel();
        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(timer.state(), TimerState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_fire_is_noop() {
        let (hits, on_fire) = counter();
        let timer = Timer::schedule(scope(), Duration::from_millis(10), on_fire).unwrap();
        time::sleep(Duration::from_millis(20)).await;
        timer.cancel();
        timer.cancel();
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(timer.state(), TimerState::Fired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (hits, on_fire) = counter();
        let timer = Timer::schedule(scope(), Duration::from_millis(10), on_fire).unwrap();
        drop(timer);
        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_delays_fail_fast() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -1.0, f64::MAX] {
            let err = Timer::schedule(scope(), bad, || {}).unwrap_err();
            assert_eq!(err.as_label(), "timer_invalid_timeout");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_fn_runs_once_at_schedule() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let (hits, on_fire) = counter();
        let timer = Timer::schedule_with(
            scope(),
            move || {
                c.fetch_add(1, AtomicOrdering::SeqCst);
                Duration::from_millis(40)
            },
            on_fire,
        )
        .unwrap();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(timer.delay(), Duration::from_millis(40));

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_fn_nan_fails_without_arming() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let (hits, on_fire) = counter();
        let err = Timer::schedule_with(
            scope(),
            move || {
                c.fetch_add(1, AtomicOrdering::SeqCst);
                f64::NAN
            },
            on_fire,
        )
        .unwrap_err();
        assert_eq!(err.as_label(), "timer_invalid_timeout");
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_millis_resolve() {
        assert_eq!(Delay::Millis(500.0).resolve(), Ok(Duration::from_millis(500)));
        assert_eq!(Delay::Millis(0.0).resolve(), Ok(Duration::ZERO));
        assert_eq!(Delay::from(250u64).as_millis_f64(), 250.0);
    }
}
