//! # Signal bus scoped to one retry run.
//!
//! [`SignalBus`] is a thin wrapper around [`tokio::sync::broadcast`] that adds
//! scope allocation and origin filtering. Every orchestrator invocation builds
//! its own bus; nothing is process-wide.
//!
//! ## Architecture
//! ```text
//! Publishers:                         Subscriptions (one per component):
//!   Orchestrator ──┐                ┌──► engine        (skips engine-origin)
//!   RetryEngine  ──┼──► SignalBus ──┼──► orchestrator  (skips orchestrator-origin)
//!   Timers       ──┘                └──► observer      (sees everything)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and never fails.
//! - **No echo**: a subscription never yields a signal whose origin is its own scope.
//! - **No routing**: target addressing is checked by listeners
//!   ([`Signal::is_addressed_to`]), the bus relays everything.
//! - **No persistence**: signals published with no live subscription are dropped.
//! - **Unsubscribe = drop**: dropping a [`Subscription`] removes the listener.
//!
//! ## Capacity behavior
//! The ring buffer keeps the most recent `capacity` signals. A subscription
//! that falls behind skips the oldest ones and keeps reading.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::signal::{ScopeId, Signal};

/// Default ring buffer capacity for a per-run bus.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Smallest ring buffer a bus is created with.
///
/// One run has at most a handful of control signals in flight between two
/// polls of a reader (window expiry, deadline terminate, reschedule, the
/// orchestrator's terminate and the engine's report). A ring at least this
/// large keeps those from being overwritten before the engine reads them.
pub const MIN_BUS_CAPACITY: usize = 16;

struct Inner {
    tx: broadcast::Sender<Signal>,
    next_scope: AtomicU64,
    next_seq: AtomicU64,
}

/// Broadcast relay for [`Signal`]s.
///
/// ### Properties
/// - **Cloneable**: clones share the channel, the scope allocator and the sequence.
/// - **Fire-and-forget**: no delivery or durability guarantees.
#[derive(Clone)]
pub struct SignalBus {
    inner: Arc<Inner>,
}

impl SignalBus {
    /// Creates a new bus with the given channel capacity (raised to
    /// [`MIN_BUS_CAPACITY`] when smaller).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Signal>(capacity.max(MIN_BUS_CAPACITY));
        Self {
            inner: Arc::new(Inner {
                tx,
                next_scope: AtomicU64::new(1),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Allocates a fresh scope identity on this bus.
    pub fn scope(&self, label: &'static str) -> ScopeId {
        let id = self.inner.next_scope.fetch_add(1, AtomicOrdering::Relaxed);
        ScopeId::new(id, label)
    }

    /// Publishes a signal to every live subscription except its origin's.
    ///
    /// Stamps the per-bus sequence number. Returns immediately; with no
    /// subscription the signal is dropped.
    pub fn publish(&self, mut signal: Signal) {
        signal.seq = self.inner.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let _ = self.inner.tx.send(signal);
    }

    /// Registers a listener for `scope`.
    ///
    /// Only signals published **after** this call are observed.
    pub fn subscribe(&self, scope: ScopeId) -> Subscription {
        Subscription {
            scope: Some(scope),
            rx: self.inner.tx.subscribe(),
        }
    }

    /// Registers a passive listener that observes every signal, including
    /// ones it could never have published itself.
    pub fn observe(&self) -> Subscription {
        Subscription {
            scope: None,
            rx: self.inner.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// A registered listener. Dropping it unsubscribes.
pub struct Subscription {
    scope: Option<ScopeId>,
    rx: broadcast::Receiver<Signal>,
}

impl Subscription {
    /// Scope this subscription listens for (`None` for observers).
    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    /// Waits for the next signal not published by this subscription's scope.
    ///
    /// Returns `None` once every publisher handle has been dropped.
    /// Cancel-safe: can be used as a `select!` branch.
    pub async fn recv(&mut self) -> Option<Signal> {
        loop {
            match self.rx.recv().await {
                Ok(sig) if self.is_echo(&sig) => continue,
                Ok(sig) => return Some(sig),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Signal> {
        loop {
            match self.rx.try_recv() {
                Ok(sig) if self.is_echo(&sig) => continue,
                Ok(sig) => return Some(sig),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Removes the listener from the bus.
    pub fn unsubscribe(self) {}

    fn is_echo(&self, sig: &Signal) -> bool {
        self.scope.is_some_and(|s| sig.is_from(s))
    }
}
