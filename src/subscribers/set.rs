//! # Non-blocking signal fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`], which distributes signals to every subscriber
//! without blocking the retry run that produced them.
//!
//! ## Architecture
//! ```text
//! emit(signal)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_signal()
//!     │    (bounded)         └──────► panic → reported, worker keeps going
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_signal()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_signal()
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Per-subscriber FIFO**: each subscriber sees signals in publish order
//! - **No cross-subscriber ordering**
//! - **Overflow**: the signal is dropped for that subscriber only and counted
//! - **Isolation**: a slow or panicking subscriber doesn't affect others
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state
//! inconsistent if a subscriber panics while holding a lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::Signal;
use crate::subscribers::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Signal>>,
}

/// Fan-out coordinator for signal subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called inside a tokio runtime. Minimum queue capacity is 1.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Signal>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(sig) = rx.recv().await {
                    let fut = sub.on_signal(sig.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let any = &*panic_err;
                        let info = if let Some(msg) = any.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = any.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        report_panic(sub.name(), &info);
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            channels,
            workers,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emits a signal to all subscribers (non-blocking).
    pub fn emit(&self, signal: &Signal) {
        self.emit_arc(Arc::new(signal.clone()));
    }

    /// Emits a pre-allocated `Arc<Signal>` to all subscribers.
    ///
    /// On a full or closed queue the signal is dropped for that subscriber.
    pub fn emit_arc(&self, signal: Arc<Signal>) {
        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&signal)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            self.dropped.fetch_add(1, AtomicOrdering::Relaxed);
            report_overflow(channel.name, reason);
        }
    }

    /// Number of signals dropped across all subscribers.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(AtomicOrdering::Relaxed)
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Graceful shutdown: closes all queues and awaits the workers, so every
    /// signal already emitted is handled.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }
}

#[cfg(feature = "logging")]
fn report_panic(subscriber: &'static str, info: &str) {
    tracing::error!(subscriber, info, "subscriber panicked");
}

#[cfg(not(feature = "logging"))]
fn report_panic(subscriber: &'static str, info: &str) {
    eprintln!("[retryvisor] subscriber '{subscriber}' panicked: {info}");
}

#[cfg(feature = "logging")]
fn report_overflow(subscriber: &'static str, reason: &'static str) {
    tracing::warn!(subscriber, reason, "subscriber dropped signal");
}

#[cfg(not(feature = "logging"))]
fn report_overflow(subscriber: &'static str, reason: &'static str) {
    eprintln!("[retryvisor] subscriber '{subscriber}' dropped signal: queue {reason}");
}
