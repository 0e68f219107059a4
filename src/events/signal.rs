//! # Signals exchanged between timers, retry engines and orchestrators.
//!
//! The [`SignalKind`] enum classifies signals in three groups:
//! - **Control**: requests addressed to a scope (terminate, reschedule)
//! - **Lifecycle**: engine progress (started, next iteration, elapsed)
//! - **Terminal**: engine final states (exhausted, failed)
//!
//! A [`Signal`] carries its origin [`ScopeId`], an optional target set and an
//! optional numeric payload. Listeners decide whether a signal concerns them
//! with [`Signal::is_addressed_to`]; the bus itself does not route.
//!
//! ## Example
//! ```rust
//! use retryvisor::{SignalBus, Signal, SignalKind};
//!
//! let bus = SignalBus::new(16);
//! let orchestrator = bus.scope("orchestrator");
//! let engine = bus.scope("engine");
//!
//! let sig = Signal::new(SignalKind::Reschedule, orchestrator)
//!     .with_target(engine)
//!     .with_metadata(500.0);
//!
//! assert!(sig.is_addressed_to(engine));
//! assert!(!sig.is_addressed_to(orchestrator));
//! assert_eq!(sig.metadata, Some(500.0));
//! ```

use std::fmt;
use std::time::SystemTime;

/// Identity of a component on one bus.
///
/// Allocated by [`SignalBus::scope`](crate::SignalBus::scope); unique per bus.
/// The label is only used for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId {
    id: u64,
    label: &'static str,
}

impl ScopeId {
    pub(crate) fn new(id: u64, label: &'static str) -> Self {
        Self { id, label }
    }

    /// Numeric identity, unique within its bus.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Human-readable component label (e.g. `"engine"`, `"timer"`).
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.label, self.id)
    }
}

/// Classification of signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    // === Control ===
    /// Request to stop the addressed scopes (all of them when untargeted).
    ///
    /// Sets:
    /// - `origin`: requester (orchestrator, deadline timer)
    /// - `targets`: scopes to stop
    Terminate,

    /// Replace the current attempt window with an explicit delay.
    ///
    /// Sets:
    /// - `origin`: requester
    /// - `targets`: engine scope
    /// - `metadata`: delay in milliseconds
    Reschedule,

    // === Lifecycle ===
    /// The first attempt window is open.
    ///
    /// Sets:
    /// - `origin`: engine scope
    /// - `metadata`: attempt counter (always `1`)
    Started,

    /// A later attempt window is open; the previous attempt must be dropped.
    ///
    /// Sets:
    /// - `origin`: engine scope
    /// - `metadata`: attempt counter
    NextIteration,

    /// A timer expired.
    ///
    /// Sets:
    /// - `origin`: timer scope
    /// - `targets`: owner scope
    Elapsed,

    // === Terminal ===
    /// The engine ran out of attempts.
    ///
    /// Sets:
    /// - `origin`: engine scope
    /// - `metadata`: number of attempt windows opened
    Exhausted,

    /// The engine gave up because its overall deadline elapsed.
    ///
    /// Sets:
    /// - `origin`: engine scope
    /// - `metadata`: configured deadline in milliseconds
    Failed,
}

impl SignalKind {
    /// True for the engine progress signals (`Started`, `NextIteration`,
    /// `Elapsed`, `Exhausted`).
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            SignalKind::Started
                | SignalKind::NextIteration
                | SignalKind::Elapsed
                | SignalKind::Exhausted
        )
    }

    /// True for signals after which the publishing engine is gone.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SignalKind::Exhausted | SignalKind::Failed)
    }

    /// Short stable label (kebab-case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SignalKind::Terminate => "terminate",
            SignalKind::Reschedule => "reschedule",
            SignalKind::Started => "started",
            SignalKind::NextIteration => "next-iteration",
            SignalKind::Elapsed => "elapsed",
            SignalKind::Exhausted => "exhausted",
            SignalKind::Failed => "failed",
        }
    }
}

/// Ephemeral message relayed by the [`SignalBus`](crate::SignalBus).
///
/// - `seq`: monotonic per-bus sequence, stamped on publish
/// - `at`: wall-clock timestamp (for logs)
/// - `targets`: empty means broadcast
#[derive(Clone, Debug)]
pub struct Signal {
    /// Per-bus sequence number (assigned by `publish`).
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Signal classification.
    pub kind: SignalKind,
    /// Publisher identity; never delivered back to this scope.
    pub origin: ScopeId,
    /// Addressed scopes; empty = everyone.
    pub targets: Vec<ScopeId>,
    /// Optional numeric payload (delay override, attempt counter).
    pub metadata: Option<f64>,
}

impl Signal {
    /// Creates an untargeted signal without payload.
    pub fn new(kind: SignalKind, origin: ScopeId) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            kind,
            origin,
            targets: Vec::new(),
            metadata: None,
        }
    }

    /// Adds a target scope (kept in insertion order, without duplicates).
    #[inline]
    pub fn with_target(mut self, target: ScopeId) -> Self {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
        self
    }

    /// Attaches a numeric payload.
    #[inline]
    pub fn with_metadata(mut self, value: f64) -> Self {
        self.metadata = Some(value);
        self
    }

    /// True when the signal is broadcast or lists `scope` among its targets.
    #[inline]
    pub fn is_addressed_to(&self, scope: ScopeId) -> bool {
        self.targets.is_empty() || self.targets.contains(&scope)
    }

    /// True when the signal was published by `scope`.
    #[inline]
    pub fn is_from(&self, scope: ScopeId) -> bool {
        self.origin == scope
    }

    /// Metadata read as an attempt counter.
    pub fn attempt(&self) -> Option<u32> {
        self.metadata
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.min(f64::from(u32::MAX)) as u32)
    }
}
