//! # LogWriter: signal renderer over `tracing`
//!
//! A subscriber that turns every signal into a structured `tracing` event.
//! Installing a `tracing` subscriber is left to the application.
//!
//! ## Levels
//! ```text
//! DEBUG  elapsed, reschedule
//! INFO   started, next_iteration, terminate
//! WARN   exhausted, failed
//! ```

use async_trait::async_trait;

use crate::events::{Signal, SignalKind};
use crate::subscribers::Subscribe;

/// Signal writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_signal(&self, s: &Signal) {
        let kind = s.kind.as_label();
        match s.kind {
            SignalKind::Started | SignalKind::NextIteration => {
                tracing::info!(seq = s.seq, origin = %s.origin, kind, attempt = s.attempt(), "attempt window opened");
            }
            SignalKind::Terminate => {
                tracing::info!(seq = s.seq, origin = %s.origin, kind, targets = s.targets.len(), "terminate requested");
            }
            SignalKind::Elapsed => {
                tracing::debug!(seq = s.seq, origin = %s.origin, kind, "attempt window elapsed");
            }
            SignalKind::Reschedule => {
                tracing::debug!(seq = s.seq, origin = %s.origin, kind, delay_ms = s.metadata, "next window rescheduled");
            }
            SignalKind::Exhausted => {
                tracing::warn!(seq = s.seq, origin = %s.origin, kind, attempts = s.attempt(), "retry limit reached");
            }
            SignalKind::Failed => {
                tracing::warn!(seq = s.seq, origin = %s.origin, kind, deadline_ms = s.metadata, "deadline exceeded");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
