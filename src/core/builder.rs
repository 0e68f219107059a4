use std::sync::Arc;

use crate::{
    core::{RetryConfig, retrier::Retrier},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Retrier`].
pub struct RetrierBuilder {
    cfg: RetryConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RetrierBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: RetryConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets signal subscribers for observability.
    ///
    /// Subscribers receive every signal of every run through dedicated
    /// workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the retrier and spawns the subscriber workers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Retrier {
        let subs = Arc::new(SubscriberSet::new(self.subscribers));
        Retrier::new_internal(self.cfg, subs)
    }
}
