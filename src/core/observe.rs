//! Observability boundary.
//!
//! Every manager operation runs through [`Recorder::record`], which opens a
//! tracing span, times the call, logs the outcome and forwards counters to an
//! optional [`MetricsSink`]. With no sink attached only the log lines remain.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info_span};

/// Outcome label attached to operation measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Error => "error",
        }
    }
}

/// Destination for operation measurements and message counters.
pub trait MetricsSink: Send + Sync {
    fn operation(&self, driver: &str, operation: &str, queue: &str, status: Status, elapsed: Duration);

    fn published(&self, driver: &str);

    fn consumed(&self, driver: &str);

    fn acked(&self, driver: &str);

    fn nacked(&self, driver: &str);

    /// A live broadcast skipped a consumer whose buffer was full.
    fn dropped(&self, driver: &str, queue: &str);
}

/// Wraps manager operations with tracing and optional metrics.
#[derive(Clone, Default)]
pub struct Recorder {
    sink: Option<Arc<dyn MetricsSink>>,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Recorder {
    pub fn new(sink: Option<Arc<dyn MetricsSink>>) -> Self {
        Self { sink }
    }

    /// Runs `f` inside an `mq.operation` span and records its outcome.
    pub fn record<T, E, F>(&self, driver: &str, operation: &str, queue: &str, f: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        let span = info_span!("mq.operation", mq.driver = driver, mq.operation = operation, mq.queue = queue);
        let start = Instant::now();
        let result = span.in_scope(f);
        let elapsed = start.elapsed();

        let status = match &result {
            Ok(_) => {
                debug!(operation, queue, ?elapsed, "mq operation success");
                Status::Success
            }
            Err(e) => {
                error!(operation, queue, error = %e, ?elapsed, "mq operation failed");
                Status::Error
            }
        };

        if let Some(sink) = &self.sink {
            sink.operation(driver, operation, queue, status, elapsed);
        }
        result
    }

    pub fn publish(&self, driver: &str) {
        if let Some(sink) = &self.sink {
            sink.published(driver);
        }
    }

    pub fn consume(&self, driver: &str) {
        if let Some(sink) = &self.sink {
            sink.consumed(driver);
        }
    }

    pub fn ack(&self, driver: &str) {
        if let Some(sink) = &self.sink {
            sink.acked(driver);
        }
    }

    pub fn nack(&self, driver: &str) {
        if let Some(sink) = &self.sink {
            sink.nacked(driver);
        }
    }

    pub fn dropped(&self, driver: &str, queue: &str) {
        if let Some(sink) = &self.sink {
            sink.dropped(driver, queue);
        }
    }
}
