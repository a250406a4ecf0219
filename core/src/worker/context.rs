//! Per-worker execution context

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::signal::SignalFactory;

use super::rate_limiter::RateLimiter;

/// Everything a worker needs besides its exporter
///
/// Built once by the orchestrator and owned by exactly one [`Worker`](super::Worker).
/// The stop token is polled at iteration boundaries only; the abort token also
/// interrupts rate limiter waits.
pub struct WorkerContext {
    index: usize,
    stream: Arc<str>,
    stop: CancellationToken,
    abort: CancellationToken,
    rate_limiter: RateLimiter,
    signal: Arc<SignalFactory>,
}

impl WorkerContext {
    /// Create a new context
    pub fn new(
        index: usize,
        stream: Arc<str>,
        stop: CancellationToken,
        abort: CancellationToken,
        rate_limiter: RateLimiter,
        signal: Arc<SignalFactory>,
    ) -> Self {
        Self {
            index,
            stream,
            stop,
            abort,
            rate_limiter,
            signal,
        }
    }

    /// Worker index within its stream
    pub fn index(&self) -> usize {
        self.index
    }

    /// Name of the owning stream
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Soft stop token shared by the stream's workers
    pub fn stop(&self) -> &CancellationToken {
        &self.stop
    }

    /// Run-wide abort token
    pub fn abort(&self) -> &CancellationToken {
        &self.abort
    }

    /// This worker's rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Payload factory shared by the stream's workers
    pub fn signal(&self) -> &SignalFactory {
        &self.signal
    }

    /// True once either the stop or the abort token is cancelled
    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled() || self.abort.is_cancelled()
    }
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("index", &self.index)
            .field("stream", &self.stream)
            .field("signal", &self.signal.kind())
            .field("rate_limiter", &self.rate_limiter)
            .field("stopping", &self.is_stopping())
            .finish()
    }
}
