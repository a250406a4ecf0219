//! Worker execution loop

use std::sync::Arc;

use rand::rngs::StdRng;

use crate::error::{Error, Result};
use crate::payload::{ExportBatch, Resource};
use crate::traits::{Exporter, ExporterFactory, StopCondition};

use super::context::WorkerContext;
use super::stats::WorkerStats;

/// Result of one worker run
///
/// Stats are returned even when the worker failed, so the orchestrator can
/// account for the exports that did happen.
#[derive(Debug)]
pub struct WorkerOutcome {
    /// Worker index within its stream
    pub index: usize,

    /// Counters collected during the run
    pub stats: WorkerStats,

    /// `Err` if the worker ended on an export failure or an abort
    pub result: Result<()>,
}

/// Worker runs the generate -> export -> throttle loop for one task
///
/// Lifecycle: obtain an exporter, emit until a stop condition is met, then
/// shut the exporter down exactly once.
pub struct Worker {
    /// Index, tokens, rate limiter and payload factory
    ctx: WorkerContext,

    /// Creates this worker's exporter
    exporter_factory: Arc<dyn ExporterFactory>,

    /// Resource attached to every batch
    resource: Arc<Resource>,

    /// Stop condition
    stop_condition: StopCondition,

    /// Per-worker random source
    rng: StdRng,
}

impl Worker {
    /// Create a new worker
    ///
    /// Use `WorkerBuilder` for a more ergonomic construction.
    pub fn new(
        ctx: WorkerContext,
        exporter_factory: Arc<dyn ExporterFactory>,
        resource: Arc<Resource>,
        stop_condition: StopCondition,
        rng: StdRng,
    ) -> Self {
        Self {
            ctx,
            exporter_factory,
            resource,
            stop_condition,
            rng,
        }
    }

    /// Run the worker to completion
    pub async fn run(mut self) -> WorkerOutcome {
        let index = self.ctx.index();
        let mut stats = WorkerStats::new();
        stats.start();

        let exporter = match self.exporter_factory.create_exporter(self.ctx.signal().kind()) {
            Ok(exporter) => exporter,
            Err(e) => {
                tracing::warn!(
                    stream = self.ctx.stream(),
                    worker_id = index,
                    error = %e,
                    "Failed to create exporter, worker will not emit"
                );
                stats.exporter_unavailable = true;
                stats.stop();
                return WorkerOutcome {
                    index,
                    stats,
                    result: Ok(()),
                };
            }
        };

        tracing::debug!(
            stream = self.ctx.stream(),
            worker_id = index,
            exporter = exporter.name(),
            "Worker started"
        );

        let result = self.emit(exporter.as_ref(), &mut stats).await;

        if let Err(e) = exporter.shutdown().await {
            stats.shutdown_failed = true;
            tracing::warn!(
                stream = self.ctx.stream(),
                worker_id = index,
                error = %e,
                "Exporter shutdown failed"
            );
        }

        stats.stop();
        tracing::debug!(
            stream = self.ctx.stream(),
            worker_id = index,
            exports = stats.exports,
            failed = result.is_err(),
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        WorkerOutcome {
            index,
            stats,
            result,
        }
    }

    /// The emission loop; the body always runs at least once
    async fn emit(&mut self, exporter: &dyn Exporter, stats: &mut WorkerStats) -> Result<()> {
        let mut iteration: u64 = 0;

        loop {
            let payload = self.ctx.signal().build(iteration, &mut self.rng);
            let batch = ExportBatch::new(Arc::clone(&self.resource), payload);

            if let Err(source) = exporter.export(&batch).await {
                stats.record_export_error();
                tracing::error!(
                    stream = self.ctx.stream(),
                    worker_id = self.ctx.index(),
                    iteration,
                    error = %source,
                    "Export failed"
                );
                return Err(Error::Export {
                    stream: self.ctx.stream().to_string(),
                    worker: self.ctx.index(),
                    iteration,
                    source,
                });
            }
            stats.record_export();

            if self
                .ctx
                .rate_limiter()
                .acquire(self.ctx.abort())
                .await
                .is_err()
            {
                tracing::debug!(
                    stream = self.ctx.stream(),
                    worker_id = self.ctx.index(),
                    iteration,
                    "Rate limiter wait aborted"
                );
                return Err(Error::Cancelled {
                    stream: self.ctx.stream().to_string(),
                    worker: self.ctx.index(),
                    iteration,
                });
            }

            iteration += 1;

            if self.should_stop(iteration) {
                tracing::debug!(
                    stream = self.ctx.stream(),
                    worker_id = self.ctx.index(),
                    iterations = iteration,
                    "Worker reached stop condition"
                );
                return Ok(());
            }
        }
    }

    /// Check the stop condition at an iteration boundary
    fn should_stop(&self, iterations: u64) -> bool {
        if self.ctx.is_stopping() {
            return true;
        }

        match self.stop_condition {
            StopCondition::ItemCount(cap) => iterations >= cap,
            // Duration is enforced by the orchestrator's watchdog via the stop token
            StopCondition::Duration(_) | StopCondition::Indefinite => false,
        }
    }

    /// Get the worker index
    pub fn index(&self) -> usize {
        self.ctx.index()
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("ctx", &self.ctx)
            .field("resource", &self.resource)
            .field("stop_condition", &self.stop_condition)
            .finish()
    }
}
