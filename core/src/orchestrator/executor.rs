//! StreamOrchestrator execution logic

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{ErrorPolicy, StreamConfig};
use crate::error::{Error, Result};
use crate::payload::Resource;
use crate::signal::SignalFactory;
use crate::traits::{ExporterFactory, StopCondition};
use crate::worker::{WorkerBuilder, WorkerOutcome};

use super::aggregator::{aggregate_worker_stats, StreamReport};

/// StreamOrchestrator runs one stream configuration
///
/// Spawns the stream's workers, owns the optional duration watchdog, and
/// collects every worker's outcome into a [`StreamReport`].
pub struct StreamOrchestrator {
    /// Stream configuration
    pub(crate) config: StreamConfig,

    /// Exporter factory (shared across workers)
    pub(crate) exporter_factory: Arc<dyn ExporterFactory>,

    /// Soft stop shared by this stream's workers
    pub(crate) stop: CancellationToken,

    /// Run-wide abort
    pub(crate) abort: CancellationToken,
}

impl StreamOrchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction. The
    /// configuration is expected to be validated.
    pub fn new(
        config: StreamConfig,
        exporter_factory: Arc<dyn ExporterFactory>,
        stop: CancellationToken,
        abort: CancellationToken,
    ) -> Self {
        Self {
            config,
            exporter_factory,
            stop,
            abort,
        }
    }

    /// Ask every worker to stop at its next iteration boundary
    pub fn shutdown(&self) {
        self.stop.cancel();
    }

    /// The stream's stop token
    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    /// The run-wide abort token
    pub fn abort_token(&self) -> &CancellationToken {
        &self.abort
    }

    /// Get the stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Run the stream to completion
    ///
    /// Returns the aggregated report, or the first worker error. Later errors
    /// are logged.
    pub async fn run(&self) -> Result<StreamReport> {
        let start = Instant::now();
        let common = &self.config.common;
        let stream: Arc<str> = Arc::from(self.config.name());
        let stop_condition = self.config.stop_condition();

        let signal = Arc::new(SignalFactory::new(
            self.config.signal.clone(),
            common.telemetry_attributes.clone(),
        ));
        let resource = Arc::new(Resource::new(
            &common.service,
            common.resource_attributes.clone(),
        ));

        tracing::info!(
            stream = %stream,
            signal = %self.config.kind(),
            workers = common.workers,
            rate = common.rate,
            stop_condition = ?stop_condition,
            "Starting stream"
        );

        let mut workers = JoinSet::new();
        for index in 0..common.workers {
            let worker = WorkerBuilder::new(index)
                .stream(Arc::clone(&stream))
                .signal(Arc::clone(&signal))
                .exporter_factory(Arc::clone(&self.exporter_factory))
                .resource(Arc::clone(&resource))
                .stop_condition(stop_condition)
                .stop_token(self.stop.clone())
                .abort_token(self.abort.clone())
                .rate(common.rate)
                .seed(common.seed)
                .build()?;

            workers.spawn(worker.run());
        }

        let watchdog = match stop_condition {
            StopCondition::Duration(duration) => Some(tokio::spawn(watchdog(
                duration,
                self.stop.clone(),
                Arc::clone(&stream),
            ))),
            _ => None,
        };

        let mut stats = Vec::with_capacity(common.workers);
        let mut first_error: Option<Error> = None;

        while let Some(joined) = workers.join_next().await {
            let error = match joined {
                Ok(WorkerOutcome {
                    index,
                    stats: worker_stats,
                    result,
                }) => {
                    tracing::debug!(
                        stream = %stream,
                        worker_id = index,
                        exports = worker_stats.exports,
                        "Worker completed"
                    );
                    stats.push(worker_stats);
                    result.err()
                }
                Err(e) => Some(Error::Task {
                    stream: stream.to_string(),
                    message: e.to_string(),
                }),
            };

            let Some(error) = error else { continue };

            if first_error.is_none() {
                if common.error_policy == ErrorPolicy::AbortAll && !error.is_cancellation() {
                    tracing::warn!(
                        stream = %stream,
                        error = %error,
                        "Worker failed, aborting run"
                    );
                    self.abort.cancel();
                }
                first_error = Some(error);
            } else {
                tracing::error!(stream = %stream, error = %error, "Additional worker failure");
            }
        }

        // All workers are done; this also releases the watchdog
        self.stop.cancel();
        if let Some(handle) = watchdog {
            let _ = handle.await;
        }

        let report = StreamReport {
            stream: stream.to_string(),
            signal: self.config.kind(),
            stats: aggregate_worker_stats(&stats),
            elapsed: start.elapsed(),
        };

        if report.stats.workers_without_exporter > 0 {
            tracing::warn!(
                stream = %stream,
                workers_without_exporter = report.stats.workers_without_exporter,
                "Some workers ran without an exporter"
            );
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        tracing::info!(
            stream = %stream,
            elapsed_secs = report.elapsed.as_secs_f64(),
            exports = report.stats.total_exports,
            rate = report.stats.exports_per_second,
            "Stream completed"
        );

        Ok(report)
    }
}

/// Cancel `stop` once `duration` has elapsed, unless it is cancelled first
async fn watchdog(duration: Duration, stop: CancellationToken, stream: Arc<str>) {
    tokio::select! {
        _ = stop.cancelled() => {}
        _ = tokio::time::sleep(duration) => {
            tracing::debug!(stream = %stream, "Duration reached, stopping workers");
            stop.cancel();
        }
    }
}

impl std::fmt::Debug for StreamOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamOrchestrator")
            .field("config", &self.config)
            .field("stopped", &self.stop.is_cancelled())
            .field("aborted", &self.abort.is_cancelled())
            .finish()
    }
}
