//! Concurrent execution of every stream in a descriptor
//!
//! The [`MultiStreamRunner`] launches one [`StreamOrchestrator`] per stream
//! configuration, all sharing one stop token and one abort token, and waits
//! for every stream to finish. Streams are isolated: a failing stream is
//! reported and the others keep running, unless a stream's error policy
//! cancels the shared abort token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::SignalKind;
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::orchestrator::{OrchestratorBuilder, StreamOrchestrator, StreamReport};
use crate::traits::ExporterFactory;

/// Outcome of one stream in a multi-stream run
#[derive(Debug)]
pub struct StreamOutcome {
    /// Stream name
    pub name: String,

    /// Signal kind
    pub signal: SignalKind,

    /// Report, or the stream's first error
    pub result: Result<StreamReport>,
}

/// Summary of a multi-stream run
#[derive(Debug)]
pub struct RunReport {
    /// Per-stream outcomes, in descriptor order
    pub streams: Vec<StreamOutcome>,

    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

impl RunReport {
    /// Returns true if every stream completed without error
    pub fn is_success(&self) -> bool {
        self.streams.iter().all(|s| s.result.is_ok())
    }

    /// Streams that completed
    pub fn succeeded(&self) -> impl Iterator<Item = &StreamReport> {
        self.streams.iter().filter_map(|s| s.result.as_ref().ok())
    }

    /// Streams that failed, with their errors
    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.streams
            .iter()
            .filter_map(|s| s.result.as_ref().err().map(|e| (s.name.as_str(), e)))
    }

    /// Total exports across successful streams
    pub fn total_exports(&self) -> u64 {
        self.succeeded().map(StreamReport::total_exports).sum()
    }
}

/// Runs every stream of a descriptor concurrently
pub struct MultiStreamRunner {
    descriptor: Descriptor,
    exporter_factory: Arc<dyn ExporterFactory>,
    stop: CancellationToken,
    abort: CancellationToken,
}

impl MultiStreamRunner {
    /// Create a runner for a parsed descriptor
    pub fn new(descriptor: Descriptor, exporter_factory: Arc<dyn ExporterFactory>) -> Self {
        Self {
            descriptor,
            exporter_factory,
            stop: CancellationToken::new(),
            abort: CancellationToken::new(),
        }
    }

    /// Use an externally owned stop token, e.g. one cancelled on Ctrl+C
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.stop = token;
        self
    }

    /// Use an externally owned abort token
    pub fn with_abort_token(mut self, token: CancellationToken) -> Self {
        self.abort = token;
        self
    }

    /// Ask every stream to stop at its workers' next iteration boundary
    pub fn shutdown(&self) {
        self.stop.cancel();
    }

    /// The shared stop token
    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    /// The shared abort token
    pub fn abort_token(&self) -> &CancellationToken {
        &self.abort
    }

    /// Get the descriptor
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Run every stream and wait for all of them
    ///
    /// # Errors
    ///
    /// Fails before any stream starts if the descriptor or any stream
    /// configuration is invalid. Stream failures are reported in the
    /// [`RunReport`], not returned.
    pub async fn run(&self) -> Result<RunReport> {
        self.descriptor.validate()?;

        let orchestrators = self
            .descriptor
            .streams()
            .into_iter()
            .map(|config| {
                OrchestratorBuilder::new(config)
                    .exporter_factory(Arc::clone(&self.exporter_factory))
                    .parent_stop(self.stop.clone())
                    .abort_token(self.abort.clone())
                    .build()
            })
            .collect::<Result<Vec<StreamOrchestrator>>>()?;

        let start = Instant::now();
        tracing::info!(streams = orchestrators.len(), "Starting streams");

        let mut meta = Vec::with_capacity(orchestrators.len());
        let mut handles = Vec::with_capacity(orchestrators.len());
        for orchestrator in orchestrators {
            meta.push((
                orchestrator.config().name().to_string(),
                orchestrator.config().kind(),
            ));
            handles.push(tokio::spawn(async move { orchestrator.run().await }));
        }

        let results = futures::future::join_all(handles).await;

        let streams: Vec<StreamOutcome> = meta
            .into_iter()
            .zip(results)
            .map(|((name, signal), joined)| {
                let result = joined.unwrap_or_else(|e| {
                    Err(Error::Task {
                        stream: name.clone(),
                        message: e.to_string(),
                    })
                });

                match &result {
                    Ok(report) => tracing::info!(
                        stream = %name,
                        signal = %signal,
                        exports = report.total_exports(),
                        workers_without_exporter = report.stats.workers_without_exporter,
                        "Stream finished"
                    ),
                    Err(e) => tracing::error!(
                        stream = %name,
                        signal = %signal,
                        error = %e,
                        "Stream failed"
                    ),
                }

                StreamOutcome {
                    name,
                    signal,
                    result,
                }
            })
            .collect();

        let report = RunReport {
            streams,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            streams = report.streams.len(),
            failed = report.failed().count(),
            exports = report.total_exports(),
            elapsed_secs = report.elapsed.as_secs_f64(),
            "All streams finished"
        );

        Ok(report)
    }
}

impl std::fmt::Debug for MultiStreamRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiStreamRunner")
            .field("streams", &self.descriptor.len())
            .field("stopped", &self.stop.is_cancelled())
            .field("aborted", &self.abort.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorError;
    use crate::payload::Payload;
    use crate::test_support::MockFactory;
    use crate::traits::{ExportError, Exporter};

    const THREE_KINDS: &str = r#"
metrics:
  - name: gauges
    workers: 2
    count: 5
logs:
  - name: logs
    count: 4
traces:
  - name: traces
    count: 3
    child_spans: 2
"#;

    #[tokio::test]
    async fn test_run_all_signal_kinds() {
        let factory = Arc::new(MockFactory::new());
        let runner = MultiStreamRunner::new(
            Descriptor::from_yaml(THREE_KINDS).unwrap(),
            Arc::clone(&factory) as Arc<dyn ExporterFactory>,
        );

        let report = runner.run().await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.streams.len(), 3);
        assert_eq!(report.streams[0].name, "gauges");
        assert_eq!(report.streams[1].signal, SignalKind::Log);
        assert_eq!(report.total_exports(), 10 + 4 + 3);

        let batches = factory.state.batches();
        let traces = batches
            .iter()
            .filter_map(|b| match &b.payload {
                Payload::Trace(trace) => Some(trace),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(traces.len(), 3);
        assert!(traces.iter().all(|t| t.spans.len() == 3));
    }

    #[tokio::test]
    async fn test_exporter_failure_in_one_stream_isolated() {
        // Log exporters cannot be created; metric and trace streams are unaffected
        let factory = |signal: SignalKind| -> std::result::Result<Box<dyn Exporter>, ExportError> {
            match signal {
                SignalKind::Log => Err(ExportError::Init("no log backend".into())),
                _ => MockFactory::new().create_exporter(signal),
            }
        };
        let runner = MultiStreamRunner::new(
            Descriptor::from_yaml(THREE_KINDS).unwrap(),
            Arc::new(factory),
        );

        let report = runner.run().await.unwrap();

        assert!(report.is_success());
        let logs = report.streams[1].result.as_ref().unwrap();
        assert_eq!(logs.stats.workers_without_exporter, 1);
        assert_eq!(logs.total_exports(), 0);
        assert_eq!(report.total_exports(), 10 + 3);
    }

    #[tokio::test]
    async fn test_failing_stream_reported_others_complete() {
        let factory = Arc::new(MockFactory::new().with_single_failure_at(0));
        let descriptor = Descriptor::from_yaml(
            "metrics:\n  - name: a\n    count: 5\n  - name: b\n    count: 5\n  - name: c\n    count: 5\n",
        )
        .unwrap();
        let runner = MultiStreamRunner::new(descriptor, factory);

        let report = runner.run().await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.succeeded().count(), 2);
        assert_eq!(report.total_exports(), 10);
        assert!(!runner.abort_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_every_stream() {
        let factory = Arc::new(MockFactory::new());
        let descriptor = Descriptor::from_yaml(
            "metrics:\n  - count: 0\n    rate: 50\nlogs:\n  - count: 0\n    rate: 50\n",
        )
        .unwrap();
        let stop = CancellationToken::new();
        let runner = MultiStreamRunner::new(descriptor, factory).with_shutdown_token(stop.clone());

        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let report = tokio::time::timeout(Duration::from_secs(2), runner.run())
            .await
            .expect("streams should stop")
            .unwrap();

        assert!(report.is_success());
        assert!(report.streams.iter().all(|s| {
            s.result
                .as_ref()
                .map(|r| r.total_exports() >= 1)
                .unwrap_or(false)
        }));
    }

    #[tokio::test]
    async fn test_invalid_descriptor_fails_before_start() {
        let factory = Arc::new(MockFactory::new());
        let mut descriptor = Descriptor::from_yaml(THREE_KINDS).unwrap();
        descriptor.logs[0].common.workers = 0;
        let runner = MultiStreamRunner::new(descriptor, Arc::clone(&factory) as Arc<dyn ExporterFactory>);

        let err = runner.run().await.unwrap_err();

        assert!(matches!(
            err,
            Error::Descriptor(DescriptorError::Invalid { .. })
        ));
        assert_eq!(factory.state.created(), 0);
    }

    #[test]
    fn test_debug_format() {
        let runner = MultiStreamRunner::new(
            Descriptor {
                metrics: vec![Default::default()],
                ..Default::default()
            },
            Arc::new(MockFactory::new()),
        );
        let debug = format!("{:?}", runner);
        assert!(debug.contains("streams: 1"));
    }
}
