//! Builder pattern for StreamOrchestrator construction

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::traits::ExporterFactory;

use super::executor::StreamOrchestrator;

/// Builder for creating a StreamOrchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new(StreamConfig::metrics(params).with_workers(4))
///     .exporter_factory(factory)
///     .build()?;
///
/// let report = orchestrator.run().await?;
/// ```
pub struct OrchestratorBuilder {
    config: StreamConfig,
    exporter_factory: Option<Arc<dyn ExporterFactory>>,
    parent_stop: Option<CancellationToken>,
    abort: Option<CancellationToken>,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder for one stream
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            exporter_factory: None,
            parent_stop: None,
            abort: None,
        }
    }

    /// Set the exporter factory
    pub fn exporter_factory(mut self, factory: Arc<dyn ExporterFactory>) -> Self {
        self.exporter_factory = Some(factory);
        self
    }

    /// Derive the stream's stop token from `token`
    ///
    /// Cancelling the parent stops this stream; stopping this stream leaves
    /// the parent untouched.
    pub fn parent_stop(mut self, token: CancellationToken) -> Self {
        self.parent_stop = Some(token);
        self
    }

    /// Share a run-wide abort token
    pub fn abort_token(mut self, token: CancellationToken) -> Self {
        self.abort = Some(token);
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if the exporter factory is not set or if the stream
    /// configuration is invalid.
    pub fn build(self) -> Result<StreamOrchestrator> {
        let exporter_factory = self
            .exporter_factory
            .ok_or_else(|| Error::missing_config("exporter_factory"))?;

        self.config.validate()?;

        let stop = self
            .parent_stop
            .map(|parent| parent.child_token())
            .unwrap_or_default();
        let abort = self.abort.unwrap_or_default();

        Ok(StreamOrchestrator::new(
            self.config,
            exporter_factory,
            stop,
            abort,
        ))
    }
}
