//! Builder pattern for Worker construction

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_SERVICE_NAME;
use crate::error::{Error, Result};
use crate::payload::Resource;
use crate::signal::SignalFactory;
use crate::traits::{ExporterFactory, StopCondition};

use super::context::WorkerContext;
use super::executor::Worker;
use super::rate_limiter::RateLimiter;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .stream("cpu")
///     .signal(signal)
///     .exporter_factory(factory)
///     .stop_condition(StopCondition::ItemCount(100))
///     .rate(10.0)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    index: usize,
    stream: Option<Arc<str>>,
    signal: Option<Arc<SignalFactory>>,
    exporter_factory: Option<Arc<dyn ExporterFactory>>,
    resource: Option<Arc<Resource>>,
    stop_condition: Option<StopCondition>,
    stop: Option<CancellationToken>,
    abort: Option<CancellationToken>,
    rate: f64,
    seed: Option<u64>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker index
    pub fn new(index: usize) -> Self {
        Self {
            index,
            stream: None,
            signal: None,
            exporter_factory: None,
            resource: None,
            stop_condition: None,
            stop: None,
            abort: None,
            rate: 0.0,
            seed: None,
        }
    }

    /// Set the owning stream's name
    pub fn stream(mut self, name: impl Into<Arc<str>>) -> Self {
        self.stream = Some(name.into());
        self
    }

    /// Set the payload factory
    pub fn signal(mut self, signal: Arc<SignalFactory>) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Set the exporter factory
    pub fn exporter_factory(mut self, factory: Arc<dyn ExporterFactory>) -> Self {
        self.exporter_factory = Some(factory);
        self
    }

    /// Set the resource attached to every batch
    pub fn resource(mut self, resource: Arc<Resource>) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Set the stop condition
    pub fn stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = Some(condition);
        self
    }

    /// Set the shared stop token
    pub fn stop_token(mut self, token: CancellationToken) -> Self {
        self.stop = Some(token);
        self
    }

    /// Set the run-wide abort token
    pub fn abort_token(mut self, token: CancellationToken) -> Self {
        self.abort = Some(token);
        self
    }

    /// Set the rate limit (emissions per second, 0 = unlimited)
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Seed the worker's random source; the worker index is added to the seed
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if the signal, exporter factory or stop condition is missing.
    pub fn build(self) -> Result<Worker> {
        let signal = self.signal.ok_or(Error::missing_config("signal"))?;
        let exporter_factory = self
            .exporter_factory
            .ok_or(Error::missing_config("exporter_factory"))?;
        let stop_condition = self
            .stop_condition
            .ok_or(Error::missing_config("stop_condition"))?;

        let stream = self
            .stream
            .unwrap_or_else(|| Arc::from(signal.kind().as_str()));
        let resource = self.resource.unwrap_or_else(|| {
            Arc::new(Resource::new(DEFAULT_SERVICE_NAME, Default::default()))
        });
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.index as u64)),
            None => StdRng::from_entropy(),
        };

        let ctx = WorkerContext::new(
            self.index,
            stream,
            self.stop.unwrap_or_default(),
            self.abort.unwrap_or_default(),
            RateLimiter::new(self.rate),
            signal,
        );

        Ok(Worker::new(
            ctx,
            exporter_factory,
            resource,
            stop_condition,
            rng,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Attributes, MetricParams, SignalParams};
    use crate::test_support::MockFactory;

    fn signal() -> Arc<SignalFactory> {
        Arc::new(SignalFactory::new(
            SignalParams::Metric(MetricParams::default()),
            Attributes::new(),
        ))
    }

    #[test]
    fn test_builder_missing_signal() {
        let result = WorkerBuilder::new(0)
            .exporter_factory(Arc::new(MockFactory::new()))
            .stop_condition(StopCondition::ItemCount(10))
            .build();

        let err = result.unwrap_err();
        assert!(matches!(err, Error::MissingConfig("signal")));
    }

    #[test]
    fn test_builder_missing_exporter_factory() {
        let result = WorkerBuilder::new(0)
            .signal(signal())
            .stop_condition(StopCondition::ItemCount(10))
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("exporter_factory"));
    }

    #[test]
    fn test_builder_missing_stop_condition() {
        let result = WorkerBuilder::new(0)
            .signal(signal())
            .exporter_factory(Arc::new(MockFactory::new()))
            .build();

        assert!(matches!(
            result.unwrap_err(),
            Error::MissingConfig("stop_condition")
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let worker = WorkerBuilder::new(3)
            .signal(signal())
            .exporter_factory(Arc::new(MockFactory::new()))
            .stop_condition(StopCondition::ItemCount(1))
            .build()
            .unwrap();

        assert_eq!(worker.index(), 3);
        let debug = format!("{:?}", worker);
        assert!(debug.contains("\"metrics\""));
        assert!(debug.contains("ItemCount(1)"));
    }
}
