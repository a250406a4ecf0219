//! Orchestrator for single-stream lifecycle management
//!
//! The StreamOrchestrator coordinates one stream configuration:
//! - Spawning one worker task per configured worker
//! - Stopping workers after the configured duration via a watchdog
//! - Escalating failures according to the stream's error policy
//! - Collecting worker stats into a report
//!
//! # Example
//!
//! ```ignore
//! use telemetrygen_core::{OrchestratorBuilder, StreamConfig, MetricParams};
//!
//! let orchestrator = OrchestratorBuilder::new(
//!     StreamConfig::metrics(MetricParams::default())
//!         .with_workers(4)
//!         .with_rate(10.0)
//!         .with_duration(Duration::from_secs(30)),
//! )
//! .exporter_factory(factory)
//! .build()?;
//!
//! let report = orchestrator.run().await?;
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{aggregate_worker_stats, AggregatedStats, StreamReport};
pub use builder::OrchestratorBuilder;
pub use executor::StreamOrchestrator;
