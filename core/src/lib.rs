//! telemetrygen-core: Generation and orchestration engine for synthetic telemetry
//!
//! This crate provides everything needed to emit configurable streams of
//! metrics, logs and traces against an injected exporter, including:
//!
//! - Stream configuration and the batch descriptor
//! - Payload synthesis (gauge, sum, histogram, log record, trace)
//! - Rate-limited workers and per-stream orchestration
//! - Concurrent multi-stream runs
//! - Error handling
//!
//! Encoding and transport are left to [`Exporter`] implementations.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod orchestrator;
pub mod payload;
pub mod runner;
pub mod signal;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use config::*;
pub use descriptor::{Descriptor, DescriptorError, StreamEntry};
pub use error::{Error, Result};
pub use orchestrator::{AggregatedStats, OrchestratorBuilder, StreamOrchestrator, StreamReport};
pub use payload::*;
pub use runner::{MultiStreamRunner, RunReport, StreamOutcome};
pub use signal::SignalFactory;
pub use traits::*;
pub use worker::{RateLimiter, Worker, WorkerBuilder, WorkerOutcome, WorkerStats};
