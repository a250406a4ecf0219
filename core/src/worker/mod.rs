//! Worker module for emitting synthetic telemetry
//!
//! The Worker is the unit of concurrency in telemetrygen, responsible for the
//! loop: **build -> export -> throttle -> repeat**.
//!
//! Each Worker is a tokio task that:
//!
//! 1. Obtains its own exporter from the injected factory
//! 2. Builds one payload per iteration via the stream's SignalFactory
//! 3. Exports it; a failed export ends the worker
//! 4. Waits on its rate limiter
//! 5. Checks the stop condition at the iteration boundary
//! 6. Shuts the exporter down exactly once
//!
//! # Example
//!
//! ```ignore
//! use telemetrygen_core::worker::WorkerBuilder;
//! use telemetrygen_core::StopCondition;
//!
//! let worker = WorkerBuilder::new(0)
//!     .signal(signal)
//!     .exporter_factory(factory)
//!     .stop_condition(StopCondition::ItemCount(100))
//!     .build()?;
//!
//! let outcome = worker.run().await;
//! println!("Exported: {}", outcome.stats.exports);
//! ```

mod builder;
mod context;
mod executor;
mod rate_limiter;
mod stats;

pub use builder::WorkerBuilder;
pub use context::WorkerContext;
pub use executor::{Worker, WorkerOutcome};
pub use rate_limiter::{Cancelled, RateLimiter};
pub use stats::WorkerStats;
