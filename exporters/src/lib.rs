//! Bundled exporters for telemetrygen
//!
//! This crate provides implementations of the core `Exporter` trait for:
//!
//! - stdout or a file, one JSON document per line
//! - discard, which counts batches and drops them
//!
//! [`ExporterConfig`] selects one of them and serves as the engine's
//! `ExporterFactory`.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod discard;
mod stdout;

pub use config::{ExporterConfig, ExporterKind};
pub use discard::DiscardExporter;
pub use stdout::{SharedSink, StdoutExporter};
