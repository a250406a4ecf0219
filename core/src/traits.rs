//! Core traits for exporters and run termination
//!
//! The engine never encodes or transports telemetry itself. It hands every
//! [`ExportBatch`] to an [`Exporter`] obtained from an injected
//! [`ExporterFactory`]; implementations live in the exporters crate or in
//! the embedding application.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::SignalKind;
use crate::payload::ExportBatch;

// ============================================================================
// Exporter Trait
// ============================================================================

/// Destination for generated batches
///
/// Each worker owns one exporter for its whole lifetime and calls
/// [`shutdown`](Exporter::shutdown) exactly once after its last export.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Exporter identifier (e.g., "stdout", "discard")
    fn name(&self) -> &str;

    /// Deliver one batch
    async fn export(&self, batch: &ExportBatch) -> Result<(), ExportError>;

    /// Flush and release resources
    async fn shutdown(&self) -> Result<(), ExportError>;
}

/// Creates one exporter per worker
pub trait ExporterFactory: Send + Sync {
    /// Create an exporter for the given signal kind
    fn create_exporter(&self, signal: SignalKind) -> Result<Box<dyn Exporter>, ExportError>;
}

impl<F> ExporterFactory for F
where
    F: Fn(SignalKind) -> Result<Box<dyn Exporter>, ExportError> + Send + Sync,
{
    fn create_exporter(&self, signal: SignalKind) -> Result<Box<dyn Exporter>, ExportError> {
        self(signal)
    }
}

/// Exporter errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Exporter could not be constructed
    #[error("exporter initialization failed: {0}")]
    Init(String),

    /// Batch was rejected or could not be delivered
    #[error("export failed: {0}")]
    Export(String),

    /// Batch could not be serialized
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Flush or teardown failed
    #[error("shutdown failed: {0}")]
    Shutdown(String),

    /// Export attempted after shutdown
    #[error("exporter is shut down")]
    Closed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Stop Condition
// ============================================================================

/// Stream termination condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StopCondition {
    /// Each worker emits exactly N payloads
    ItemCount(u64),

    /// Workers run until the duration watchdog fires
    Duration(Duration),

    /// Run until explicitly stopped (Ctrl+C)
    Indefinite,
}

impl Default for StopCondition {
    fn default() -> Self {
        StopCondition::ItemCount(1)
    }
}
