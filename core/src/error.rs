//! Error types for telemetrygen-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::descriptor::DescriptorError;
use crate::traits::ExportError;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid stream configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Batch descriptor could not be read, parsed or validated
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// A required builder field was not provided
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// The exporter rejected a batch; the worker stops at this iteration
    #[error("stream '{stream}' worker {worker}: export failed at iteration {iteration}: {source}")]
    Export {
        /// Stream name
        stream: String,
        /// Worker index within the stream
        worker: usize,
        /// Iteration at which the export failed
        iteration: u64,
        /// Underlying exporter error
        #[source]
        source: ExportError,
    },

    /// The run was aborted while the worker was waiting on its rate limiter
    #[error("stream '{stream}' worker {worker}: throttle wait cancelled at iteration {iteration}")]
    Cancelled {
        /// Stream name
        stream: String,
        /// Worker index within the stream
        worker: usize,
        /// Iteration at which the wait was cancelled
        iteration: u64,
    },

    /// A worker or stream task panicked or was aborted by the runtime
    #[error("stream '{stream}': task failed: {message}")]
    Task {
        /// Stream name
        stream: String,
        /// Join error description
        message: String,
    },
}

impl Error {
    /// Create a missing configuration error
    pub fn missing_config(field: &'static str) -> Self {
        Error::MissingConfig(field)
    }

    /// Returns true if this error was caused by run-wide cancellation
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
