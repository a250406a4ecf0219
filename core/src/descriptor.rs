//! Batch descriptor for multi-stream runs
//!
//! A descriptor is a YAML document with three optional top-level lists,
//! `metrics`, `logs` and `traces`. Every entry uses the single-stream field
//! set:
//!
//! ```yaml
//! metrics:
//!   - name: cpu
//!     workers: 2
//!     rate: 10
//!     duration: 30s
//!     metric_type: histogram
//!     histogram_bucket_bounds: [1, 5, 10]
//! logs:
//!   - body: hello
//!     severity: warn
//!     count: 100
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{
    CommonConfig, ConfigError, LogParams, MetricParams, SignalParams, StreamConfig, TraceParams,
};

/// One descriptor entry: common settings plus signal parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamEntry<P> {
    /// Shared settings
    #[serde(flatten)]
    pub common: CommonConfig,

    /// Signal-specific parameters
    #[serde(flatten)]
    pub params: P,

    /// Keys matching neither set, rejected by [`Descriptor::validate`]
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_yaml::Value>,
}

impl<P> StreamEntry<P> {
    fn stream_name(&self, list: &str, index: usize) -> String {
        match &self.common.name {
            Some(name) => name.clone(),
            None => format!("{list}[{index}]"),
        }
    }

    fn check_keys(&self, list: &str, index: usize) -> Result<(), DescriptorError> {
        if self.unknown.is_empty() {
            return Ok(());
        }
        Err(DescriptorError::UnknownFields {
            stream: self.stream_name(list, index),
            fields: self.unknown.keys().cloned().collect(),
        })
    }
}

/// Parsed batch descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Descriptor {
    /// Metric streams
    pub metrics: Vec<StreamEntry<MetricParams>>,

    /// Log streams
    pub logs: Vec<StreamEntry<LogParams>>,

    /// Trace streams
    pub traces: Vec<StreamEntry<TraceParams>>,
}

impl Descriptor {
    /// Parse a descriptor from YAML text
    pub fn from_yaml(text: &str) -> Result<Self, DescriptorError> {
        let descriptor: Descriptor = serde_yaml::from_str(text)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Read and parse a descriptor file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "Loaded descriptor");
        Self::from_yaml(&text)
    }

    /// Number of streams described
    pub fn len(&self) -> usize {
        self.metrics.len() + self.logs.len() + self.traces.len()
    }

    /// Returns true if no stream is described
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into stream configurations, metrics first, then logs, then traces
    ///
    /// Unnamed entries are named after their list and position, e.g. `logs[1]`.
    pub fn streams(&self) -> Vec<StreamConfig> {
        let metrics = self.metrics.iter().enumerate().map(|(i, entry)| {
            to_stream("metrics", i, entry, SignalParams::Metric(entry.params.clone()))
        });
        let logs = self.logs.iter().enumerate().map(|(i, entry)| {
            to_stream("logs", i, entry, SignalParams::Log(entry.params.clone()))
        });
        let traces = self.traces.iter().enumerate().map(|(i, entry)| {
            to_stream("traces", i, entry, SignalParams::Trace(entry.params.clone()))
        });

        metrics.chain(logs).chain(traces).collect()
    }

    /// Validate every entry
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.is_empty() {
            return Err(DescriptorError::Empty);
        }

        for (i, entry) in self.metrics.iter().enumerate() {
            entry.check_keys("metrics", i)?;
        }
        for (i, entry) in self.logs.iter().enumerate() {
            entry.check_keys("logs", i)?;
        }
        for (i, entry) in self.traces.iter().enumerate() {
            entry.check_keys("traces", i)?;
        }

        for stream in self.streams() {
            stream
                .validate()
                .map_err(|source| DescriptorError::Invalid {
                    stream: stream.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}

fn to_stream<P>(list: &str, index: usize, entry: &StreamEntry<P>, signal: SignalParams) -> StreamConfig {
    let mut common = entry.common.clone();
    common.name = Some(entry.stream_name(list, index));
    StreamConfig { common, signal }
}

/// Descriptor loading errors
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// File could not be read
    #[error("failed to read descriptor {}: {source}", path.display())]
    Io {
        /// Descriptor path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// YAML could not be parsed into a descriptor
    #[error("failed to parse descriptor: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The descriptor lists no streams
    #[error("descriptor contains no streams")]
    Empty,

    /// An entry carries keys no stream setting matches
    #[error("unknown fields in stream '{stream}': {}", fields.join(", "))]
    UnknownFields {
        /// Stream name
        stream: String,
        /// Unrecognized keys, sorted
        fields: Vec<String>,
    },

    /// An entry failed validation
    #[error("invalid stream '{stream}': {source}")]
    Invalid {
        /// Stream name
        stream: String,
        /// Validation failure
        source: ConfigError,
    },
}
