//! Stream configuration types
//!
//! A [`StreamConfig`] fully describes one independently terminating generation
//! run: how many workers, how fast, for how long, and which signal to emit.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::traits::StopCondition;

/// Default histogram bucket upper bounds
pub const DEFAULT_HISTOGRAM_BOUNDS: [f64; 7] = [2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0];

/// Default service name attached to every resource
pub const DEFAULT_SERVICE_NAME: &str = "telemetrygen";

// ============================================================================
// Signal kinds and variants
// ============================================================================

/// Kind of telemetry signal a stream emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Metric data points
    Metric,
    /// Log records
    Log,
    /// Trace spans
    Trace,
}

impl SignalKind {
    /// Returns the identifier string for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Metric => "metrics",
            SignalKind::Log => "logs",
            SignalKind::Trace => "traces",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric data point shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricVariant {
    /// Instantaneous value
    #[default]
    #[serde(alias = "Gauge")]
    Gauge,
    /// Cumulative sum
    #[serde(alias = "Sum")]
    Sum,
    /// Explicit-bucket histogram
    #[serde(alias = "Histogram")]
    Histogram,
}

impl fmt::Display for MetricVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricVariant::Gauge => write!(f, "gauge"),
            MetricVariant::Sum => write!(f, "sum"),
            MetricVariant::Histogram => write!(f, "histogram"),
        }
    }
}

impl FromStr for MetricVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gauge" => Ok(MetricVariant::Gauge),
            "sum" => Ok(MetricVariant::Sum),
            "histogram" => Ok(MetricVariant::Histogram),
            _ => Err(ConfigError::UnknownVariant {
                field: "metric type",
                value: s.to_string(),
            }),
        }
    }
}

/// Log record severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No severity set
    Unspecified,
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level
    #[default]
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
    /// Fatal level
    Fatal,
}

impl Severity {
    /// Canonical severity number
    pub fn number(&self) -> u8 {
        match self {
            Severity::Unspecified => 0,
            Severity::Trace => 1,
            Severity::Debug => 5,
            Severity::Info => 9,
            Severity::Warn => 13,
            Severity::Error => 17,
            Severity::Fatal => 21,
        }
    }

    /// Canonical severity text
    pub fn text(&self) -> &'static str {
        match self {
            Severity::Unspecified => "",
            Severity::Trace => "Trace",
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warn => "Warn",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        }
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "unspecified" => Ok(Severity::Unspecified),
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            _ => Err(ConfigError::UnknownVariant {
                field: "severity",
                value: s.to_string(),
            }),
        }
    }
}

/// Status recorded on generated spans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    /// Status not set
    #[default]
    Unset,
    /// Span completed successfully
    Ok,
    /// Span completed with an error
    Error,
}

impl FromStr for SpanStatus {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unset" | "0" => Ok(SpanStatus::Unset),
            "ok" | "1" => Ok(SpanStatus::Ok),
            "error" | "2" => Ok(SpanStatus::Error),
            _ => Err(ConfigError::UnknownVariant {
                field: "status code",
                value: s.to_string(),
            }),
        }
    }
}

/// How a stream reacts when one of its workers fails mid-run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// The failing worker stops; siblings and other streams keep going
    #[default]
    Isolate,
    /// The first failure aborts every worker of every stream sharing the abort token
    AbortAll,
}

// ============================================================================
// Attributes
// ============================================================================

/// Attribute value attached to payloads or resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Double(f64),
    /// String value
    String(String),
}

impl AttributeValue {
    /// Parse a `key=value` pair as given on the command line.
    ///
    /// Quoted values are strings, `true`/`false` are booleans, integers are
    /// integers; anything else is kept as a string.
    pub fn parse_pair(input: &str) -> Result<(String, AttributeValue), ConfigError> {
        let (key, raw) = input
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidAttribute(input.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::InvalidAttribute(input.to_string()));
        }

        let raw = raw.trim();
        let value = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            AttributeValue::String(raw[1..raw.len() - 1].to_string())
        } else if let Ok(b) = raw.parse::<bool>() {
            AttributeValue::Bool(b)
        } else if let Ok(i) = raw.parse::<i64>() {
            AttributeValue::Int(i)
        } else {
            AttributeValue::String(raw.to_string())
        };

        Ok((key.to_string(), value))
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Double(d) => write!(f, "{d}"),
            AttributeValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

/// Ordered attribute set
pub type Attributes = BTreeMap<String, AttributeValue>;

// ============================================================================
// Signal parameters
// ============================================================================

/// Metric-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricParams {
    /// Name of the generated metric
    pub metric_name: String,

    /// Data point shape
    pub metric_type: MetricVariant,

    /// Draw random values instead of using the iteration counter
    pub random_values: bool,

    /// Histogram bucket upper bounds, strictly ascending
    pub histogram_bucket_bounds: Vec<f64>,
}

impl Default for MetricParams {
    fn default() -> Self {
        Self {
            metric_name: "gen".to_string(),
            metric_type: MetricVariant::Gauge,
            random_values: false,
            histogram_bucket_bounds: DEFAULT_HISTOGRAM_BOUNDS.to_vec(),
        }
    }
}

impl MetricParams {
    /// Create parameters for the given variant
    pub fn new(metric_type: MetricVariant) -> Self {
        Self {
            metric_type,
            ..Default::default()
        }
    }

    /// Enable or disable random values
    pub fn with_random_values(mut self, random: bool) -> Self {
        self.random_values = random;
        self
    }

    /// Set histogram bucket bounds
    pub fn with_bucket_bounds(mut self, bounds: Vec<f64>) -> Self {
        self.histogram_bucket_bounds = bounds;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.metric_type != MetricVariant::Histogram {
            return Ok(());
        }

        let bounds = &self.histogram_bucket_bounds;
        if bounds.is_empty() {
            return Err(ConfigError::InvalidHistogramBounds(
                "at least one bucket bound is required".into(),
            ));
        }
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(ConfigError::InvalidHistogramBounds(
                "bucket bounds must be finite".into(),
            ));
        }
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::InvalidHistogramBounds(format!(
                "bucket bounds must be strictly ascending: {bounds:?}"
            )));
        }
        if self.random_values && bounds[bounds.len() - 1] < 1.0 {
            return Err(ConfigError::InvalidHistogramBounds(
                "largest bucket bound must be at least 1 when random values are enabled".into(),
            ));
        }

        Ok(())
    }
}

/// Log-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogParams {
    /// Log record body
    pub body: String,

    /// Log record severity
    pub severity: Severity,
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            body: "the message".to_string(),
            severity: Severity::Info,
        }
    }
}

/// Trace-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceParams {
    /// Number of child spans generated under each root span
    pub child_spans: usize,

    /// Duration of every generated span
    #[serde(with = "humantime_serde")]
    pub span_duration: Duration,

    /// Status recorded on every span
    pub status_code: SpanStatus,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            child_spans: 1,
            span_duration: Duration::from_micros(123),
            status_code: SpanStatus::Unset,
        }
    }
}

/// Signal-specific parameters, one variant per signal kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "lowercase")]
pub enum SignalParams {
    /// Emit metric data points
    Metric(MetricParams),
    /// Emit log records
    Log(LogParams),
    /// Emit traces
    Trace(TraceParams),
}

impl SignalParams {
    /// The signal kind these parameters produce
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalParams::Metric(_) => SignalKind::Metric,
            SignalParams::Log(_) => SignalKind::Log,
            SignalParams::Trace(_) => SignalKind::Trace,
        }
    }
}

// ============================================================================
// Stream configuration
// ============================================================================

/// Settings shared by every signal kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonConfig {
    /// Stream name used in logs and reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Number of concurrent workers
    pub workers: usize,

    /// Emissions per second per worker (0 = unlimited)
    pub rate: f64,

    /// Total run length; when non-zero it overrides `count`
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,

    /// Emissions per worker when no duration is set (0 = run until stopped)
    pub count: u64,

    /// Service name recorded on the resource
    pub service: String,

    /// Attributes attached to every payload
    pub telemetry_attributes: Attributes,

    /// Extra attributes attached to the resource
    pub resource_attributes: Attributes,

    /// Seed for reproducible random payloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Reaction to a worker failure
    pub error_policy: ErrorPolicy,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            name: None,
            workers: 1,
            rate: 0.0,
            duration: None,
            count: 1,
            service: DEFAULT_SERVICE_NAME.to_string(),
            telemetry_attributes: Attributes::new(),
            resource_attributes: Attributes::new(),
            seed: None,
            error_policy: ErrorPolicy::Isolate,
        }
    }
}

/// Complete configuration of one stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Shared settings
    pub common: CommonConfig,

    /// Signal-specific parameters
    pub signal: SignalParams,
}

impl StreamConfig {
    /// Create a stream with default settings for the given signal
    pub fn new(signal: SignalParams) -> Self {
        Self {
            common: CommonConfig::default(),
            signal,
        }
    }

    /// Create a metric stream
    pub fn metrics(params: MetricParams) -> Self {
        Self::new(SignalParams::Metric(params))
    }

    /// Create a log stream
    pub fn logs(params: LogParams) -> Self {
        Self::new(SignalParams::Log(params))
    }

    /// Create a trace stream
    pub fn traces(params: TraceParams) -> Self {
        Self::new(SignalParams::Trace(params))
    }

    /// Set the stream name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.common.name = Some(name.into());
        self
    }

    /// Set the worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.common.workers = workers;
        self
    }

    /// Set the per-worker rate
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.common.rate = rate;
        self
    }

    /// Set the run duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.common.duration = Some(duration);
        self
    }

    /// Set the per-worker item count
    pub fn with_count(mut self, count: u64) -> Self {
        self.common.count = count;
        self
    }

    /// Set the RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.common.seed = Some(seed);
        self
    }

    /// Set the error policy
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.common.error_policy = policy;
        self
    }

    /// Add a payload attribute
    pub fn with_telemetry_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.common
            .telemetry_attributes
            .insert(key.into(), value.into());
        self
    }

    /// Signal kind of this stream
    pub fn kind(&self) -> SignalKind {
        self.signal.kind()
    }

    /// Stream name, falling back to the signal kind
    pub fn name(&self) -> &str {
        self.common
            .name
            .as_deref()
            .unwrap_or_else(|| self.kind().as_str())
    }

    /// Termination condition derived from duration and count.
    ///
    /// A non-zero duration always wins over the item count.
    pub fn stop_condition(&self) -> StopCondition {
        match self.common.duration {
            Some(duration) if !duration.is_zero() => StopCondition::Duration(duration),
            _ if self.common.count > 0 => StopCondition::ItemCount(self.common.count),
            _ => StopCondition::Indefinite,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.common.workers == 0 {
            return Err(ConfigError::InvalidWorkers(
                "worker count must be at least 1".into(),
            ));
        }

        if !self.common.rate.is_finite() || self.common.rate < 0.0 {
            return Err(ConfigError::InvalidRate(format!(
                "rate must be zero or a positive number, got {}",
                self.common.rate
            )));
        }

        match &self.signal {
            SignalParams::Metric(params) => params.validate(),
            SignalParams::Log(_) => Ok(()),
            SignalParams::Trace(params) => {
                if params.span_duration.is_zero() {
                    return Err(ConfigError::InvalidSpanDuration);
                }
                Ok(())
            }
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("invalid worker count: {0}")]
    InvalidWorkers(String),

    /// Invalid rate
    #[error("invalid rate: {0}")]
    InvalidRate(String),

    /// Invalid histogram bucket bounds
    #[error("invalid histogram bucket bounds: {0}")]
    InvalidHistogramBounds(String),

    /// Span duration must be positive
    #[error("span duration must be greater than zero")]
    InvalidSpanDuration,

    /// Attribute not in `key=value` form
    #[error("invalid attribute '{0}', expected key=value")]
    InvalidAttribute(String),

    /// Unrecognized enumeration value
    #[error("unknown {field} '{value}'")]
    UnknownVariant {
        /// Field being parsed
        field: &'static str,
        /// Rejected value
        value: String,
    },
}
