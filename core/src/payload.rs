//! Payload types handed to exporters
//!
//! One payload is produced per worker iteration and wrapped in an
//! [`ExportBatch`] together with the stream's resource.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::config::{AttributeValue, Attributes, SpanStatus};

/// Instrumentation scope name recorded on every batch
pub const SCOPE_NAME: &str = "telemetrygen";

/// Entity producing the telemetry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resource {
    /// Resource attributes, including `service.name`
    pub attributes: Attributes,
}

impl Resource {
    /// Create a resource for the given service with extra attributes
    pub fn new(service: &str, mut attributes: Attributes) -> Self {
        attributes.insert(
            "service.name".to_string(),
            AttributeValue::String(service.to_string()),
        );
        Self { attributes }
    }

    /// The `service.name` attribute, if set
    pub fn service_name(&self) -> Option<&AttributeValue> {
        self.attributes.get("service.name")
    }
}

/// Resource-scoped unit handed to [`Exporter::export`](crate::Exporter::export)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportBatch {
    /// Producing resource, shared by every batch of a stream
    pub resource: Arc<Resource>,

    /// Instrumentation scope
    pub scope: &'static str,

    /// The generated payload
    pub payload: Payload,
}

impl ExportBatch {
    /// Wrap a payload for export
    pub fn new(resource: Arc<Resource>, payload: Payload) -> Self {
        Self {
            resource,
            scope: SCOPE_NAME,
            payload,
        }
    }
}

/// One emitted unit of telemetry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "signal", rename_all = "lowercase")]
pub enum Payload {
    /// A metric with a single data point
    Metric(Metric),
    /// A single log record
    Log(LogRecord),
    /// A root span with its children
    Trace(Trace),
}

impl Payload {
    /// Returns the metric, if this is a metric payload
    pub fn as_metric(&self) -> Option<&Metric> {
        match self {
            Payload::Metric(metric) => Some(metric),
            _ => None,
        }
    }

    /// Returns the log record, if this is a log payload
    pub fn as_log(&self) -> Option<&LogRecord> {
        match self {
            Payload::Log(record) => Some(record),
            _ => None,
        }
    }

    /// Returns the trace, if this is a trace payload
    pub fn as_trace(&self) -> Option<&Trace> {
        match self {
            Payload::Trace(trace) => Some(trace),
            _ => None,
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Aggregation temporality recorded on sums and histograms
///
/// Generated series are always cumulative from a start time one second
/// before the observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Temporality {
    /// Running totals since a fixed start time
    Cumulative,
}

/// Named metric carrying one data point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    /// Metric name
    pub name: String,
    /// The data point
    pub data: MetricData,
}

/// Metric data point variants
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetricData {
    /// Gauge point
    Gauge(GaugePoint),
    /// Sum point
    Sum(SumPoint),
    /// Histogram point
    Histogram(HistogramPoint),
}

/// Instantaneous value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugePoint {
    /// Observation time
    pub time: DateTime<Utc>,
    /// Observed value
    pub value: i64,
    /// Point attributes
    pub attributes: Arc<Attributes>,
}

/// Cumulative sum point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SumPoint {
    /// Start of the cumulative window
    pub start_time: DateTime<Utc>,
    /// Observation time
    pub time: DateTime<Utc>,
    /// Observed value
    pub value: i64,
    /// Whether the series only increases
    pub is_monotonic: bool,
    /// Always cumulative for generated sums
    pub temporality: Temporality,
    /// Point attributes
    pub attributes: Arc<Attributes>,
}

/// Explicit-bucket histogram point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramPoint {
    /// Start of the cumulative window
    pub start_time: DateTime<Utc>,
    /// Observation time
    pub time: DateTime<Utc>,
    /// Sum of recorded samples
    pub sum: i64,
    /// Number of recorded samples
    pub count: u64,
    /// Bucket upper bounds
    pub bounds: Arc<[f64]>,
    /// Per-bucket counts, `bounds.len() + 1` long; the last is the overflow bucket
    pub bucket_counts: Vec<u64>,
    /// Always cumulative for generated histograms
    pub temporality: Temporality,
    /// Point attributes
    pub attributes: Arc<Attributes>,
}

// ============================================================================
// Logs
// ============================================================================

/// Single log record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Event time
    pub timestamp: DateTime<Utc>,
    /// Time the record was observed
    pub observed_timestamp: DateTime<Utc>,
    /// Canonical severity number
    pub severity_number: u8,
    /// Severity text
    pub severity_text: &'static str,
    /// Record body
    pub body: String,
    /// Record attributes
    pub attributes: Arc<Attributes>,
}

// ============================================================================
// Traces
// ============================================================================

/// 16-byte trace identifier, rendered as lowercase hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(pub [u8; 16]);

/// 8-byte span identifier, rendered as lowercase hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(pub [u8; 8]);

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for SpanId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Role of a span in the generated call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    /// Outgoing call (root span)
    Client,
    /// Incoming call (child spans)
    Server,
}

/// Single span
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    /// Trace the span belongs to
    pub trace_id: TraceId,
    /// Span identifier
    pub span_id: SpanId,
    /// Parent span, `None` for the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    /// Operation name
    pub name: String,
    /// Span kind
    pub kind: SpanKind,
    /// Start time
    pub start_time: DateTime<Utc>,
    /// End time
    pub end_time: DateTime<Utc>,
    /// Span status
    pub status: SpanStatus,
    /// Span attributes
    pub attributes: Arc<Attributes>,
}

/// Root span followed by its children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    /// Spans, root first
    pub spans: Vec<Span>,
}

impl Trace {
    /// The root span
    pub fn root(&self) -> Option<&Span> {
        self.spans.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_sets_service_name() {
        let resource = Resource::new("checkout", Attributes::new());
        assert_eq!(
            resource.service_name(),
            Some(&AttributeValue::String("checkout".into()))
        );
    }

    #[test]
    fn test_ids_render_as_hex() {
        let trace_id = TraceId([0xab; 16]);
        let span_id = SpanId([0, 1, 2, 3, 4, 5, 6, 0xff]);
        assert_eq!(trace_id.to_string(), "ab".repeat(16));
        assert_eq!(span_id.to_string(), "00010203040506ff");
        assert_eq!(
            serde_json::to_string(&span_id).unwrap(),
            "\"00010203040506ff\""
        );
    }

    #[test]
    fn test_temporality_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Temporality::Cumulative).unwrap(),
            "\"cumulative\""
        );
    }

    #[test]
    fn test_batch_json_format() {
        let attributes = Arc::new(Attributes::new());
        let payload = Payload::Metric(Metric {
            name: "gen".into(),
            data: MetricData::Gauge(GaugePoint {
                time: Utc::now(),
                value: 42,
                attributes,
            }),
        });
        let batch = ExportBatch::new(Arc::new(Resource::new("svc", Attributes::new())), payload);
        let json = serde_json::to_string(&batch).unwrap();

        assert!(json.contains("\"signal\":\"metric\""));
        assert!(json.contains("\"type\":\"gauge\""));
        assert!(json.contains("\"value\":42"));
        assert!(json.contains("\"service.name\":\"svc\""));
        assert!(json.contains("\"scope\":\"telemetrygen\""));
    }
}
