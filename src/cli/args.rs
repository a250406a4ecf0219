//! Command-line arguments and their translation into stream configurations

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use telemetrygen_core::{
    AttributeValue, Attributes, CommonConfig, ConfigError, ErrorPolicy, LogParams, MetricParams,
    MetricVariant, Severity, SignalParams, SpanStatus, StreamConfig, TraceParams,
    DEFAULT_HISTOGRAM_BOUNDS, DEFAULT_SERVICE_NAME,
};
use telemetrygen_exporters::ExporterKind;

fn parse_attribute(input: &str) -> Result<(String, AttributeValue), ConfigError> {
    AttributeValue::parse_pair(input)
}

/// Exporter selection shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Exporter to send generated telemetry to (stdout, discard)
    #[arg(long, default_value_t = ExporterKind::Stdout)]
    pub exporter: ExporterKind,

    /// Write JSON lines to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Flags shared by the single-stream subcommands
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Number of concurrent workers
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Approximately how many items per second each worker emits (0 = no limit)
    #[arg(long, default_value_t = 0.0)]
    pub rate: f64,

    /// How long to run, e.g. 30s or 5m; overrides the item count
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Service name recorded on the resource
    #[arg(long, default_value = DEFAULT_SERVICE_NAME)]
    pub service: String,

    /// Attribute added to every payload, as key=value (repeatable)
    #[arg(long = "telemetry-attributes", value_parser = parse_attribute)]
    pub telemetry_attributes: Vec<(String, AttributeValue)>,

    /// Attribute added to the resource, as key=value (repeatable)
    #[arg(long = "resource-attributes", value_parser = parse_attribute)]
    pub resource_attributes: Vec<(String, AttributeValue)>,

    /// Seed for reproducible random values
    #[arg(long)]
    pub seed: Option<u64>,

    /// Abort every worker as soon as one export fails
    #[arg(long)]
    pub abort_on_error: bool,

    #[command(flatten)]
    pub export: ExportArgs,
}

impl CommonArgs {
    /// Build a stream configuration emitting `count` items per worker
    pub fn stream(&self, signal: SignalParams, count: u64) -> StreamConfig {
        let common = CommonConfig {
            name: None,
            workers: self.workers,
            rate: self.rate,
            duration: self.duration,
            count,
            service: self.service.clone(),
            telemetry_attributes: collect(&self.telemetry_attributes),
            resource_attributes: collect(&self.resource_attributes),
            seed: self.seed,
            error_policy: if self.abort_on_error {
                ErrorPolicy::AbortAll
            } else {
                ErrorPolicy::Isolate
            },
        };
        StreamConfig { common, signal }
    }
}

fn collect(pairs: &[(String, AttributeValue)]) -> Attributes {
    pairs.iter().cloned().collect()
}

/// `metrics` subcommand
#[derive(Args, Debug, Clone)]
pub struct MetricArgs {
    /// Number of metrics to generate per worker (ignored if duration is set)
    #[arg(long = "metrics", default_value_t = 1)]
    pub count: u64,

    /// Metric type: gauge, sum or histogram
    #[arg(long, default_value_t = MetricVariant::Gauge)]
    pub metric_type: MetricVariant,

    /// Name of the generated metric
    #[arg(long, default_value = "gen")]
    pub metric_name: String,

    /// Draw random values instead of counting up
    #[arg(long)]
    pub random_metric_values: bool,

    /// Histogram bucket upper bounds, comma separated and strictly ascending
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_HISTOGRAM_BOUNDS.to_vec()
    )]
    pub histogram_bucket_bounds: Vec<f64>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl MetricArgs {
    /// Stream configuration described by these flags
    pub fn to_stream(&self) -> StreamConfig {
        let params = MetricParams {
            metric_name: self.metric_name.clone(),
            metric_type: self.metric_type,
            random_values: self.random_metric_values,
            histogram_bucket_bounds: self.histogram_bucket_bounds.clone(),
        };
        self.common.stream(SignalParams::Metric(params), self.count)
    }
}

/// `logs` subcommand
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Number of log records to generate per worker (ignored if duration is set)
    #[arg(long = "logs", default_value_t = 1)]
    pub count: u64,

    /// Body of every log record
    #[arg(long, default_value = "the message")]
    pub body: String,

    /// Severity: trace, debug, info, warn, error or fatal
    #[arg(long = "severity-text", default_value = "info")]
    pub severity: Severity,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl LogArgs {
    /// Stream configuration described by these flags
    pub fn to_stream(&self) -> StreamConfig {
        let params = LogParams {
            body: self.body.clone(),
            severity: self.severity,
        };
        self.common.stream(SignalParams::Log(params), self.count)
    }
}

/// `traces` subcommand
#[derive(Args, Debug, Clone)]
pub struct TraceArgs {
    /// Number of traces to generate per worker (ignored if duration is set)
    #[arg(long = "traces", default_value_t = 1)]
    pub count: u64,

    /// Number of child spans under each root span
    #[arg(long, default_value_t = 1)]
    pub child_spans: usize,

    /// Duration of each generated span, e.g. 123us
    #[arg(long, value_parser = humantime::parse_duration, default_value = "123us")]
    pub span_duration: Duration,

    /// Span status: unset, ok or error
    #[arg(long, default_value = "unset")]
    pub status_code: SpanStatus,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl TraceArgs {
    /// Stream configuration described by these flags
    pub fn to_stream(&self) -> StreamConfig {
        let params = TraceParams {
            child_spans: self.child_spans,
            span_duration: self.span_duration,
            status_code: self.status_code,
        };
        self.common.stream(SignalParams::Trace(params), self.count)
    }
}

/// `file` subcommand
#[derive(Args, Debug, Clone)]
pub struct FileArgs {
    /// Path to the YAML descriptor listing metric, log and trace streams
    #[arg(short, long)]
    pub config: PathBuf,

    #[command(flatten)]
    pub export: ExportArgs,
}
