//! Payload synthesis
//!
//! [`SignalFactory`] turns an iteration counter into exactly one [`Payload`].
//! Deterministic mode derives every value from the counter so runs can be
//! compared byte for byte; random mode draws from the caller's RNG.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::{
    Attributes, LogParams, MetricParams, MetricVariant, SignalKind, SignalParams, TraceParams,
};
use crate::payload::{
    GaugePoint, HistogramPoint, LogRecord, Metric, MetricData, Payload, Span, SpanId, SpanKind,
    SumPoint, Temporality, Trace, TraceId,
};

/// Exclusive upper bound for random gauge and sum values
pub const RANDOM_VALUE_CEILING: i64 = 10_000;

/// Random histogram points record between 1 and this many samples
pub const MAX_RANDOM_HISTOGRAM_SAMPLES: u64 = 100;

/// Name of the root span of every generated trace
pub const ROOT_SPAN_NAME: &str = "lets-go";

/// Builds one payload per iteration for a configured signal
#[derive(Debug, Clone)]
pub struct SignalFactory {
    params: SignalParams,
    attributes: Arc<Attributes>,
    bounds: Arc<[f64]>,
}

impl SignalFactory {
    /// Create a factory for the given signal and payload attributes
    pub fn new(params: SignalParams, attributes: Attributes) -> Self {
        let bounds: Arc<[f64]> = match &params {
            SignalParams::Metric(metric) => Arc::from(metric.histogram_bucket_bounds.as_slice()),
            _ => Arc::from(Vec::<f64>::new()),
        };

        Self {
            params,
            attributes: Arc::new(attributes),
            bounds,
        }
    }

    /// Signal kind produced by this factory
    pub fn kind(&self) -> SignalKind {
        self.params.kind()
    }

    /// Build the payload for `iteration`
    pub fn build<R: Rng + ?Sized>(&self, iteration: u64, rng: &mut R) -> Payload {
        let now = Utc::now();
        match &self.params {
            SignalParams::Metric(params) => Payload::Metric(self.metric(params, iteration, now, rng)),
            SignalParams::Log(params) => Payload::Log(self.log(params, now)),
            SignalParams::Trace(params) => Payload::Trace(self.trace(params, now, rng)),
        }
    }

    fn metric<R: Rng + ?Sized>(
        &self,
        params: &MetricParams,
        iteration: u64,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Metric {
        let counter = i64::try_from(iteration).unwrap_or(i64::MAX);
        let start_time = now - chrono::Duration::seconds(1);

        let data = match params.metric_type {
            MetricVariant::Gauge => {
                let value = if params.random_values {
                    rng.gen_range(0..RANDOM_VALUE_CEILING)
                } else {
                    counter
                };
                MetricData::Gauge(GaugePoint {
                    time: now,
                    value,
                    attributes: Arc::clone(&self.attributes),
                })
            }
            MetricVariant::Sum => {
                let (value, is_monotonic) = if params.random_values {
                    (rng.gen_range(0..RANDOM_VALUE_CEILING), false)
                } else {
                    (counter, true)
                };
                MetricData::Sum(SumPoint {
                    start_time,
                    time: now,
                    value,
                    is_monotonic,
                    temporality: Temporality::Cumulative,
                    attributes: Arc::clone(&self.attributes),
                })
            }
            MetricVariant::Histogram => {
                let (sum, count, bucket_counts) = if params.random_values {
                    random_histogram(&self.bounds, rng)
                } else {
                    deterministic_histogram(&self.bounds, counter)
                };
                MetricData::Histogram(HistogramPoint {
                    start_time,
                    time: now,
                    sum,
                    count,
                    bounds: Arc::clone(&self.bounds),
                    bucket_counts,
                    temporality: Temporality::Cumulative,
                    attributes: Arc::clone(&self.attributes),
                })
            }
        };

        Metric {
            name: params.metric_name.clone(),
            data,
        }
    }

    fn log(&self, params: &LogParams, now: DateTime<Utc>) -> LogRecord {
        LogRecord {
            timestamp: now,
            observed_timestamp: now,
            severity_number: params.severity.number(),
            severity_text: params.severity.text(),
            body: params.body.clone(),
            attributes: Arc::clone(&self.attributes),
        }
    }

    fn trace<R: Rng + ?Sized>(&self, params: &TraceParams, now: DateTime<Utc>, rng: &mut R) -> Trace {
        let trace_id = TraceId(rng.gen());
        let end_time = span_end(now, params.span_duration);

        let root_id = SpanId(rng.gen());
        let mut spans = Vec::with_capacity(params.child_spans + 1);
        spans.push(Span {
            trace_id,
            span_id: root_id,
            parent_span_id: None,
            name: ROOT_SPAN_NAME.to_string(),
            kind: SpanKind::Client,
            start_time: now,
            end_time,
            status: params.status_code,
            attributes: Arc::clone(&self.attributes),
        });

        for child in 0..params.child_spans {
            spans.push(Span {
                trace_id,
                span_id: SpanId(rng.gen()),
                parent_span_id: Some(root_id),
                name: format!("okey-dokey-{child}"),
                kind: SpanKind::Server,
                start_time: now,
                end_time,
                status: params.status_code,
                attributes: Arc::clone(&self.attributes),
            });
        }

        Trace { spans }
    }
}

/// Span end time, saturating at the latest representable instant
fn span_end(start: DateTime<Utc>, duration: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| start.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Index of the first bucket whose bound is strictly greater than `value`;
/// `bounds.len()` is the overflow bucket.
pub fn bucket_index(bounds: &[f64], value: f64) -> usize {
    bounds
        .iter()
        .position(|bound| value < *bound)
        .unwrap_or(bounds.len())
}

fn deterministic_histogram(bounds: &[f64], counter: i64) -> (i64, u64, Vec<u64>) {
    let mut bucket_counts = vec![0u64; bounds.len() + 1];
    bucket_counts[bucket_index(bounds, counter as f64)] += 1;
    (counter, 1, bucket_counts)
}

fn random_histogram<R: Rng + ?Sized>(bounds: &[f64], rng: &mut R) -> (i64, u64, Vec<u64>) {
    let mut bucket_counts = vec![0u64; bounds.len() + 1];
    let upper = bounds.last().map(|b| *b as i64).unwrap_or(1).max(1);
    let count = rng.gen_range(1..=MAX_RANDOM_HISTOGRAM_SAMPLES);

    let mut sum = 0i64;
    for _ in 0..count {
        let value = rng.gen_range(0..upper);
        bucket_counts[bucket_index(bounds, value as f64)] += 1;
        sum = sum.saturating_add(value);
    }

    (sum, count, bucket_counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AttributeValue, Severity, SpanStatus, StreamConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn metric_factory(variant: MetricVariant, random: bool) -> SignalFactory {
        let params = MetricParams::new(variant).with_random_values(random);
        SignalFactory::new(SignalParams::Metric(params), Attributes::new())
    }

    fn histogram(payload: &Payload) -> &HistogramPoint {
        match &payload.as_metric().expect("metric payload").data {
            MetricData::Histogram(point) => point,
            other => panic!("Expected histogram, got {other:?}"),
        }
    }

    #[test]
    fn test_gauge_deterministic_uses_counter() {
        let factory = metric_factory(MetricVariant::Gauge, false);
        let mut rng = StdRng::seed_from_u64(1);

        for i in [0u64, 1, 17, 9_999, 123_456] {
            match &factory.build(i, &mut rng).as_metric().unwrap().data {
                MetricData::Gauge(point) => assert_eq!(point.value, i as i64),
                other => panic!("Expected gauge, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_gauge_random_in_range() {
        let factory = metric_factory(MetricVariant::Gauge, true);
        let mut rng = StdRng::seed_from_u64(7);

        for i in 0..500 {
            match &factory.build(i, &mut rng).as_metric().unwrap().data {
                MetricData::Gauge(point) => {
                    assert!((0..RANDOM_VALUE_CEILING).contains(&point.value))
                }
                other => panic!("Expected gauge, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_sum_monotonic_iff_deterministic() {
        let mut rng = StdRng::seed_from_u64(3);

        let deterministic = metric_factory(MetricVariant::Sum, false);
        match &deterministic.build(5, &mut rng).as_metric().unwrap().data {
            MetricData::Sum(point) => {
                assert!(point.is_monotonic);
                assert_eq!(point.value, 5);
                assert_eq!(point.temporality, Temporality::Cumulative);
                assert_eq!(point.time - point.start_time, chrono::Duration::seconds(1));
            }
            other => panic!("Expected sum, got {other:?}"),
        }

        let random = metric_factory(MetricVariant::Sum, true);
        match &random.build(5, &mut rng).as_metric().unwrap().data {
            MetricData::Sum(point) => {
                assert!(!point.is_monotonic);
                assert!((0..RANDOM_VALUE_CEILING).contains(&point.value));
            }
            other => panic!("Expected sum, got {other:?}"),
        }
    }

    #[test]
    fn test_histogram_deterministic_bucket_placement() {
        // Default bounds: 2, 4, 8, 16, 32, 64, 128
        let factory = metric_factory(MetricVariant::Histogram, false);
        let mut rng = StdRng::seed_from_u64(0);

        let cases = [
            (0u64, 0usize),
            (1, 0),
            (2, 1),
            (3, 1),
            (4, 2),
            (127, 6),
            (128, 7),
            (10_000, 7),
        ];
        for (i, expected_bucket) in cases {
            let payload = factory.build(i, &mut rng);
            let point = histogram(&payload);
            assert_eq!(point.bucket_counts.len(), 8);
            assert_eq!(point.bucket_counts.iter().sum::<u64>(), 1, "iteration {i}");
            assert_eq!(point.bucket_counts[expected_bucket], 1, "iteration {i}");
            assert_eq!(point.sum, i as i64);
            assert_eq!(point.count, 1);
        }
    }

    #[test]
    fn test_histogram_random_distribution() {
        let factory = metric_factory(MetricVariant::Histogram, true);
        let mut rng = StdRng::seed_from_u64(42);

        for i in 0..200 {
            let payload = factory.build(i, &mut rng);
            let point = histogram(&payload);
            assert!((1..=MAX_RANDOM_HISTOGRAM_SAMPLES).contains(&point.count));
            assert_eq!(point.bucket_counts.iter().sum::<u64>(), point.count);
            // Samples are drawn below the largest bound, so overflow stays empty
            assert_eq!(point.bucket_counts[7], 0);
            assert!(point.sum >= 0);
            assert!(point.sum < point.count as i64 * 128);
        }
    }

    #[test]
    fn test_histogram_random_huge_bound_saturates_sum() {
        let params = MetricParams::new(MetricVariant::Histogram)
            .with_random_values(true)
            .with_bucket_bounds(vec![1.0, 1e19]);
        let config = StreamConfig::new(SignalParams::Metric(params.clone()));
        assert!(config.validate().is_ok());

        let factory = SignalFactory::new(SignalParams::Metric(params), Attributes::new());
        let mut rng = StdRng::seed_from_u64(5);
        for i in 0..50 {
            let payload = factory.build(i, &mut rng);
            let point = histogram(&payload);
            assert!(point.sum >= 0);
            assert_eq!(point.bucket_counts.iter().sum::<u64>(), point.count);
            assert_eq!(point.bucket_counts[2], 0);
        }
    }

    #[test]
    fn test_histogram_custom_bounds() {
        let params = MetricParams::new(MetricVariant::Histogram).with_bucket_bounds(vec![10.0, 100.0]);
        let factory = SignalFactory::new(SignalParams::Metric(params), Attributes::new());
        let mut rng = StdRng::seed_from_u64(0);

        let payload = factory.build(50, &mut rng);
        let point = histogram(&payload);
        assert_eq!(point.bucket_counts, vec![0, 1, 0]);
        assert_eq!(&*point.bounds, &[10.0, 100.0]);
    }

    #[test]
    fn test_bucket_index() {
        let bounds = [1.0, 5.0, 10.0];
        assert_eq!(bucket_index(&bounds, 0.0), 0);
        assert_eq!(bucket_index(&bounds, 1.0), 1);
        assert_eq!(bucket_index(&bounds, 9.99), 2);
        assert_eq!(bucket_index(&bounds, 10.0), 3);
        assert_eq!(bucket_index(&[], 3.0), 0);
    }

    #[test]
    fn test_seeded_payloads_reproducible() {
        let factory = metric_factory(MetricVariant::Histogram, true);
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);

        for i in 0..20 {
            let pa = factory.build(i, &mut a);
            let pb = factory.build(i, &mut b);
            assert_eq!(histogram(&pa).bucket_counts, histogram(&pb).bucket_counts);
            assert_eq!(histogram(&pa).sum, histogram(&pb).sum);
        }
    }

    #[test]
    fn test_payload_carries_attributes() {
        let mut attributes = Attributes::new();
        attributes.insert("env".into(), AttributeValue::from("test"));
        let factory = SignalFactory::new(
            SignalParams::Metric(MetricParams::default()),
            attributes.clone(),
        );

        let payload = factory.build(0, &mut StdRng::seed_from_u64(0));
        match &payload.as_metric().unwrap().data {
            MetricData::Gauge(point) => assert_eq!(*point.attributes, attributes),
            other => panic!("Expected gauge, got {other:?}"),
        }
    }

    #[test]
    fn test_log_record() {
        let params = LogParams {
            body: "disk almost full".into(),
            severity: Severity::Warn,
        };
        let factory = SignalFactory::new(SignalParams::Log(params), Attributes::new());
        assert_eq!(factory.kind(), SignalKind::Log);

        let payload = factory.build(3, &mut StdRng::seed_from_u64(0));
        let record = payload.as_log().expect("log payload");
        assert_eq!(record.body, "disk almost full");
        assert_eq!(record.severity_number, 13);
        assert_eq!(record.severity_text, "Warn");
    }

    #[test]
    fn test_trace_spans() {
        let params = TraceParams {
            child_spans: 3,
            span_duration: Duration::from_millis(5),
            status_code: SpanStatus::Ok,
        };
        let factory = SignalFactory::new(SignalParams::Trace(params), Attributes::new());

        let payload = factory.build(0, &mut StdRng::seed_from_u64(11));
        let trace = payload.as_trace().expect("trace payload");
        assert_eq!(trace.spans.len(), 4);

        let root = trace.root().unwrap();
        assert_eq!(root.name, ROOT_SPAN_NAME);
        assert_eq!(root.kind, SpanKind::Client);
        assert!(root.parent_span_id.is_none());
        assert_eq!(root.end_time - root.start_time, chrono::Duration::milliseconds(5));

        for (n, child) in trace.spans[1..].iter().enumerate() {
            assert_eq!(child.trace_id, root.trace_id);
            assert_eq!(child.parent_span_id, Some(root.span_id));
            assert_eq!(child.name, format!("okey-dokey-{n}"));
            assert_eq!(child.kind, SpanKind::Server);
            assert_eq!(child.status, SpanStatus::Ok);
        }
    }

    #[test]
    fn test_trace_span_end_saturates() {
        let params = TraceParams {
            child_spans: 1,
            span_duration: Duration::from_secs(300_000 * 365 * 24 * 3600),
            status_code: SpanStatus::Unset,
        };
        let config = StreamConfig::new(SignalParams::Trace(params.clone()));
        assert!(config.validate().is_ok());

        let factory = SignalFactory::new(SignalParams::Trace(params), Attributes::new());
        let payload = factory.build(0, &mut StdRng::seed_from_u64(0));
        for span in &payload.as_trace().expect("trace payload").spans {
            assert_eq!(span.end_time, DateTime::<Utc>::MAX_UTC);
            assert!(span.end_time > span.start_time);
        }
    }
}
