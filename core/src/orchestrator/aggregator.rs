//! Result aggregation from multiple workers

use std::time::Duration;

use serde::Serialize;

use crate::config::SignalKind;
use crate::worker::WorkerStats;

/// Aggregated statistics from all workers of one stream
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedStats {
    /// Number of workers that ran
    pub total_workers: usize,

    /// Total successful exports
    pub total_exports: u64,

    /// Total failed exports
    pub total_export_errors: u64,

    /// Workers whose exporter could not be created
    pub workers_without_exporter: usize,

    /// Workers whose exporter shutdown failed
    pub shutdown_failures: usize,

    /// Maximum duration across all workers
    pub total_duration: Duration,

    /// Overall exports per second
    pub exports_per_second: f64,
}

impl AggregatedStats {
    /// Workers that obtained an exporter
    pub fn active_workers(&self) -> usize {
        self.total_workers - self.workers_without_exporter
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_worker_stats(stats: &[WorkerStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let mut merged = WorkerStats::new();
    for s in stats {
        merged.merge(s);
    }

    // Use the maximum elapsed time across all workers
    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let exports_per_second = if secs > 0.0 {
        merged.exports as f64 / secs
    } else {
        0.0
    };

    AggregatedStats {
        total_workers: stats.len(),
        total_exports: merged.exports,
        total_export_errors: merged.export_errors,
        workers_without_exporter: stats.iter().filter(|s| s.exporter_unavailable).count(),
        shutdown_failures: stats.iter().filter(|s| s.shutdown_failed).count(),
        total_duration,
        exports_per_second,
    }
}

/// Summary of one completed stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamReport {
    /// Stream name
    pub stream: String,

    /// Signal kind emitted
    pub signal: SignalKind,

    /// Aggregated worker statistics
    pub stats: AggregatedStats,

    /// Wall-clock time from first spawn to last worker exit
    pub elapsed: Duration,
}

impl StreamReport {
    /// Total exports of the stream
    pub fn total_exports(&self) -> u64 {
        self.stats.total_exports
    }
}
