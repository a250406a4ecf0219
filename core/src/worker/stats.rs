//! Worker statistics tracking

use std::time::Instant;

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Number of successfully exported payloads
    pub exports: u64,

    /// Number of failed exports (at most one, the loop stops on failure)
    pub export_errors: u64,

    /// The exporter factory failed; the worker emitted nothing
    pub exporter_unavailable: bool,

    /// The exporter's shutdown returned an error
    pub shutdown_failed: bool,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Record a successful export
    pub fn record_export(&mut self) {
        self.exports += 1;
    }

    /// Record a failed export
    pub fn record_export_error(&mut self) {
        self.export_errors += 1;
    }

    /// Get total export attempts (successes + failures)
    pub fn attempts(&self) -> u64 {
        self.exports + self.export_errors
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Get exports per second
    pub fn exports_per_second(&self) -> f64 {
        self.elapsed()
            .map(|d| {
                let secs = d.as_secs_f64();
                if secs > 0.0 {
                    self.exports as f64 / secs
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Merge counters from another worker
    pub fn merge(&mut self, other: &WorkerStats) {
        self.exports += other.exports;
        self.export_errors += other.export_errors;
        self.exporter_unavailable |= other.exporter_unavailable;
        self.shutdown_failed |= other.shutdown_failed;
    }
}
