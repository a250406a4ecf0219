//! Exporter that drops every batch

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use telemetrygen_core::{ExportBatch, ExportError, Exporter};

/// Counts batches and drops them, for measuring generator throughput
#[derive(Debug, Default)]
pub struct DiscardExporter {
    counter: Arc<AtomicU64>,
    closed: AtomicBool,
}

impl DiscardExporter {
    /// Create an exporter adding to a shared counter
    pub fn new(counter: Arc<AtomicU64>) -> Self {
        Self {
            counter,
            closed: AtomicBool::new(false),
        }
    }

    /// Batches dropped so far by every exporter sharing the counter
    pub fn discarded(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Exporter for DiscardExporter {
    fn name(&self) -> &str {
        "discard"
    }

    async fn export(&self, _batch: &ExportBatch) -> Result<(), ExportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ExportError::Closed);
        }
        self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
