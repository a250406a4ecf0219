//! Mock exporters shared by the worker, orchestrator and runner tests

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::SignalKind;
use crate::payload::ExportBatch;
use crate::traits::{ExportError, Exporter, ExporterFactory};

// ============================================================================
// Shared counters
// ============================================================================

/// Counters observed across every exporter created by one factory
#[derive(Default)]
pub(crate) struct MockState {
    pub created: AtomicUsize,
    pub export_started: AtomicU64,
    pub export_finished: AtomicU64,
    pub shutdowns: AtomicUsize,
    pub batches: Mutex<Vec<ExportBatch>>,
}

impl MockState {
    pub fn exports(&self) -> u64 {
        self.export_finished.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<ExportBatch> {
        self.batches.lock().unwrap().clone()
    }
}

// ============================================================================
// Mock Exporter
// ============================================================================

pub(crate) struct MockExporter {
    state: Arc<MockState>,
    delay: Option<Duration>,
    fail_at: Option<u64>,
    shutdown_fails: bool,
    calls: AtomicU64,
    closed: AtomicBool,
}

#[async_trait]
impl Exporter for MockExporter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn export(&self, batch: &ExportBatch) -> Result<(), ExportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExportError::Closed);
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(call) {
            return Err(ExportError::Export(format!("mock failure at call {call}")));
        }

        self.state.export_started.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.state.batches.lock().unwrap().push(batch.clone());
        self.state.export_finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.closed.store(true, Ordering::SeqCst);
        self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
        if self.shutdown_fails {
            return Err(ExportError::Shutdown("mock shutdown failure".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Mock Factory
// ============================================================================

pub(crate) struct MockFactory {
    pub state: Arc<MockState>,
    delay: Option<Duration>,
    fail_at: Option<u64>,
    fail_first_only: bool,
    shutdown_fails: bool,
    fail_create_every: Option<usize>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::default()),
            delay: None,
            fail_at: None,
            fail_first_only: false,
            shutdown_fails: false,
            fail_create_every: None,
        }
    }

    /// Every export sleeps for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every exporter fails its export call number `n` (0-based)
    pub fn with_fail_at(mut self, n: u64) -> Self {
        self.fail_at = Some(n);
        self
    }

    /// Only the first exporter created fails, at its export call number `n`
    pub fn with_single_failure_at(mut self, n: u64) -> Self {
        self.fail_at = Some(n);
        self.fail_first_only = true;
        self
    }

    /// Every exporter fails its shutdown
    pub fn with_shutdown_failure(mut self) -> Self {
        self.shutdown_fails = true;
        self
    }

    /// Creation number `k` fails when `k % n == 0`; `n = 1` fails every creation
    pub fn with_fail_create_every(mut self, n: usize) -> Self {
        self.fail_create_every = Some(n);
        self
    }
}

impl ExporterFactory for MockFactory {
    fn create_exporter(&self, _signal: SignalKind) -> Result<Box<dyn Exporter>, ExportError> {
        let attempt = self.state.created.fetch_add(1, Ordering::SeqCst);
        if let Some(n) = self.fail_create_every {
            if attempt % n == 0 {
                return Err(ExportError::Init("mock factory refused".into()));
            }
        }

        Ok(Box::new(MockExporter {
            state: Arc::clone(&self.state),
            delay: self.delay,
            fail_at: if self.fail_first_only && attempt > 0 {
                None
            } else {
                self.fail_at
            },
            shutdown_fails: self.shutdown_fails,
            calls: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }))
    }
}
