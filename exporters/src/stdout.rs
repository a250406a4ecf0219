//! JSON-lines exporter writing to stdout or a file

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use telemetrygen_core::{ExportBatch, ExportError, Exporter};

/// Output shared by every exporter of a run
pub type SharedSink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Writes each batch as one JSON line
///
/// Many exporters may share one sink; each line is written under the sink
/// lock so lines never interleave. Writes and flushes run on the blocking
/// pool so a slow file or pipe never holds up the async workers.
pub struct StdoutExporter {
    sink: SharedSink,
    closed: AtomicBool,
}

impl StdoutExporter {
    /// Create an exporter writing to `sink`
    pub fn new(sink: SharedSink) -> Self {
        Self {
            sink,
            closed: AtomicBool::new(false),
        }
    }

    /// Create an exporter writing to the process's stdout
    pub fn stdout() -> Self {
        Self::new(Arc::new(Mutex::new(Box::new(std::io::stdout()))))
    }

    async fn with_sink<F>(&self, op: F) -> Result<(), ExportError>
    where
        F: FnOnce(&mut Box<dyn Write + Send>) -> std::io::Result<()> + Send + 'static,
    {
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || {
            let mut guard = sink
                .lock()
                .map_err(|_| ExportError::Export("output sink poisoned".into()))?;
            op(&mut *guard).map_err(ExportError::from)
        })
        .await
        .map_err(|e| ExportError::Export(format!("writer task failed: {e}")))?
    }
}

#[async_trait]
impl Exporter for StdoutExporter {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn export(&self, batch: &ExportBatch) -> Result<(), ExportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ExportError::Closed);
        }

        let mut line =
            serde_json::to_vec(batch).map_err(|e| ExportError::Serialization(e.to_string()))?;
        line.push(b'\n');

        self.with_sink(move |sink| sink.write_all(&line)).await
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.with_sink(|sink| sink.flush())
            .await
            .map_err(|e| match e {
                ExportError::Io(e) => ExportError::Shutdown(e.to_string()),
                other => other,
            })
    }
}

impl std::fmt::Debug for StdoutExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdoutExporter")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
