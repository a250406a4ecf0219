//! Exporter selection and the bundled exporter factory

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use telemetrygen_core::{ExportError, Exporter, ExporterFactory, SignalKind};

use crate::discard::DiscardExporter;
use crate::stdout::{SharedSink, StdoutExporter};

// ============================================================================
// Exporter Enumeration
// ============================================================================

/// Bundled exporter implementations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    /// JSON lines on stdout, or in a file
    #[default]
    Stdout,
    /// Count and drop
    Discard,
}

impl ExporterKind {
    /// Returns the identifier string for this exporter
    pub fn id(&self) -> &'static str {
        match self {
            ExporterKind::Stdout => "stdout",
            ExporterKind::Discard => "discard",
        }
    }
}

impl fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ExporterKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdout" | "file" => Ok(ExporterKind::Stdout),
            "discard" | "none" => Ok(ExporterKind::Discard),
            other => Err(ExportError::Init(format!("unknown exporter '{other}'"))),
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Selected exporter plus the resources its instances share
///
/// Every worker gets its own exporter; stdout exporters share one sink and
/// discard exporters share one counter.
pub struct ExporterConfig {
    kind: ExporterKind,
    output: Option<PathBuf>,
    sink: SharedSink,
    discarded: Arc<AtomicU64>,
}

impl ExporterConfig {
    /// Exporter writing JSON lines to stdout
    pub fn stdout() -> Self {
        Self::with_sink(
            ExporterKind::Stdout,
            None,
            Arc::new(Mutex::new(Box::new(std::io::stdout()))),
        )
    }

    /// Exporter writing JSON lines to a file, created or truncated now
    pub fn file(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            ExportError::Init(format!("cannot create {}: {e}", path.display()))
        })?;

        Ok(Self::with_sink(
            ExporterKind::Stdout,
            Some(path.to_path_buf()),
            Arc::new(Mutex::new(Box::new(BufWriter::new(file)))),
        ))
    }

    /// Exporter dropping every batch
    pub fn discard() -> Self {
        Self::with_sink(
            ExporterKind::Discard,
            None,
            Arc::new(Mutex::new(Box::new(std::io::sink()))),
        )
    }

    /// Build from a kind and an optional output path
    ///
    /// The output path only applies to [`ExporterKind::Stdout`].
    pub fn new(kind: ExporterKind, output: Option<&Path>) -> Result<Self, ExportError> {
        match (kind, output) {
            (ExporterKind::Stdout, Some(path)) => Self::file(path),
            (ExporterKind::Stdout, None) => Ok(Self::stdout()),
            (ExporterKind::Discard, _) => Ok(Self::discard()),
        }
    }

    fn with_sink(kind: ExporterKind, output: Option<PathBuf>, sink: SharedSink) -> Self {
        Self {
            kind,
            output,
            sink,
            discarded: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Selected exporter kind
    pub fn kind(&self) -> ExporterKind {
        self.kind
    }

    /// Output file, if any
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Batches dropped by discard exporters created from this config
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

impl ExporterFactory for ExporterConfig {
    fn create_exporter(&self, signal: SignalKind) -> Result<Box<dyn Exporter>, ExportError> {
        tracing::trace!(exporter = %self.kind, signal = %signal, "Creating exporter");
        Ok(match self.kind {
            ExporterKind::Stdout => Box::new(StdoutExporter::new(Arc::clone(&self.sink))),
            ExporterKind::Discard => Box::new(DiscardExporter::new(Arc::clone(&self.discarded))),
        })
    }
}

impl fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("kind", &self.kind)
            .field("output", &self.output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetrygen_core::{Attributes, ExportBatch, Payload, Resource, Trace};

    fn empty_trace_batch() -> ExportBatch {
        ExportBatch::new(
            Arc::new(Resource::new("svc", Attributes::new())),
            Payload::Trace(Trace { spans: Vec::new() }),
        )
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("stdout".parse::<ExporterKind>().unwrap(), ExporterKind::Stdout);
        assert_eq!("DISCARD".parse::<ExporterKind>().unwrap(), ExporterKind::Discard);
        assert!("otlp".parse::<ExporterKind>().is_err());
    }

    #[test]
    fn test_kind_display_roundtrips() {
        for kind in [ExporterKind::Stdout, ExporterKind::Discard] {
            assert_eq!(kind.to_string().parse::<ExporterKind>().unwrap(), kind);
        }
    }

    #[tokio::test]
    async fn test_discard_factory_counts() {
        let config = ExporterConfig::new(ExporterKind::Discard, None).unwrap();
        for _ in 0..3 {
            let exporter = config.create_exporter(SignalKind::Trace).unwrap();
            assert_eq!(exporter.name(), "discard");
            exporter.export(&empty_trace_batch()).await.unwrap();
            exporter.shutdown().await.unwrap();
        }
        assert_eq!(config.discarded(), 3);
    }

    #[tokio::test]
    async fn test_file_factory_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let config = ExporterConfig::new(ExporterKind::Stdout, Some(&path)).unwrap();
        assert_eq!(config.output(), Some(path.as_path()));

        let a = config.create_exporter(SignalKind::Trace).unwrap();
        let b = config.create_exporter(SignalKind::Trace).unwrap();
        a.export(&empty_trace_batch()).await.unwrap();
        b.export(&empty_trace_batch()).await.unwrap();
        a.shutdown().await.unwrap();
        b.shutdown().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().all(|l| l.contains("\"signal\":\"trace\"")));
    }

    #[test]
    fn test_file_factory_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.jsonl");
        assert!(matches!(
            ExporterConfig::file(&path),
            Err(ExportError::Init(_))
        ));
    }
}
