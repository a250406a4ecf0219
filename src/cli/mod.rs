//! CLI argument parsing and command dispatch

mod args;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use telemetrygen_core::{
    Descriptor, ExporterFactory, MultiStreamRunner, OrchestratorBuilder, StreamConfig,
    StreamReport,
};
use telemetrygen_exporters::ExporterConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use args::{ExportArgs, FileArgs, LogArgs, MetricArgs, TraceArgs};

/// telemetrygen - synthetic telemetry load generator
#[derive(Parser, Debug)]
#[command(name = "telemetrygen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a metric stream
    Metrics(MetricArgs),
    /// Generate a log stream
    Logs(LogArgs),
    /// Generate a trace stream
    Traces(TraceArgs),
    /// Run every stream listed in a YAML descriptor
    File(FileArgs),
}

impl Cli {
    /// Run the selected command
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Metrics(args) => run_stream(args.to_stream(), &args.common.export).await,
            Commands::Logs(args) => run_stream(args.to_stream(), &args.common.export).await,
            Commands::Traces(args) => run_stream(args.to_stream(), &args.common.export).await,
            Commands::File(args) => run_file(args).await,
        }
    }
}

fn exporter_factory(export: &ExportArgs) -> Result<Arc<dyn ExporterFactory>> {
    let config = ExporterConfig::new(export.exporter, export.output.as_deref())
        .context("Failed to set up exporter")?;
    tracing::debug!(exporter = %config.kind(), output = ?config.output(), "Exporter ready");
    Ok(Arc::new(config))
}

async fn run_stream(config: StreamConfig, export: &ExportArgs) -> Result<()> {
    let stop = CancellationToken::new();
    let abort = CancellationToken::new();

    let orchestrator = OrchestratorBuilder::new(config)
        .exporter_factory(exporter_factory(export)?)
        .parent_stop(stop.clone())
        .abort_token(abort.clone())
        .build()
        .context("Invalid stream configuration")?;

    let signal_handle = spawn_signal_handler(stop, abort);
    let result = orchestrator.run().await;
    signal_handle.abort();

    let report = result.context("Stream failed")?;
    log_report(&report);
    Ok(())
}

async fn run_file(args: &FileArgs) -> Result<()> {
    let descriptor = Descriptor::load(&args.config)
        .with_context(|| format!("Failed to load descriptor: {}", args.config.display()))?;

    let stop = CancellationToken::new();
    let abort = CancellationToken::new();
    let runner = MultiStreamRunner::new(descriptor, exporter_factory(&args.export)?)
        .with_shutdown_token(stop.clone())
        .with_abort_token(abort.clone());

    let signal_handle = spawn_signal_handler(stop, abort);
    let result = runner.run().await;
    signal_handle.abort();

    let report = result.context("Failed to start streams")?;
    for stream in report.succeeded() {
        log_report(stream);
    }

    let failed: Vec<&str> = report.failed().map(|(name, _)| name).collect();
    if !failed.is_empty() {
        bail!(
            "{} of {} streams failed: {}",
            failed.len(),
            report.streams.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

fn log_report(report: &StreamReport) {
    tracing::info!(
        stream = %report.stream,
        signal = %report.signal,
        exports = report.stats.total_exports,
        workers = report.stats.total_workers,
        workers_without_exporter = report.stats.workers_without_exporter,
        shutdown_failures = report.stats.shutdown_failures,
        elapsed_secs = report.elapsed.as_secs_f64(),
        rate = report.stats.exports_per_second,
        "Summary"
    );
}

/// First Ctrl+C stops gracefully, a second one aborts throttle waits
fn spawn_signal_handler(stop: CancellationToken, abort: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("Received Ctrl+C, stopping workers (press again to abort)");
        stop.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received second Ctrl+C, aborting");
            abort.cancel();
        }
    })
}
