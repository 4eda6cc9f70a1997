//! End-to-end job driver: configuration and inputs in, part files and reports out.

use crate::config::{JobConfig, ResolvedConfig};
use crate::io::{read_lines, resolve_inputs, write_partitions};
use crate::metrics::JobReport;
use crate::runner::{JobOutput, Runner};
use crate::validation::ErrorCollector;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Everything needed to run one job.
pub struct JobSpec {
    /// Files, directories, or glob patterns.
    pub inputs: Vec<String>,
    /// Output directory; must not exist yet.
    pub output: PathBuf,
    pub config: JobConfig,
    pub runner: Runner,
    /// Where to save the counter report as JSON.
    pub metrics_out: Option<PathBuf>,
    /// Where to save skipped-record errors as JSON.
    pub errors_out: Option<PathBuf>,
}

impl JobSpec {
    pub fn new(inputs: Vec<String>, output: impl Into<PathBuf>, config: JobConfig) -> Self {
        Self {
            inputs,
            output: output.into(),
            config,
            runner: Runner::default(),
            metrics_out: None,
            errors_out: None,
        }
    }
}

/// What a finished job produced.
#[derive(Debug)]
pub struct JobSummary {
    pub report: JobReport,
    pub parts: Vec<PathBuf>,
    pub errors: ErrorCollector,
}

/// Run the job over in-memory lines without touching the filesystem.
///
/// # Errors
/// Setup errors from the configuration or the record layout check.
pub fn run_lines(config: &JobConfig, runner: &Runner, lines: &[String]) -> Result<JobOutput> {
    let cfg = resolve(config)?;
    runner.run(&cfg, lines)
}

fn resolve(config: &JobConfig) -> Result<ResolvedConfig> {
    config.resolve().context("invalid job configuration")
}

/// Run a job from input files to an output directory.
///
/// Configuration is validated before any input is read, and the output
/// directory is checked before any work starts so a rerun fails fast.
///
/// # Errors
/// Configuration, setup, I/O, and fail-fast record errors.
pub fn run_job(spec: &JobSpec) -> Result<JobSummary> {
    let started = Instant::now();
    let cfg = resolve(&spec.config)?;
    if spec.output.exists() {
        bail!("output directory {} already exists", spec.output.display());
    }

    let files = resolve_inputs(&spec.inputs)?;
    info!(files = files.len(), output = %spec.output.display(), "resolved inputs");
    let input = read_lines(&files)?;

    let mut out = spec.runner.run(&cfg, &input.lines)?;
    out.errors.locate(|line| {
        input
            .locate(line)
            .map(|(path, line)| (path.display().to_string(), line))
    });
    let parts = write_partitions(&spec.output, &out.formatted(&cfg.field_delim))?;

    let report = JobReport::new(out.counters, started.elapsed());
    if let Some(path) = &spec.metrics_out {
        report.save_to_file(path)?;
    }
    if let Some(path) = &spec.errors_out {
        out.errors
            .write_to_file(path)
            .with_context(|| format!("write error report {}", path.display()))?;
    }
    info!(
        parts = parts.len(),
        rows = report.counters.rows_emitted,
        skipped = out.errors.error_count(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "job finished"
    );

    Ok(JobSummary {
        report,
        parts,
        errors: out.errors,
    })
}
