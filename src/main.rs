use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use topmatch::config::JobConfig;
use topmatch::job::{JobSpec, run_job};
use topmatch::runner::{ExecMode, Runner};
use topmatch::validation::RecordErrorMode;
use tracing_subscriber::{EnvFilter, fmt};

/// Select the top matching neighbors of every (source, source class, target class) group.
#[derive(Parser, Debug)]
#[command(name = "topmatch", version, about)]
struct Cli {
    /// Input files, directories, or glob patterns.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output directory (must not exist).
    #[arg(short, long)]
    output: PathBuf,

    /// TOML job configuration; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep the K lowest-rank neighbors per group.
    #[arg(long)]
    by_count: bool,

    /// Keep every neighbor with rank at most the distance threshold.
    #[arg(long)]
    by_distance: bool,

    #[arg(long, value_name = "K")]
    match_count: Option<usize>,

    #[arg(long, value_name = "D")]
    match_distance: Option<u64>,

    /// One output row per group listing all retained neighbors.
    #[arg(long)]
    compact: bool,

    /// Position of the class label inside each attribute block.
    #[arg(long, value_name = "ORD")]
    class_attr_ord: Option<usize>,

    /// Output field delimiter.
    #[arg(long)]
    field_delim: Option<String>,

    /// Input field delimiter (regular expression).
    #[arg(long)]
    field_delim_regex: Option<String>,

    /// Number of reduce partitions (output part files).
    #[arg(long)]
    reducers: Option<usize>,

    /// Number of map splits.
    #[arg(long)]
    partitions: Option<usize>,

    /// Worker threads (defaults to the rayon global pool).
    #[arg(long)]
    threads: Option<usize>,

    /// Disable the local pruner on map output.
    #[arg(long)]
    no_combiner: bool,

    /// Run every stage on the calling thread.
    #[arg(long)]
    sequential: bool,

    /// Fail on the first malformed record.
    #[arg(long)]
    fail_fast: bool,

    /// Write job counters as JSON.
    #[arg(long)]
    metrics_out: Option<PathBuf>,

    /// Write skipped-record errors as JSON.
    #[arg(long)]
    errors_out: Option<PathBuf>,

    /// Debug logging unless RUST_LOG is set.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn job_config(&self) -> Result<JobConfig> {
        let mut config = match &self.config {
            Some(path) => JobConfig::load(path)?,
            None => JobConfig::default(),
        };

        match (self.by_count, self.by_distance) {
            (true, true) => {
                config.nearest_by_count = Some(true);
                config.nearest_by_distance = Some(true);
            }
            (true, false) => {
                config.nearest_by_count = Some(true);
                config.nearest_by_distance = Some(false);
            }
            (false, true) => {
                config.nearest_by_count = Some(false);
                config.nearest_by_distance = Some(true);
            }
            (false, false) => {}
        }
        if let Some(k) = self.match_count {
            config.match_count = k;
        }
        if let Some(d) = self.match_distance {
            config.match_distance = d;
        }
        if self.compact {
            config.compact_output = true;
        }
        if let Some(ord) = self.class_attr_ord {
            config.class_attr_ord = Some(ord);
        }
        if let Some(delim) = &self.field_delim {
            config.field_delim.clone_from(delim);
        }
        if let Some(regex) = &self.field_delim_regex {
            config.field_delim_regex.clone_from(regex);
        }
        if let Some(n) = self.reducers {
            config.num_reducer = n;
        }
        if self.no_combiner {
            config.use_combiner = false;
        }
        if self.fail_fast {
            config.record_error_mode = RecordErrorMode::FailFast;
        }
        Ok(config)
    }

    fn runner(&self) -> Runner {
        if self.sequential {
            Runner::sequential()
        } else {
            Runner {
                mode: ExecMode::Parallel {
                    threads: self.threads,
                    partitions: self.partitions,
                },
                ..Runner::default()
            }
        }
    }

    fn into_spec(self) -> Result<JobSpec> {
        let config = self.job_config()?;
        let runner = self.runner();
        Ok(JobSpec {
            inputs: self.inputs,
            output: self.output,
            config,
            runner,
            metrics_out: self.metrics_out,
            errors_out: self.errors_out,
        })
    }
}

/// Skipped records echoed to stderr after the report.
const SHOWN_ERRORS: usize = 5;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn run(cli: Cli) -> Result<()> {
    let summary = run_job(&cli.into_spec()?)?;
    summary.report.print();
    let errors = &summary.errors;
    for error in errors.errors().iter().take(SHOWN_ERRORS) {
        eprintln!("skipped {error}");
    }
    let hidden = errors.error_count().saturating_sub(SHOWN_ERRORS as u64);
    if hidden > 0 {
        eprintln!("... and {hidden} more skipped records");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
