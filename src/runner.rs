//! In-process batch runner for the top-match job.
//!
//! The runner plays the role of the execution engine around the selection
//! stages:
//!
//! 1. **Layout** -- derive the record layout from the first well-formed line and
//!    check the class ordinal against it before any task starts.
//! 2. **Map** -- split the input into contiguous splits; each task parses and
//!    projects its lines, sorts them by `(prefix, rank)`, optionally runs the
//!    [`LocalPruner`] over each group fragment, and buckets the result by reducer.
//! 3. **Shuffle** -- hand every reducer the sorted runs addressed to it.
//! 4. **Reduce** -- each reducer merges its runs, cuts them into groups, and runs
//!    the [`FinalSelector`] once per group.
//!
//! Tasks own their state (parser layout cache, counters, error list); the only
//! thing they share is the read-only [`ResolvedConfig`]. Counters and errors are
//! merged after each stage.

use crate::combiners::{FinalSelector, GroupFn, LocalPruner};
use crate::config::ResolvedConfig;
use crate::error::TopMatchError;
use crate::metrics::Counters;
use crate::output::OutputRow;
use crate::projector::{KeyedPayload, RecordMapper};
use crate::record::{RecordLayout, RecordParser};
use crate::shuffle::{HashPartitioner, group_sorted, merge_runs, sort_and_group, sort_pairs};
use crate::validation::{ErrorCollector, RecordError, RecordErrorMode};
use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug)]
pub enum ExecMode {
    Sequential,
    Parallel {
        threads: Option<usize>,
        partitions: Option<usize>,
    },
}

pub struct Runner {
    pub mode: ExecMode,
    pub default_partitions: usize,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            mode: ExecMode::Parallel {
                threads: None,
                partitions: None,
            },
            default_partitions: 2 * num_cpus::get().max(2),
        }
    }
}

/// Result of one job run.
#[derive(Debug, Default)]
pub struct JobOutput {
    /// Output rows per reducer, in group order.
    pub partitions: Vec<Vec<OutputRow>>,
    pub counters: Counters,
    pub errors: ErrorCollector,
}

impl JobOutput {
    /// All rows, reducer by reducer.
    pub fn rows(&self) -> impl Iterator<Item = &OutputRow> {
        self.partitions.iter().flatten()
    }

    /// Rows of every reducer joined with `delim`.
    pub fn formatted(&self, delim: &str) -> Vec<Vec<String>> {
        self.partitions
            .iter()
            .map(|rows| rows.iter().map(|r| r.format(delim)).collect())
            .collect()
    }
}

struct MapOutput {
    buckets: Vec<Vec<KeyedPayload>>,
    counters: Counters,
    errors: ErrorCollector,
}

struct ReduceOutput {
    rows: Vec<OutputRow>,
    counters: Counters,
}

impl Runner {
    /// Sequential runner (one map split, no thread pool).
    pub fn sequential() -> Self {
        Self {
            mode: ExecMode::Sequential,
            ..Default::default()
        }
    }

    /// Run the job over in-memory input lines.
    ///
    /// # Errors
    /// Setup errors (class ordinal outside the record layout), a malformed record
    /// under [`RecordErrorMode::FailFast`], or a thread pool that cannot be built.
    pub fn run(&self, cfg: &ResolvedConfig, lines: &[String]) -> Result<JobOutput> {
        match self.mode {
            ExecMode::Sequential => execute(cfg, lines, 1, false),
            ExecMode::Parallel {
                threads,
                partitions,
            } => {
                let parts = partitions.unwrap_or(self.default_partitions);
                match threads {
                    Some(t) => {
                        let pool = rayon::ThreadPoolBuilder::new()
                            .num_threads(t)
                            .build()
                            .context("build worker thread pool")?;
                        pool.install(|| execute(cfg, lines, parts, true))
                    }
                    None => execute(cfg, lines, parts, true),
                }
            }
        }
    }
}

/// Derive the layout from the first well-formed record and validate the class
/// ordinal against it. `None` when no line parses.
///
/// # Errors
/// [`TopMatchError::MissingField`] if the ordinal is outside the layout.
pub fn detect_layout(
    cfg: &ResolvedConfig,
    lines: &[String],
) -> Result<Option<RecordLayout>, TopMatchError> {
    let mut parser = RecordParser::new(cfg.field_delim_regex.clone());
    for line in lines.iter().filter(|l| !is_blank(l)) {
        if parser.parse(line).is_ok() {
            break;
        }
    }
    match parser.layout() {
        Some(layout) => {
            cfg.projector.check_layout(&layout)?;
            Ok(Some(layout))
        }
        None => Ok(None),
    }
}

fn execute(
    cfg: &ResolvedConfig,
    lines: &[String],
    partitions: usize,
    parallel: bool,
) -> Result<JobOutput> {
    let layout = detect_layout(cfg, lines).context("job setup")?;
    match layout {
        Some(l) => debug!(
            record_length = l.record_length,
            total_fields = l.total_fields,
            "derived record layout"
        ),
        None => warn!("no well-formed record in input"),
    }

    let splits = split_input(lines, partitions);
    let partitioner = HashPartitioner::new(cfg.num_reducer);
    info!(
        splits = splits.len(),
        reducers = partitioner.num_partitions(),
        policy = %cfg.policy,
        combiner = cfg.use_combiner,
        "starting map stage"
    );

    let map_outputs: Vec<MapOutput> = if parallel {
        splits
            .into_par_iter()
            .map(|(offset, split)| map_task(cfg, layout, &partitioner, offset, split))
            .collect::<Result<_>>()?
    } else {
        splits
            .into_iter()
            .map(|(offset, split)| map_task(cfg, layout, &partitioner, offset, split))
            .collect::<Result<_>>()?
    };

    let mut counters = Counters::default();
    let mut errors = ErrorCollector::new();
    let mut runs: Vec<Vec<Vec<KeyedPayload>>> = vec![Vec::new(); partitioner.num_partitions()];
    for out in map_outputs {
        counters.merge(&out.counters);
        errors.absorb(out.errors);
        for (reducer, bucket) in out.buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                runs[reducer].push(bucket);
            }
        }
    }
    info!(
        records = counters.records_read,
        malformed = counters.records_malformed,
        map_output = counters.map_output,
        combine_output = counters.combine_output,
        "map stage finished"
    );

    let selector = FinalSelector::new(cfg.policy, cfg.format, cfg.on_ordering_violation);
    let reduce_outputs: Vec<ReduceOutput> = if parallel {
        runs.into_par_iter()
            .enumerate()
            .map(|(reducer, runs)| reduce_task(&selector, reducer, runs))
            .collect()
    } else {
        runs.into_iter()
            .enumerate()
            .map(|(reducer, runs)| reduce_task(&selector, reducer, runs))
            .collect()
    };

    let mut partitions_out = Vec::with_capacity(reduce_outputs.len());
    for out in reduce_outputs {
        counters.merge(&out.counters);
        partitions_out.push(out.rows);
    }
    info!(
        groups = counters.reduce_groups,
        rows = counters.rows_emitted,
        empty_groups = counters.groups_empty,
        failed_groups = counters.groups_failed,
        "reduce stage finished"
    );

    Ok(JobOutput {
        partitions: partitions_out,
        counters,
        errors,
    })
}

/// Contiguous splits of roughly `len / n` lines, each with its starting offset.
fn split_input(lines: &[String], n: usize) -> Vec<(usize, &[String])> {
    if lines.is_empty() {
        return Vec::new();
    }
    if n <= 1 || lines.len() <= 1 {
        return vec![(0, lines)];
    }
    let chunk = lines.len().div_ceil(n);
    lines
        .chunks(chunk)
        .enumerate()
        .map(|(i, c)| (i * chunk, c))
        .collect()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn map_task(
    cfg: &ResolvedConfig,
    layout: Option<RecordLayout>,
    partitioner: &HashPartitioner,
    offset: usize,
    split: &[String],
) -> Result<MapOutput> {
    let parser = match layout {
        Some(l) => RecordParser::with_layout(cfg.field_delim_regex.clone(), l),
        None => RecordParser::new(cfg.field_delim_regex.clone()),
    };
    let mut mapper = RecordMapper::new(parser, cfg.projector);
    let mut counters = Counters::default();
    let mut errors = ErrorCollector::new();
    let mut pairs: Vec<KeyedPayload> = Vec::with_capacity(split.len());

    for (i, line) in split.iter().enumerate() {
        if is_blank(line) {
            continue;
        }
        let line_no = (offset + i + 1) as u64;
        counters.records_read += 1;
        match mapper.map_line(line) {
            Ok(pair) => pairs.push(pair),
            Err(err) if err.is_fatal() => {
                return Err(anyhow!(err).context(format!("record {line_no}")));
            }
            Err(err) => {
                counters.records_malformed += 1;
                match cfg.record_error_mode {
                    RecordErrorMode::FailFast => {
                        return Err(anyhow!(err).context(format!("record {line_no}")));
                    }
                    RecordErrorMode::LogAndContinue => {
                        warn!(line = line_no, error = %err, "skipping record");
                        errors.add(RecordError::new(Some(line_no), err.to_string()));
                    }
                    RecordErrorMode::Skip => {
                        errors.add(RecordError::new(Some(line_no), err.to_string()));
                    }
                }
            }
        }
    }
    counters.map_output = pairs.len() as u64;

    let combined = if cfg.use_combiner {
        let pruner = LocalPruner::new(cfg.policy);
        let mut out = Vec::with_capacity(pairs.len());
        for group in sort_and_group(pairs) {
            // Groups come out of a sort this task just did, so they are ordered.
            pruner.reduce_group(&group.prefix, &group.values, &mut counters, &mut out)?;
        }
        out
    } else {
        sort_pairs(&mut pairs);
        pairs
    };

    debug!(
        offset,
        lines = split.len(),
        emitted = combined.len(),
        "map task finished"
    );
    Ok(MapOutput {
        buckets: partitioner.split(combined),
        counters,
        errors,
    })
}

fn reduce_task(
    selector: &FinalSelector,
    reducer: usize,
    runs: Vec<Vec<KeyedPayload>>,
) -> ReduceOutput {
    let mut counters = Counters::default();
    let mut rows = Vec::new();
    for group in group_sorted(merge_runs(runs)) {
        let res = selector.reduce_group(&group.prefix, &group.values, &mut counters, &mut rows);
        if let Err(err) = res {
            counters.groups_failed += 1;
            debug!(reducer, error = %err, "group failed");
        }
    }
    debug!(reducer, rows = rows.len(), "reduce task finished");
    ReduceOutput { rows, counters }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobConfig;

    fn cfg(ord: usize) -> ResolvedConfig {
        JobConfig {
            class_attr_ord: Some(ord),
            match_count: 2,
            ..JobConfig::default()
        }
        .resolve()
        .unwrap()
    }

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn split_input_covers_everything_once() {
        let input = lines(&["a", "b", "c", "d", "e"]);
        let splits = split_input(&input, 2);
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0], (0, &input[0..3]));
        assert_eq!(splits[1], (3, &input[3..5]));
        assert!(split_input(&[], 4).is_empty());
    }

    #[test]
    fn layout_detection_skips_malformed_lines_and_checks_ordinal() {
        let input = lines(&["", "bad", "A,X,C1,K1,5"]);
        let layout = detect_layout(&cfg(0), &input).unwrap().unwrap();
        assert_eq!(layout.record_length, 1);
        assert!(matches!(
            detect_layout(&cfg(1), &input),
            Err(TopMatchError::MissingField { .. })
        ));
    }

    #[test]
    fn missing_field_aborts_before_output() {
        let input = lines(&["A,X,C1,K1,5"]);
        let err = Runner::sequential().run(&cfg(3), &input).unwrap_err();
        assert!(format!("{err:#}").contains("out of bounds"));
    }

    #[test]
    fn sequential_run_selects_and_counts() {
        let input = lines(&[
            "A,X,C1,K1,5",
            "A,Y,C1,K1,15",
            "A,Z,C1,K1,1",
            "A,W,C1,K2,4",
            "not,a,record",
        ]);
        let out = Runner::sequential().run(&cfg(0), &input).unwrap();
        let rows = out.formatted(",");
        assert_eq!(rows, vec![vec!["A,C1,K1,Z", "A,C1,K1,X", "A,C1,K2,W"]]);
        assert_eq!(out.counters.records_read, 5);
        assert_eq!(out.counters.records_malformed, 1);
        assert_eq!(out.errors.errors()[0].line, Some(5));
        assert_eq!(out.counters.reduce_groups, 2);
    }

    #[test]
    fn fail_fast_stops_on_malformed_record() {
        let mut c = cfg(0);
        c.record_error_mode = RecordErrorMode::FailFast;
        let input = lines(&["A,X,C1,K1,5", "A,Y,C1,K1,oops"]);
        let err = Runner::sequential().run(&c, &input).unwrap_err();
        assert!(format!("{err:#}").contains("record 2"));
    }
}
