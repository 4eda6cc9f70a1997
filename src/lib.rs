//! # topmatch
//!
//! Grouped top-K neighbor selection over pairwise distance records.
//!
//! Each input line describes one `(source, target)` pair with their attribute
//! blocks and a rank (lower is closer). Pairs are grouped by
//! `(sourceEntityId, sourceClassValue, targetClassValue)`, each group is ordered by
//! rank, and a cutoff policy keeps the closest neighbors:
//!
//! - **count based** -- the `K` lowest-rank neighbors;
//! - **distance based** -- every neighbor with `rank <= D`.
//!
//! ## Quick Start
//!
//! ```
//! use topmatch::config::JobConfig;
//! use topmatch::job::run_lines;
//! use topmatch::runner::Runner;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let config = JobConfig {
//!     class_attr_ord: Some(0),
//!     match_count: 1,
//!     ..JobConfig::default()
//! };
//! let lines = vec!["A,X,C1,K1,5".to_string(), "A,Y,C1,K1,15".to_string()];
//! let out = run_lines(&config, &Runner::sequential(), &lines)?;
//! assert_eq!(out.formatted(","), vec![vec!["A,C1,K1,X".to_string()]]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The job is a map/shuffle/reduce pipeline executed in process:
//!
//! 1. [`record`] splits lines and derives the record layout;
//! 2. [`projector`] turns a record into a grouping key and payload;
//! 3. [`shuffle`] does the secondary sort and routes groups to reducers;
//! 4. [`combiners`] holds the map-side [`LocalPruner`] and the reduce-side
//!    [`FinalSelector`];
//! 5. [`runner`] drives the stages sequentially or on a rayon pool;
//! 6. [`job`] wires configuration, file I/O, and reports around the runner.
//!
//! ## Feature Flags
//!
//! - `compression-gzip` (default) - read `.gz` inputs
//! - `cli` (default) - the `topmatch` binary

pub mod combiners;
pub mod config;
pub mod error;
pub mod io;
pub mod job;
pub mod key;
pub mod metrics;
pub mod output;
pub mod policy;
pub mod projector;
pub mod record;
pub mod runner;
pub mod shuffle;
pub mod testing;
pub mod validation;

pub use combiners::{FinalSelector, GroupFn, LocalPruner};
pub use config::{JobConfig, ResolvedConfig};
pub use error::{TopMatchError, TopMatchResult};
pub use job::{JobSpec, JobSummary, run_job, run_lines};
pub use key::{GroupPrefix, GroupingKey, Payload};
pub use metrics::{Counters, JobReport};
pub use output::{OutputFormat, OutputRow};
pub use policy::{SelectionPolicy, ViolationReaction};
pub use runner::{ExecMode, JobOutput, Runner};
