//! Handling of records the parser rejects.
//!
//! Malformed input never aborts a group: by default the record is skipped,
//! counted, logged, and remembered in an [`ErrorCollector`] for the end-of-job
//! report. [`RecordErrorMode::FailFast`] turns the first malformed record into a
//! job failure instead.
//!
//! # Example
//!
//! ```
//! use topmatch::validation::{ErrorCollector, RecordError};
//!
//! let mut errors = ErrorCollector::with_limit(2);
//! for line in 1..=3 {
//!     errors.add(RecordError::new(Some(line), "rank field `x` is not a non-negative integer"));
//! }
//! assert_eq!(errors.error_count(), 3);
//! assert_eq!(errors.errors().len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;

/// Default number of record errors kept in memory.
pub const DEFAULT_ERROR_LIMIT: usize = 1000;

/// What the map stage does with a malformed record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordErrorMode {
    /// Skip the record and count it.
    Skip,
    /// Skip, count, log, and keep the error for the job report.
    #[default]
    LogAndContinue,
    /// Fail the job on the first malformed record.
    FailFast,
}

/// One rejected input record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    /// Input file holding the record, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// 1-based line of the record: within `source` when set, otherwise within the
    /// whole job input.
    pub line: Option<u64>,
    /// Why the record was rejected.
    pub message: String,
}

impl RecordError {
    pub fn new(line: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            source: None,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.line) {
            (Some(source), Some(line)) => write!(f, "{source}:{line}: {}", self.message),
            (Some(source), None) => write!(f, "{source}: {}", self.message),
            (None, Some(line)) => write!(f, "record {line}: {}", self.message),
            (None, None) => write!(f, "record: {}", self.message),
        }
    }
}

/// Bounded collection of record errors.
///
/// Every error is counted; only the first `limit` are stored.
#[derive(Debug, Clone)]
pub struct ErrorCollector {
    errors: Vec<RecordError>,
    total: u64,
    limit: usize,
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::with_limit(DEFAULT_ERROR_LIMIT)
    }
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            errors: Vec::new(),
            total: 0,
            limit,
        }
    }

    pub fn add(&mut self, error: RecordError) {
        self.total += 1;
        if self.errors.len() < self.limit {
            self.errors.push(error);
        }
    }

    /// Fold another collector into this one, keeping the limit.
    pub fn absorb(&mut self, other: ErrorCollector) {
        let room = self.limit.saturating_sub(self.errors.len());
        self.errors.extend(other.errors.into_iter().take(room));
        self.total += other.total;
    }

    /// Rewrite job-wide line numbers of stored errors into `(file, line in file)`
    /// pairs. Errors `locate` cannot place are left as they are.
    pub fn locate(&mut self, locate: impl Fn(u64) -> Option<(String, u64)>) {
        for error in &mut self.errors {
            if let Some((source, line)) = error.line.and_then(&locate) {
                error.source = Some(source);
                error.line = Some(line);
            }
        }
    }

    /// Total number of errors seen, stored or not.
    pub fn error_count(&self) -> u64 {
        self.total
    }

    /// Stored errors.
    pub fn errors(&self) -> &[RecordError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Export stored errors as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.errors)
    }

    /// Write stored errors to a file in JSON format.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}
