//! Job counters and the end-of-run report.
//!
//! Every stage works on its own [`Counters`] value and the runner merges them
//! after the stage completes, so no counter is shared between threads.
//!
//! # Example
//!
//! ```no_run
//! use topmatch::metrics::{Counters, JobReport};
//! use std::time::Duration;
//!
//! let mut counters = Counters::default();
//! counters.records_read = 10;
//! let report = JobReport::new(counters, Duration::from_millis(12));
//! report.print();
//! report.save_to_file("metrics.json")?;
//! # anyhow::Result::<()>::Ok(())
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Record and group counts for one job run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Non-blank input lines offered to the parser.
    pub records_read: u64,
    /// Lines skipped as malformed.
    pub records_malformed: u64,
    /// `(key, payload)` pairs produced by the map stage.
    pub map_output: u64,
    /// Pairs offered to the local pruner.
    pub combine_input: u64,
    /// Pairs kept by the local pruner.
    pub combine_output: u64,
    /// Groups seen by the final selector.
    pub reduce_groups: u64,
    /// Pairs seen by the final selector.
    pub reduce_input: u64,
    /// Formatted output rows.
    pub rows_emitted: u64,
    /// Groups that retained no neighbor.
    pub groups_empty: u64,
    /// Groups dropped because of an error.
    pub groups_failed: u64,
    /// Group fragments observed out of rank order.
    pub ordering_violations: u64,
}

impl Counters {
    /// Add `other` into `self`.
    pub fn merge(&mut self, other: &Counters) {
        self.records_read += other.records_read;
        self.records_malformed += other.records_malformed;
        self.map_output += other.map_output;
        self.combine_input += other.combine_input;
        self.combine_output += other.combine_output;
        self.reduce_groups += other.reduce_groups;
        self.reduce_input += other.reduce_input;
        self.rows_emitted += other.rows_emitted;
        self.groups_empty += other.groups_empty;
        self.groups_failed += other.groups_failed;
        self.ordering_violations += other.ordering_violations;
    }

    /// Sum an iterator of counters.
    pub fn sum<'a>(parts: impl IntoIterator<Item = &'a Counters>) -> Counters {
        let mut total = Counters::default();
        for c in parts {
            total.merge(c);
        }
        total
    }

    fn entries(&self) -> [(&'static str, u64, &'static str); 11] {
        [
            ("records_read", self.records_read, "Input records offered to the parser"),
            ("records_malformed", self.records_malformed, "Input records skipped as malformed"),
            ("map_output", self.map_output, "Key/payload pairs produced by the map stage"),
            ("combine_input", self.combine_input, "Pairs offered to the local pruner"),
            ("combine_output", self.combine_output, "Pairs kept by the local pruner"),
            ("reduce_groups", self.reduce_groups, "Groups seen by the final selector"),
            ("reduce_input", self.reduce_input, "Pairs seen by the final selector"),
            ("rows_emitted", self.rows_emitted, "Output rows written"),
            ("groups_empty", self.groups_empty, "Groups that retained no neighbor"),
            ("groups_failed", self.groups_failed, "Groups dropped because of an error"),
            (
                "ordering_violations",
                self.ordering_violations,
                "Group fragments seen out of rank order",
            ),
        ]
    }
}

/// Counters plus timing for a finished job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobReport {
    pub counters: Counters,
    pub elapsed: Duration,
}

impl JobReport {
    #[must_use]
    pub fn new(counters: Counters, elapsed: Duration) -> Self {
        Self { counters, elapsed }
    }

    /// Report as a JSON object of `{ name: { value, description } }` entries.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (name, value, description) in self.counters.entries() {
            map.insert(
                name.to_string(),
                json!({ "value": value, "description": description }),
            );
        }
        map.insert(
            "execution_time_ms".to_string(),
            json!({
                "value": self.elapsed.as_millis() as u64,
                "description": "Total job execution time in milliseconds",
            }),
        );
        Value::Object(map)
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("\n========== Job Counters ==========");
        println!(
            "Execution Time: {:.3}s ({} ms)",
            self.elapsed.as_secs_f64(),
            self.elapsed.as_millis()
        );
        println!("----------------------------------");
        for (name, value, description) in self.counters.entries() {
            println!("{name}: {value} ({description})");
        }
        println!("==================================\n");
    }

    /// Save the report as pretty JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(formatted.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}
