//! Test helpers: a builder for input record lines, small fixture datasets, and
//! order-insensitive comparison of job output.
//!
//! ```
//! use topmatch::testing::RecordLineBuilder;
//!
//! let line = RecordLineBuilder::new("A", "X")
//!     .source_fields(["red", "C1"])
//!     .target_fields(["blue", "K1"])
//!     .rank(5)
//!     .build();
//! assert_eq!(line, "A,X,red,C1,blue,K1,5");
//! ```

use crate::runner::JobOutput;

/// Builds one input record line.
#[derive(Clone, Debug)]
pub struct RecordLineBuilder {
    source_id: String,
    target_id: String,
    source_fields: Vec<String>,
    target_fields: Vec<String>,
    rank: String,
    delim: String,
}

impl RecordLineBuilder {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            source_fields: Vec::new(),
            target_fields: Vec::new(),
            rank: "0".to_string(),
            delim: ",".to_string(),
        }
    }

    #[must_use]
    pub fn source_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn target_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Single-attribute shorthand: source class and target class only.
    #[must_use]
    pub fn classes(self, source_class: &str, target_class: &str) -> Self {
        self.source_fields([source_class]).target_fields([target_class])
    }

    #[must_use]
    pub fn rank(mut self, rank: u64) -> Self {
        self.rank = rank.to_string();
        self
    }

    /// Raw rank text, for malformed-rank cases.
    #[must_use]
    pub fn raw_rank(mut self, rank: impl Into<String>) -> Self {
        self.rank = rank.into();
        self
    }

    #[must_use]
    pub fn delim(mut self, delim: impl Into<String>) -> Self {
        self.delim = delim.into();
        self
    }

    #[must_use]
    pub fn build(&self) -> String {
        let mut fields = vec![self.source_id.as_str(), self.target_id.as_str()];
        fields.extend(self.source_fields.iter().map(String::as_str));
        fields.extend(self.target_fields.iter().map(String::as_str));
        fields.push(self.rank.as_str());
        fields.join(&self.delim)
    }
}

/// Shorthand for a single-attribute record line `source,target,sc,tc,rank`.
#[must_use]
pub fn pair_line(
    source: &str,
    target: &str,
    source_class: &str,
    target_class: &str,
    rank: u64,
) -> String {
    RecordLineBuilder::new(source, target)
        .classes(source_class, target_class)
        .rank(rank)
        .build()
}

/// A small single-attribute dataset (class ordinal 0) with three groups:
///
/// - `(A, C1, K1)`: `X`=5, `Y`=15, `Z`=1, `W`=15
/// - `(A, C1, K2)`: `V`=250
/// - `(B, C2, K1)`: `X`=3, `Y`=200
#[must_use]
pub fn sample_pairs() -> Vec<String> {
    vec![
        pair_line("A", "X", "C1", "K1", 5),
        pair_line("B", "X", "C2", "K1", 3),
        pair_line("A", "Y", "C1", "K1", 15),
        pair_line("A", "V", "C1", "K2", 250),
        pair_line("A", "Z", "C1", "K1", 1),
        pair_line("B", "Y", "C2", "K1", 200),
        pair_line("A", "W", "C1", "K1", 15),
    ]
}

/// A two-attribute dataset (`color`, `class`); use class ordinal 1.
#[must_use]
pub fn sample_multi_attribute_pairs() -> Vec<String> {
    let rec = |s: &str, t: &str, sf: [&str; 2], tf: [&str; 2], r: u64| {
        RecordLineBuilder::new(s, t)
            .source_fields(sf)
            .target_fields(tf)
            .rank(r)
            .build()
    };
    vec![
        rec("P1", "Q1", ["red", "gold"], ["blue", "silver"], 40),
        rec("P1", "Q2", ["red", "gold"], ["red", "silver"], 10),
        rec("P1", "Q3", ["red", "gold"], ["green", "gold"], 20),
        rec("P2", "Q1", ["blue", "silver"], ["blue", "silver"], 0),
    ]
}

/// Deterministic synthetic dataset: `sources` sources, each with `per_group`
/// neighbors in each of two target classes, ranks scattered by a fixed stride.
#[must_use]
pub fn synthetic_pairs(sources: usize, per_group: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(sources * per_group * 2);
    for s in 0..sources {
        for t in 0..per_group {
            for (k, class) in ["K1", "K2"].iter().enumerate() {
                let rank = ((s * 31 + t * 17 + k * 7) % 97) as u64;
                lines.push(pair_line(
                    &format!("S{s}"),
                    &format!("T{t}"),
                    if s % 2 == 0 { "C1" } else { "C2" },
                    class,
                    rank,
                ));
            }
        }
    }
    lines
}

/// All output lines of a job, sorted.
#[must_use]
pub fn sorted_lines(output: &JobOutput, delim: &str) -> Vec<String> {
    let mut lines: Vec<String> = output.rows().map(|r| r.format(delim)).collect();
    lines.sort();
    lines
}

/// Assert two jobs emitted the same multiset of rows.
///
/// # Panics
/// When the outputs differ.
pub fn assert_same_rows(left: &JobOutput, right: &JobOutput) {
    assert_eq!(sorted_lines(left, ","), sorted_lines(right, ","));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_lines_with_custom_delim() {
        let line = RecordLineBuilder::new("A", "X")
            .classes("C1", "K1")
            .raw_rank("-3")
            .delim("\t")
            .build();
        assert_eq!(line, "A\tX\tC1\tK1\t-3");
    }

    #[test]
    fn synthetic_dataset_has_expected_size() {
        assert_eq!(synthetic_pairs(3, 4).len(), 24);
    }
}
