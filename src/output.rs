//! Output rows and their text form.

use crate::key::GroupPrefix;
use serde::{Deserialize, Serialize};

/// Row layout of the final output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One row per retained neighbor.
    #[default]
    PerNeighbor,
    /// One row per group listing every retained neighbor.
    Compact,
}

/// A group prefix followed by one or more neighbor ids.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputRow {
    pub prefix: GroupPrefix,
    pub targets: Vec<String>,
}

impl OutputRow {
    pub fn new(prefix: GroupPrefix, targets: Vec<String>) -> Self {
        Self { prefix, targets }
    }

    /// Join the row with `delim`.
    pub fn format(&self, delim: &str) -> String {
        let mut line = String::with_capacity(
            self.prefix.source_id.len()
                + self.prefix.source_class.len()
                + self.prefix.target_class.len()
                + self.targets.iter().map(|t| t.len() + delim.len()).sum::<usize>()
                + 2 * delim.len(),
        );
        line.push_str(&self.prefix.source_id);
        line.push_str(delim);
        line.push_str(&self.prefix.source_class);
        line.push_str(delim);
        line.push_str(&self.prefix.target_class);
        for target in &self.targets {
            line.push_str(delim);
            line.push_str(target);
        }
        line
    }

    /// The `(prefix, target)` pairs this row stands for.
    pub fn pairs(&self) -> impl Iterator<Item = (&GroupPrefix, &str)> {
        self.targets.iter().map(move |t| (&self.prefix, t.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_compact_row() {
        let row = OutputRow::new(
            GroupPrefix::new("A", "C1", "K1"),
            vec!["X".into(), "Y".into(), "Z".into()],
        );
        assert_eq!(row.format(","), "A,C1,K1,X,Y,Z");
        assert_eq!(row.format("\t"), "A\tC1\tK1\tX\tY\tZ");
        assert_eq!(row.pairs().count(), 3);
    }
}
