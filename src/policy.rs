//! Cutoff policies shared by the local pruner and the final selector.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many neighbors a group keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Keep the `K` lowest-ranked neighbors.
    CountBased(usize),
    /// Keep every neighbor whose rank is at most the threshold.
    DistanceBased(u64),
}

impl SelectionPolicy {
    /// Fresh per-group scan state.
    #[must_use]
    pub fn cutoff(&self) -> Cutoff {
        Cutoff {
            policy: *self,
            retained: 0,
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountBased(k) => write!(f, "nearest {k} by count"),
            Self::DistanceBased(d) => write!(f, "nearest within distance {d}"),
        }
    }
}

/// Running cutoff over one ascending-rank scan.
///
/// Both policies retain a prefix of an ordered group, so the first rejected
/// payload ends the scan.
#[derive(Clone, Copy, Debug)]
pub struct Cutoff {
    policy: SelectionPolicy,
    retained: usize,
}

impl Cutoff {
    /// Offer the next payload's rank. `true` retains it; `false` means the scan is over.
    #[inline]
    pub fn admit(&mut self, rank: u64) -> bool {
        let keep = match self.policy {
            SelectionPolicy::CountBased(k) => self.retained < k,
            SelectionPolicy::DistanceBased(max) => rank <= max,
        };
        if keep {
            self.retained += 1;
        }
        keep
    }

    pub fn retained(&self) -> usize {
        self.retained
    }
}

/// Reaction of the selection stages to a group observed out of rank order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationReaction {
    /// Re-sort the group by rank and select from the sorted copy.
    #[default]
    Resort,
    /// Drop the group and count it as failed.
    SkipGroup,
}
