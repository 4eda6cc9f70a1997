//! Per-group reductions over rank-ordered payloads.
//!
//! Both stages implement [`GroupFn`] and consume one group's payloads in
//! ascending rank order, as delivered by the shuffle:
//!
//! - [`LocalPruner`] -- map-side combiner. Sees only the part of a group held by
//!   one map task and drops what can never survive the cutoff.
//! - [`FinalSelector`] -- reduce-side selector. Sees the whole group, applies the
//!   cutoff authoritatively, and builds [`OutputRow`](crate::output::OutputRow)s.
//!
//! Since both cutoff policies keep a prefix of an ordered group, the pruner can
//! run any number of times (including zero) without changing what the selector
//! finally keeps.
//!
//! # Examples
//! ```
//! use topmatch::combiners::{FinalSelector, GroupFn};
//! use topmatch::key::{GroupPrefix, Payload};
//! use topmatch::metrics::Counters;
//! use topmatch::output::OutputFormat;
//! use topmatch::policy::{SelectionPolicy, ViolationReaction};
//!
//! let selector = FinalSelector::new(
//!     SelectionPolicy::CountBased(1),
//!     OutputFormat::PerNeighbor,
//!     ViolationReaction::Resort,
//! );
//! let prefix = GroupPrefix::new("A", "C1", "K1");
//! let group = vec![Payload::new("X", 5), Payload::new("Y", 15)];
//! let mut rows = Vec::new();
//! selector.reduce_group(&prefix, &group, &mut Counters::default(), &mut rows)?;
//! assert_eq!(rows[0].format(","), "A,C1,K1,X");
//! # anyhow::Result::<()>::Ok(())
//! ```

mod prune;
mod select;

pub use prune::LocalPruner;
pub use select::FinalSelector;

use crate::error::{TopMatchError, TopMatchResult};
use crate::key::{GroupPrefix, Payload};
use crate::metrics::Counters;
use crate::policy::SelectionPolicy;

/// A reduction applied to one group at a time.
pub trait GroupFn: Send + Sync {
    /// Element produced for the next stage.
    type Output: Send;

    /// Reduce one group, appending results to `out`.
    ///
    /// `values` must be in ascending rank order. Implementations record what they
    /// did in `counters`; the caller owns those counters for the whole task.
    ///
    /// # Errors
    /// A failed group leaves `out` untouched and never affects other groups.
    fn reduce_group(
        &self,
        prefix: &GroupPrefix,
        values: &[Payload],
        counters: &mut Counters,
        out: &mut Vec<Self::Output>,
    ) -> TopMatchResult<()>;
}

/// Length of the prefix of `values` that `policy` retains.
///
/// `values` must be in ascending rank order.
pub fn retained_len(policy: &SelectionPolicy, values: &[Payload]) -> usize {
    let mut cutoff = policy.cutoff();
    values.iter().take_while(|p| cutoff.admit(p.rank)).count()
}

/// Apply `policy` and check rank order over the payloads the scan looked at:
/// the retained prefix plus the payload that ended it. Returns the retained length.
///
/// A descent after the scan stopped is not observed.
///
/// # Errors
/// [`TopMatchError::OrderingViolation`] for a descent inside the scanned window.
pub fn scan(
    policy: &SelectionPolicy,
    prefix: &GroupPrefix,
    values: &[Payload],
) -> TopMatchResult<usize> {
    let retained = retained_len(policy, values);
    check_order(prefix, &values[..(retained + 1).min(values.len())])?;
    Ok(retained)
}

/// Find the first payload whose rank is lower than its predecessor's.
///
/// # Errors
/// [`TopMatchError::OrderingViolation`] naming the group and offending ranks.
pub fn check_order(prefix: &GroupPrefix, values: &[Payload]) -> TopMatchResult<()> {
    match values.windows(2).find(|w| w[1].rank < w[0].rank) {
        Some(w) => Err(TopMatchError::OrderingViolation {
            group: prefix.to_string(),
            previous: w[0].rank,
            rank: w[1].rank,
        }),
        None => Ok(()),
    }
}
