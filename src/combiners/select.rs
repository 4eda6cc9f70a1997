//! Reduce-side selection of the final neighbor list.

use super::{GroupFn, retained_len, scan};
use crate::error::TopMatchResult;
use crate::key::{GroupPrefix, Payload};
use crate::metrics::Counters;
use crate::output::{OutputFormat, OutputRow};
use crate::policy::{SelectionPolicy, ViolationReaction};
use std::borrow::Cow;
use tracing::warn;

/// Applies the cutoff policy to a fully merged group and builds output rows.
///
/// The selector does not trust upstream pruning: it re-applies the same policy to
/// whatever it receives, so running without a combiner gives the same rows.
#[derive(Clone, Copy, Debug)]
pub struct FinalSelector {
    policy: SelectionPolicy,
    format: OutputFormat,
    on_violation: ViolationReaction,
}

impl FinalSelector {
    #[must_use]
    pub const fn new(
        policy: SelectionPolicy,
        format: OutputFormat,
        on_violation: ViolationReaction,
    ) -> Self {
        Self {
            policy,
            format,
            on_violation,
        }
    }

    pub const fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub const fn format(&self) -> OutputFormat {
        self.format
    }
}

impl GroupFn for FinalSelector {
    type Output = OutputRow;

    fn reduce_group(
        &self,
        prefix: &GroupPrefix,
        values: &[Payload],
        counters: &mut Counters,
        out: &mut Vec<OutputRow>,
    ) -> TopMatchResult<()> {
        counters.reduce_groups += 1;
        counters.reduce_input += values.len() as u64;

        let scanned = scan(&self.policy, prefix, values);
        let (values, retained): (Cow<'_, [Payload]>, usize) = match scanned {
            Ok(retained) => (Cow::Borrowed(values), retained),
            Err(err) => {
                counters.ordering_violations += 1;
                match self.on_violation {
                    ViolationReaction::Resort => {
                        warn!(error = %err, "re-sorting group before selection");
                        let mut sorted = values.to_vec();
                        sorted.sort_by_key(|p| p.rank);
                        let retained = retained_len(&self.policy, &sorted);
                        (Cow::Owned(sorted), retained)
                    }
                    ViolationReaction::SkipGroup => {
                        warn!(error = %err, "dropping group");
                        return Err(err);
                    }
                }
            }
        };

        let kept = &values[..retained];
        if kept.is_empty() {
            counters.groups_empty += 1;
            return Ok(());
        }

        let before = out.len();
        match self.format {
            OutputFormat::PerNeighbor => out.extend(
                kept.iter()
                    .map(|p| OutputRow::new(prefix.clone(), vec![p.target_id.clone()])),
            ),
            OutputFormat::Compact => out.push(OutputRow::new(
                prefix.clone(),
                kept.iter().map(|p| p.target_id.clone()).collect(),
            )),
        }
        counters.rows_emitted += (out.len() - before) as u64;
        Ok(())
    }
}
