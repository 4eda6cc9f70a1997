//! Map-side pruning of group fragments.

use super::{GroupFn, retained_len, scan};
use crate::error::TopMatchResult;
use crate::key::{GroupPrefix, GroupingKey, Payload};
use crate::metrics::Counters;
use crate::policy::SelectionPolicy;
use crate::projector::KeyedPayload;
use tracing::warn;

/// Combiner that cuts each group fragment down to what the policy can retain.
///
/// - `CountBased(K)`: the first `K` payloads of the fragment.
/// - `DistanceBased(D)`: payloads up to the first one ranked above `D`.
///
/// A fragment that retains nothing still forwards its first payload, so the
/// group reaches the final selector and is counted there as empty. A fragment
/// that arrives out of rank order is passed through whole.
#[derive(Clone, Copy, Debug)]
pub struct LocalPruner {
    policy: SelectionPolicy,
}

impl LocalPruner {
    #[must_use]
    pub const fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Borrow the forwarded prefix of an ordered fragment. Never empty for a
    /// non-empty fragment.
    pub fn prune<'a>(&self, values: &'a [Payload]) -> &'a [Payload] {
        &values[..forwarded_len(retained_len(&self.policy, values), values.len())]
    }
}

impl GroupFn for LocalPruner {
    type Output = KeyedPayload;

    fn reduce_group(
        &self,
        prefix: &GroupPrefix,
        values: &[Payload],
        counters: &mut Counters,
        out: &mut Vec<KeyedPayload>,
    ) -> TopMatchResult<()> {
        counters.combine_input += values.len() as u64;

        let kept = match scan(&self.policy, prefix, values) {
            Ok(retained) => &values[..forwarded_len(retained, values.len())],
            Err(err) => {
                warn!(error = %err, "combiner passing unordered fragment through unpruned");
                counters.ordering_violations += 1;
                values
            }
        };

        out.extend(
            kept.iter()
                .map(|p| (GroupingKey::new(prefix.clone(), p.rank), p.clone())),
        );
        counters.combine_output += kept.len() as u64;
        Ok(())
    }
}

fn forwarded_len(retained: usize, len: usize) -> usize {
    retained.max(len.min(1))
}
