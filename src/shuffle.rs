//! Secondary sort, grouping, and partitioning.
//!
//! The ordering contract every selection stage relies on lives here: pairs are
//! sorted stably by `(source id, source class, target class, rank)` and then cut
//! into groups wherever the prefix changes. Partitioning hashes the prefix only, so
//! every pair of a group reaches the same reducer whatever its rank.

use crate::key::{GroupPrefix, Payload};
use crate::projector::KeyedPayload;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// One group: a prefix and its payloads in ascending rank order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub prefix: GroupPrefix,
    pub values: Vec<Payload>,
}

/// Stable secondary sort: prefix, then rank. Ties keep their input order.
pub fn sort_pairs(pairs: &mut [KeyedPayload]) {
    pairs.sort_by(|a, b| a.0.sort_cmp(&b.0));
}

/// Cut sorted pairs into groups at prefix boundaries.
///
/// `pairs` must already be sorted with [`sort_pairs`]; otherwise a prefix can
/// show up as more than one group.
pub fn group_sorted(pairs: impl IntoIterator<Item = KeyedPayload>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for (key, payload) in pairs {
        match groups.last_mut() {
            Some(group) if group.prefix == key.prefix => group.values.push(payload),
            _ => groups.push(Group {
                prefix: key.prefix,
                values: vec![payload],
            }),
        }
    }
    groups
}

/// Sort and group in one step.
pub fn sort_and_group(mut pairs: Vec<KeyedPayload>) -> Vec<Group> {
    sort_pairs(&mut pairs);
    group_sorted(pairs)
}

/// Routes a group prefix to one of `num_partitions` reducers.
#[derive(Clone, Copy, Debug)]
pub struct HashPartitioner {
    num_partitions: usize,
}

impl HashPartitioner {
    /// `num_partitions` is clamped to at least one.
    pub fn new(num_partitions: usize) -> Self {
        Self {
            num_partitions: num_partitions.max(1),
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    pub fn partition(&self, prefix: &GroupPrefix) -> usize {
        if self.num_partitions == 1 {
            return 0;
        }
        let mut hasher = DefaultHasher::new();
        prefix.hash(&mut hasher);
        (hasher.finish() % self.num_partitions as u64) as usize
    }

    /// Split pairs into per-reducer buckets, keeping their relative order.
    pub fn split(&self, pairs: Vec<KeyedPayload>) -> Vec<Vec<KeyedPayload>> {
        let mut buckets: Vec<Vec<KeyedPayload>> = vec![Vec::new(); self.num_partitions];
        for pair in pairs {
            let idx = self.partition(&pair.0.prefix);
            buckets[idx].push(pair);
        }
        buckets
    }
}

/// Merge the sorted runs one reducer receives from every map task.
///
/// Runs are concatenated in map-task order and re-sorted stably, so equal ranks
/// keep map-task order.
pub fn merge_runs(runs: Vec<Vec<KeyedPayload>>) -> Vec<KeyedPayload> {
    let mut merged: Vec<KeyedPayload> = Vec::with_capacity(runs.iter().map(Vec::len).sum());
    for run in runs {
        merged.extend(run);
    }
    sort_pairs(&mut merged);
    merged
}
