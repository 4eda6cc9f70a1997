//! Grouping key and payload types.
//!
//! A [`GroupingKey`] carries the group identity ([`GroupPrefix`]) plus the rank used
//! for the secondary sort. Equality and hashing look at the prefix only, so two keys
//! with different ranks still land in the same group and the same reducer; ordering
//! within a group comes from [`GroupingKey::sort_cmp`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Group identity: `(sourceEntityId, sourceClassValue, targetClassValue)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupPrefix {
    pub source_id: String,
    pub source_class: String,
    pub target_class: String,
}

impl GroupPrefix {
    pub fn new(
        source_id: impl Into<String>,
        source_class: impl Into<String>,
        target_class: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_class: source_class.into(),
            target_class: target_class.into(),
        }
    }
}

impl fmt::Display for GroupPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.source_id, self.source_class, self.target_class)
    }
}

/// Map output key: group prefix plus rank.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupingKey {
    pub prefix: GroupPrefix,
    pub rank: u64,
}

impl GroupingKey {
    pub fn new(prefix: GroupPrefix, rank: u64) -> Self {
        Self { prefix, rank }
    }

    /// Secondary-sort order: prefix first, then ascending rank.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.prefix
            .cmp(&other.prefix)
            .then(self.rank.cmp(&other.rank))
    }

    /// True when both keys belong to the same group, whatever their ranks.
    #[inline]
    pub fn same_group(&self, other: &Self) -> bool {
        self.prefix == other.prefix
    }
}

// Grouping comparator semantics: the rank never takes part in identity.
impl PartialEq for GroupingKey {
    fn eq(&self, other: &Self) -> bool {
        self.same_group(other)
    }
}

impl Eq for GroupingKey {}

impl Hash for GroupingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prefix.hash(state);
    }
}

/// Map output value: the neighbor and its rank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub target_id: String,
    pub rank: u64,
}

impl Payload {
    pub fn new(target_id: impl Into<String>, rank: u64) -> Self {
        Self {
            target_id: target_id.into(),
            rank,
        }
    }
}
