//! Error taxonomy for the top-match job.
//!
//! Record-level errors ([`TopMatchError::MalformedRecord`]) are recoverable: the
//! record is skipped and counted. Layout and configuration errors
//! ([`TopMatchError::MissingField`], [`TopMatchError::AmbiguousPolicy`],
//! [`TopMatchError::InvalidConfig`]) are raised during setup and abort the job
//! before any data is processed. [`TopMatchError::OrderingViolation`] is scoped
//! to a single group.

use thiserror::Error;

/// Domain errors raised by the parser, projector, selection stages, and config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopMatchError {
    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("class attribute ordinal {ordinal} is out of bounds for record length {record_length}")]
    MissingField { ordinal: usize, record_length: usize },

    #[error("ambiguous selection policy: {0}")]
    AmbiguousPolicy(String),

    #[error(
        "ordering violation in group {group}: rank {rank} follows rank {previous}"
    )]
    OrderingViolation {
        group: String,
        previous: u64,
        rank: u64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TopMatchError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            reason: reason.into(),
        }
    }

    /// True for errors that must abort the job instead of skipping a record or group.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. } | Self::AmbiguousPolicy(_) | Self::InvalidConfig(_)
        )
    }
}

/// Result alias for domain operations.
pub type TopMatchResult<T> = Result<T, TopMatchError>;
