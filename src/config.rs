//! Job configuration.
//!
//! [`JobConfig`] is the serializable, user-facing form: it is read from a TOML
//! file and then patched by command-line flags. [`JobConfig::resolve`] validates it
//! once and produces a [`ResolvedConfig`] that every stage reads but never
//! mutates.
//!
//! Keys may use either the snake_case names below or the dotted property names
//! used by the Hadoop job properties (`"tmc.class.attr.ord"`, `"tmc.top.match.count"`, ...):
//!
//! ```toml
//! field_delim = ","
//! field_delim_regex = ","
//! class_attr_ord = 1
//! nearest_by_count = true
//! match_count = 5
//! compact_output = true
//! num_reducer = 4
//! ```

use crate::error::{TopMatchError, TopMatchResult};
use crate::output::OutputFormat;
use crate::policy::{SelectionPolicy, ViolationReaction};
use crate::projector::Projector;
use crate::validation::RecordErrorMode;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MATCH_COUNT: usize = 10;
pub const DEFAULT_MATCH_DISTANCE: u64 = 200;

/// User-facing job options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    /// Delimiter joining output fields.
    #[serde(alias = "field.delim")]
    pub field_delim: String,
    /// Regular expression splitting input fields.
    #[serde(alias = "field.delim.regex")]
    pub field_delim_regex: String,
    /// Position of the class label inside each attribute block.
    #[serde(alias = "tmc.class.attr.ord")]
    pub class_attr_ord: Option<usize>,
    #[serde(alias = "tmc.nearest.by.count")]
    pub nearest_by_count: Option<bool>,
    #[serde(alias = "tmc.nearest.by.distance")]
    pub nearest_by_distance: Option<bool>,
    #[serde(alias = "tmc.match.count", alias = "tmc.top.match.count")]
    pub match_count: usize,
    #[serde(alias = "tmc.match.distance", alias = "tmc.top.match.distance")]
    pub match_distance: u64,
    #[serde(alias = "tmc.compact.output")]
    pub compact_output: bool,
    /// Number of reduce partitions.
    #[serde(alias = "tmc.num.reducer", alias = "num.reducer")]
    pub num_reducer: usize,
    /// Run the local pruner on map output.
    pub use_combiner: bool,
    pub record_error_mode: RecordErrorMode,
    pub on_ordering_violation: ViolationReaction,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            field_delim: ",".to_string(),
            field_delim_regex: ",".to_string(),
            class_attr_ord: None,
            nearest_by_count: None,
            nearest_by_distance: None,
            match_count: DEFAULT_MATCH_COUNT,
            match_distance: DEFAULT_MATCH_DISTANCE,
            compact_output: false,
            num_reducer: 1,
            use_combiner: true,
            record_error_mode: RecordErrorMode::default(),
            on_ordering_violation: ViolationReaction::default(),
        }
    }
}

impl JobConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    /// Returns an error for invalid TOML, unknown keys, or mistyped values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse job configuration")
    }

    /// Load a TOML configuration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Pick the single active selection policy.
    ///
    /// Count-based selection is the default when neither flag is given. Both
    /// flags on, or both explicitly off, is ambiguous.
    ///
    /// # Errors
    /// [`TopMatchError::AmbiguousPolicy`] or, for `match_count == 0`,
    /// [`TopMatchError::InvalidConfig`].
    pub fn selection_policy(&self) -> TopMatchResult<SelectionPolicy> {
        let by_count = match (self.nearest_by_count, self.nearest_by_distance) {
            (Some(true), Some(true)) => {
                return Err(TopMatchError::AmbiguousPolicy(
                    "both nearest_by_count and nearest_by_distance are enabled".into(),
                ));
            }
            (Some(false), Some(false) | None) => {
                return Err(TopMatchError::AmbiguousPolicy(
                    "neither nearest_by_count nor nearest_by_distance is enabled".into(),
                ));
            }
            (None, Some(false)) | (None, None) | (Some(true), _) => true,
            (None, Some(true)) | (Some(false), Some(true)) => false,
        };

        if by_count {
            if self.match_count == 0 {
                return Err(TopMatchError::InvalidConfig(
                    "match_count must be at least 1".into(),
                ));
            }
            Ok(SelectionPolicy::CountBased(self.match_count))
        } else {
            Ok(SelectionPolicy::DistanceBased(self.match_distance))
        }
    }

    /// Validate and freeze the configuration.
    ///
    /// # Errors
    /// Any setup error: ambiguous policy, missing class ordinal, invalid delimiter
    /// pattern, or zero reducers.
    pub fn resolve(&self) -> TopMatchResult<ResolvedConfig> {
        let policy = self.selection_policy()?;
        let class_attr_ord = self.class_attr_ord.ok_or_else(|| {
            TopMatchError::InvalidConfig("missing class attribute ordinal".into())
        })?;
        if self.field_delim_regex.is_empty() {
            return Err(TopMatchError::InvalidConfig(
                "field_delim_regex must not be empty".into(),
            ));
        }
        let field_delim_regex = Regex::new(&self.field_delim_regex).map_err(|e| {
            TopMatchError::InvalidConfig(format!(
                "invalid field_delim_regex `{}`: {e}",
                self.field_delim_regex
            ))
        })?;
        if self.num_reducer == 0 {
            return Err(TopMatchError::InvalidConfig(
                "num_reducer must be at least 1".into(),
            ));
        }

        Ok(ResolvedConfig {
            field_delim: self.field_delim.clone(),
            field_delim_regex,
            projector: Projector::new(class_attr_ord),
            policy,
            format: if self.compact_output {
                OutputFormat::Compact
            } else {
                OutputFormat::PerNeighbor
            },
            num_reducer: self.num_reducer,
            use_combiner: self.use_combiner,
            record_error_mode: self.record_error_mode,
            on_ordering_violation: self.on_ordering_violation,
        })
    }
}

/// Validated, read-only job configuration.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub field_delim: String,
    pub field_delim_regex: Regex,
    pub projector: Projector,
    pub policy: SelectionPolicy,
    pub format: OutputFormat,
    pub num_reducer: usize,
    pub use_combiner: bool,
    pub record_error_mode: RecordErrorMode,
    pub on_ordering_violation: ViolationReaction,
}
