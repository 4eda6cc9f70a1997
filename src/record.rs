//! Delimited record parsing.
//!
//! An input line carries `sourceId, targetId, sourceFields.., targetFields.., rank`.
//! The two field blocks always have the same width, so the layout of every line is
//! fully determined by its field count. [`RecordParser`] derives that layout from
//! the first record it accepts and trusts it from then on: a later line with a
//! different field count is rejected instead of re-deriving offsets.

use crate::error::{TopMatchError, TopMatchResult};
use regex::Regex;
use std::ops::Range;

/// Minimum field count: source id, target id, one attribute, rank.
pub const MIN_FIELDS: usize = 4;

/// Field offsets shared by every record of one input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordLayout {
    /// Width of each of the source and target field blocks.
    pub record_length: usize,
    /// Total number of fields per line, ids and rank included.
    pub total_fields: usize,
}

impl RecordLayout {
    /// Derive the layout from a field count.
    ///
    /// # Errors
    /// Returns [`TopMatchError::MalformedRecord`] if the count is below
    /// [`MIN_FIELDS`] or the attribute fields cannot be split into two equal blocks.
    pub fn from_field_count(total_fields: usize) -> TopMatchResult<Self> {
        if total_fields < MIN_FIELDS {
            return Err(TopMatchError::malformed(format!(
                "expected at least {MIN_FIELDS} fields, found {total_fields}"
            )));
        }
        let attrs = total_fields - 3;
        if attrs % 2 != 0 {
            return Err(TopMatchError::malformed(format!(
                "{attrs} attribute fields cannot be split into equal source and target blocks"
            )));
        }
        Ok(Self {
            record_length: attrs / 2,
            total_fields,
        })
    }

    #[inline]
    pub fn source_range(&self) -> Range<usize> {
        2..2 + self.record_length
    }

    #[inline]
    pub fn target_range(&self) -> Range<usize> {
        let begin = 2 + self.record_length;
        begin..begin + self.record_length
    }
}

/// One parsed input line. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<String>,
    rank: u64,
}

impl RawRecord {
    pub fn source_id(&self) -> &str {
        &self.fields[0]
    }

    pub fn target_id(&self) -> &str {
        &self.fields[1]
    }

    pub fn rank(&self) -> u64 {
        self.rank
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Source attribute block under `layout`.
    pub fn source_fields(&self, layout: &RecordLayout) -> &[String] {
        &self.fields[layout.source_range()]
    }

    /// Target attribute block under `layout`.
    pub fn target_fields(&self, layout: &RecordLayout) -> &[String] {
        &self.fields[layout.target_range()]
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }
}

/// Splits lines with a delimiter pattern and caches the layout of the first
/// accepted record.
///
/// A parser is owned by a single map task; it is not shared between threads.
#[derive(Clone, Debug)]
pub struct RecordParser {
    delim: Regex,
    layout: Option<RecordLayout>,
}

impl RecordParser {
    pub fn new(delim: Regex) -> Self {
        Self { delim, layout: None }
    }

    /// Start from an already known layout instead of deriving it from the first record.
    pub fn with_layout(delim: Regex, layout: RecordLayout) -> Self {
        Self {
            delim,
            layout: Some(layout),
        }
    }

    pub fn layout(&self) -> Option<RecordLayout> {
        self.layout
    }

    /// Split a line into fields. Trailing empty fields are dropped.
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let mut fields: Vec<&str> = self.delim.split(line).collect();
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        fields
    }

    /// Parse one line, deriving the layout if this is the first accepted record.
    ///
    /// # Errors
    /// [`TopMatchError::MalformedRecord`] when the field count is too small, does not
    /// match the cached layout, or the rank is not a non-negative integer.
    pub fn parse(&mut self, line: &str) -> TopMatchResult<RawRecord> {
        let fields = self.split(line);
        let layout = match self.layout {
            Some(layout) => {
                if fields.len() != layout.total_fields {
                    return Err(TopMatchError::malformed(format!(
                        "expected {} fields, found {}",
                        layout.total_fields,
                        fields.len()
                    )));
                }
                layout
            }
            None => RecordLayout::from_field_count(fields.len())?,
        };

        let rank_field = fields[fields.len() - 1];
        let rank = rank_field.trim().parse::<u64>().map_err(|_| {
            TopMatchError::malformed(format!(
                "rank field `{rank_field}` is not a non-negative integer"
            ))
        })?;

        // Only a fully valid record may fix the layout.
        self.layout.get_or_insert(layout);

        Ok(RawRecord {
            fields: fields.into_iter().map(str::to_owned).collect(),
            rank,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> RecordParser {
        RecordParser::new(Regex::new(",").unwrap())
    }

    #[test]
    fn parses_fields_and_rank() {
        let mut p = parser();
        let r = p.parse("A,X,s0,C1,t0,K1,5").unwrap();
        assert_eq!(r.source_id(), "A");
        assert_eq!(r.target_id(), "X");
        assert_eq!(r.rank(), 5);
        let layout = p.layout().unwrap();
        assert_eq!(layout.record_length, 2);
        assert_eq!(r.source_fields(&layout), ["s0", "C1"]);
        assert_eq!(r.target_fields(&layout), ["t0", "K1"]);
    }

    #[test]
    fn rejects_short_and_uneven_lines() {
        let mut p = parser();
        assert!(matches!(p.parse("A,X,5"), Err(TopMatchError::MalformedRecord { .. })));
        assert!(matches!(p.parse("A,X,s0,5"), Err(TopMatchError::MalformedRecord { .. })));
        assert!(p.layout().is_none());
    }

    #[test]
    fn rejects_non_integer_rank_without_caching_layout() {
        let mut p = parser();
        assert!(p.parse("A,X,C1,K1,near").is_err());
        assert!(p.parse("A,X,C1,K1,-3").is_err());
        assert!(p.layout().is_none());
        assert!(p.parse("A,X,C1,K1,3").is_ok());
        assert_eq!(p.layout().unwrap().total_fields, 5);
    }

    #[test]
    fn rejects_records_inconsistent_with_cached_layout() {
        let mut p = parser();
        p.parse("A,X,C1,K1,3").unwrap();
        let err = p.parse("A,X,s0,C1,t0,K1,3").unwrap_err();
        assert!(err.to_string().contains("expected 5 fields"));
    }

    #[test]
    fn regex_delimiter_and_trailing_empties() {
        let mut p = RecordParser::new(Regex::new(r"\s*\|\s*").unwrap());
        let r = p.parse("A | X | C1 | K1 | 7 |").unwrap();
        assert_eq!(r.field_count(), 5);
        assert_eq!(r.rank(), 7);
    }
}
