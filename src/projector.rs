//! Projection of parsed records into `(GroupingKey, Payload)` pairs.

use crate::error::{TopMatchError, TopMatchResult};
use crate::key::{GroupPrefix, GroupingKey, Payload};
use crate::record::{RawRecord, RecordLayout, RecordParser};

/// One map output element.
pub type KeyedPayload = (GroupingKey, Payload);

/// Builds the grouping key from the class attribute at `class_attr_ord` in both
/// the source and target field blocks.
#[derive(Clone, Copy, Debug)]
pub struct Projector {
    class_attr_ord: usize,
}

impl Projector {
    pub const fn new(class_attr_ord: usize) -> Self {
        Self { class_attr_ord }
    }

    pub const fn class_attr_ord(&self) -> usize {
        self.class_attr_ord
    }

    /// Check that the class ordinal addresses a field inside both blocks.
    ///
    /// # Errors
    /// [`TopMatchError::MissingField`] if the ordinal is past the block width.
    pub fn check_layout(&self, layout: &RecordLayout) -> TopMatchResult<()> {
        if self.class_attr_ord >= layout.record_length {
            return Err(TopMatchError::MissingField {
                ordinal: self.class_attr_ord,
                record_length: layout.record_length,
            });
        }
        Ok(())
    }

    /// Project one record.
    ///
    /// # Errors
    /// [`TopMatchError::MissingField`] if the ordinal does not fit `layout`.
    pub fn project(
        &self,
        record: &RawRecord,
        layout: &RecordLayout,
    ) -> TopMatchResult<KeyedPayload> {
        self.check_layout(layout)?;
        let ord = self.class_attr_ord;
        let prefix = GroupPrefix::new(
            record.source_id(),
            record.source_fields(layout)[ord].as_str(),
            record.target_fields(layout)[ord].as_str(),
        );
        Ok((
            GroupingKey::new(prefix, record.rank()),
            Payload::new(record.target_id(), record.rank()),
        ))
    }
}

/// Parser plus projector for one map task.
#[derive(Clone, Debug)]
pub struct RecordMapper {
    parser: RecordParser,
    projector: Projector,
}

impl RecordMapper {
    pub fn new(parser: RecordParser, projector: Projector) -> Self {
        Self { parser, projector }
    }

    pub fn layout(&self) -> Option<RecordLayout> {
        self.parser.layout()
    }

    /// Parse and project one line.
    ///
    /// # Errors
    /// [`TopMatchError::MalformedRecord`] for lines the parser rejects and
    /// [`TopMatchError::MissingField`] when the derived layout is too narrow for the
    /// configured class ordinal. The latter is fatal to the caller.
    pub fn map_line(&mut self, line: &str) -> TopMatchResult<KeyedPayload> {
        let record = self.parser.parse(line)?;
        let layout = self
            .parser
            .layout()
            .ok_or_else(|| TopMatchError::malformed("record layout was not derived"))?;
        self.projector.project(&record, &layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn mapper(ord: usize) -> RecordMapper {
        RecordMapper::new(RecordParser::new(Regex::new(",").unwrap()), Projector::new(ord))
    }

    #[test]
    fn projects_class_attributes_into_key() {
        let mut m = mapper(1);
        let (key, payload) = m.map_line("A,X,s0,C1,t0,K1,5").unwrap();
        assert_eq!(key.prefix, GroupPrefix::new("A", "C1", "K1"));
        assert_eq!(key.rank, 5);
        assert_eq!(payload, Payload::new("X", 5));
    }

    #[test]
    fn ordinal_out_of_bounds_is_missing_field() {
        let mut m = mapper(2);
        let err = m.map_line("A,X,s0,C1,t0,K1,5").unwrap_err();
        assert_eq!(
            err,
            TopMatchError::MissingField {
                ordinal: 2,
                record_length: 2
            }
        );
        assert!(err.is_fatal());
    }
}
