//! Abstract row sequence
//!
//! Adapters for concrete database clients implement [`Rows`]. The scanner
//! only advances, asks for column names and hands over write targets.

use crate::error::SourceError;
use crate::record::{OptionalRecord, RecordMut, ScanTarget};
use crate::shape::SequenceMut;
use rowscan_value::{Value, ValueError};
use std::fmt;

/// Where one column of the current row is written
pub enum Target<'a> {
    /// A leaf field or scalar destination
    Value(&'a mut dyn ScanTarget),
    /// A whole composite filled from one flattened column
    Record(&'a mut dyn RecordMut),
    /// A composite behind `Option`, allocated unless the value is NULL
    Optional(&'a mut dyn OptionalRecord),
    /// A sequence filled whole from one column
    Sequence(&'a mut dyn SequenceMut),
    /// Column the destination does not want
    Discard,
}

impl Target<'_> {
    /// Write `value` through this target
    pub fn assign(&mut self, value: Value) -> Result<(), ValueError> {
        match self {
            Target::Value(slot) => slot.assign(value),
            Target::Record(record) => record.assign_record(value),
            Target::Optional(slot) => slot.assign_optional(value),
            Target::Sequence(seq) => seq.assign_whole(value),
            Target::Discard => Ok(()),
        }
    }

    pub fn is_discard(&self) -> bool {
        matches!(self, Target::Discard)
    }
}

impl fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Target::Value(_) => "Value",
            Target::Record(record) => record.record_type(),
            Target::Optional(_) => "Optional",
            Target::Sequence(_) => "Sequence",
            Target::Discard => "Discard",
        };
        write!(f, "Target({})", kind)
    }
}

/// A forward-only cursor over result rows
pub trait Rows {
    /// Move to the next row; `false` once exhausted or failed
    fn advance(&mut self) -> bool;

    /// Column names of the current row, in row order
    fn columns(&mut self) -> Result<Vec<String>, SourceError>;

    /// Fill `targets[i]` from column `i` of the current row
    fn assign_values(&mut self, targets: &mut [Target<'_>]) -> Result<(), SourceError>;

    /// Release the underlying resources. Must be idempotent.
    fn release(&mut self) -> Result<(), SourceError>;

    /// Failure that ended iteration, if any
    fn last_error(&mut self) -> Option<SourceError>;

    /// All values of the current row, when the source can hand them over
    /// without a second assignment pass
    fn materialized_values(&mut self) -> Option<Result<Vec<Value>, SourceError>> {
        None
    }
}

impl<R: Rows + ?Sized> Rows for &mut R {
    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn columns(&mut self) -> Result<Vec<String>, SourceError> {
        (**self).columns()
    }

    fn assign_values(&mut self, targets: &mut [Target<'_>]) -> Result<(), SourceError> {
        (**self).assign_values(targets)
    }

    fn release(&mut self) -> Result<(), SourceError> {
        (**self).release()
    }

    fn last_error(&mut self) -> Option<SourceError> {
        (**self).last_error()
    }

    fn materialized_values(&mut self) -> Option<Result<Vec<Value>, SourceError>> {
        (**self).materialized_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_assign() {
        let mut n = 0i64;
        let mut name: Option<String> = Some("x".into());
        let mut bytes: Vec<u8> = Vec::new();
        {
            let mut targets = [
                Target::Value(&mut n),
                Target::Value(&mut name),
                Target::Sequence(&mut bytes),
                Target::Discard,
            ];
            let values = [
                Value::I32(7),
                Value::Null,
                Value::Bytea(vec![1, 2]),
                Value::string("ignored"),
            ];
            for (target, value) in targets.iter_mut().zip(values) {
                target.assign(value).unwrap();
            }
            assert!(targets[3].is_discard());
        }
        assert_eq!(n, 7);
        assert_eq!(name, None);
        assert_eq!(bytes, vec![1, 2]);
    }

    #[test]
    fn test_target_mismatch() {
        let mut flag = false;
        let mut target = Target::Value(&mut flag);
        assert!(matches!(
            target.assign(Value::string("yes")),
            Err(ValueError::Mismatch { .. })
        ));
    }
}
