//! Record access
//!
//! Rust has no runtime reflection, so record types describe themselves
//! ([`Record::describe`]) and hand out disjoint mutable borrows of their
//! fields ([`Record::fields_mut`]). The two must agree: `fields_mut` returns
//! one entry per described field, in declaration order.

use crate::descriptor::TypeDescriptor;
use rowscan_value::{FromValue, Value, ValueError};

/// A leaf slot that one column value can be assigned to
pub trait ScanTarget {
    fn assign(&mut self, value: Value) -> Result<(), ValueError>;
}

impl<T: FromValue> ScanTarget for T {
    fn assign(&mut self, value: Value) -> Result<(), ValueError> {
        *self = T::from_value(value)?;
        Ok(())
    }
}

/// A composite destination type
pub trait Record: Default + 'static {
    /// Fields in declaration order
    fn describe() -> TypeDescriptor;

    /// Mutable access to every field, in the same order as `describe`
    fn fields_mut(&mut self) -> Vec<FieldMut<'_>>;

    /// Fill the whole record from one flattened column
    fn assign_whole(&mut self, value: Value) -> Result<(), ValueError> {
        let _ = value;
        Err(ValueError::Unsupported {
            target: std::any::type_name::<Self>(),
        })
    }
}

impl<T: Record> Record for Box<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }

    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        (**self).fields_mut()
    }

    fn assign_whole(&mut self, value: Value) -> Result<(), ValueError> {
        (**self).assign_whole(value)
    }
}

/// Object-safe view of a [`Record`]
pub trait RecordMut {
    fn record_type(&self) -> &'static str;
    fn record_fields_mut(&mut self) -> Vec<FieldMut<'_>>;
    fn assign_record(&mut self, value: Value) -> Result<(), ValueError>;
}

impl<T: Record> RecordMut for T {
    fn record_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn record_fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        self.fields_mut()
    }

    fn assign_record(&mut self, value: Value) -> Result<(), ValueError> {
        self.assign_whole(value)
    }
}

/// A nested record that may not be allocated yet
pub trait OptionalRecord {
    fn is_allocated(&self) -> bool;

    /// Allocate a default record in place if needed and return it
    fn get_or_allocate(&mut self) -> &mut dyn RecordMut;

    /// NULL clears the slot, anything else fills an allocated record
    fn assign_optional(&mut self, value: Value) -> Result<(), ValueError>;
}

impl<T: Record> OptionalRecord for Option<T> {
    fn is_allocated(&self) -> bool {
        self.is_some()
    }

    fn get_or_allocate(&mut self) -> &mut dyn RecordMut {
        self.get_or_insert_with(T::default)
    }

    fn assign_optional(&mut self, value: Value) -> Result<(), ValueError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).assign_whole(value)
    }
}

/// Mutable access to one field
pub enum FieldMut<'a> {
    Value(&'a mut dyn ScanTarget),
    Record(&'a mut dyn RecordMut),
    Optional(&'a mut dyn OptionalRecord),
}

impl<'a> FieldMut<'a> {
    pub fn value<T: FromValue>(slot: &'a mut T) -> Self {
        FieldMut::Value(slot)
    }

    pub fn record<T: Record>(slot: &'a mut T) -> Self {
        FieldMut::Record(slot)
    }

    /// Works for both `Option<T>` and `Option<Box<T>>`
    pub fn optional<T: Record>(slot: &'a mut Option<T>) -> Self {
        FieldMut::Optional(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Field;

    #[derive(Debug, Default, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl Record for Point {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::of::<Self>()
                .field(Field::scalar("X"))
                .field(Field::scalar("Y"))
        }

        fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
            vec![FieldMut::value(&mut self.x), FieldMut::value(&mut self.y)]
        }

        fn assign_whole(&mut self, value: Value) -> Result<(), ValueError> {
            match value {
                Value::List(items) if items.len() == 2 => {
                    let mut items = items.into_iter();
                    for field in self.fields_mut() {
                        if let (FieldMut::Value(slot), Some(item)) = (field, items.next()) {
                            slot.assign(item)?;
                        }
                    }
                    Ok(())
                }
                other => Err(ValueError::Mismatch {
                    target: "Point",
                    found: other.type_name(),
                }),
            }
        }
    }

    #[test]
    fn test_fields_mut_assign() {
        let mut p = Point::default();
        for (field, v) in p.fields_mut().into_iter().zip([3, 4]) {
            match field {
                FieldMut::Value(slot) => slot.assign(Value::I64(v)).unwrap(),
                _ => panic!("expected value field"),
            }
        }
        assert_eq!(p, Point { x: 3, y: 4 });
    }

    #[test]
    fn test_optional_allocates_in_place() {
        let mut slot: Option<Box<Point>> = None;
        assert!(!slot.is_allocated());

        let record = slot.get_or_allocate();
        assert!(record.record_type().contains("Point"));
        assert!(slot.is_allocated());
    }

    #[test]
    fn test_optional_null_clears() {
        let mut slot = Some(Point { x: 1, y: 2 });
        slot.assign_optional(Value::Null).unwrap();
        assert_eq!(slot, None);

        slot.assign_optional(Value::List(vec![Value::I64(5), Value::I64(6)]))
            .unwrap();
        assert_eq!(slot, Some(Point { x: 5, y: 6 }));
    }

    #[test]
    fn test_assign_whole_unsupported_by_default() {
        #[derive(Default)]
        struct Empty;

        impl Record for Empty {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::of::<Self>()
            }

            fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
                Vec::new()
            }
        }

        let mut e = Empty;
        assert!(matches!(
            e.assign_whole(Value::Null),
            Err(ValueError::Unsupported { .. })
        ));
    }
}
