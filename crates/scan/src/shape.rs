//! Destination shapes
//!
//! A destination is filled either as a record (column -> field), as a
//! string-keyed map (column -> entry), or as a single scalar. In many-rows
//! mode the destination is a sequence and its element type decides.

use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::record::{Record, RecordMut, ScanTarget};
use rowscan_value::{FromValue, Result as ValueResult, Value, ValueError};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

/// Static classification of a destination type
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Record {
        type_id: TypeId,
        type_name: &'static str,
        describe: fn() -> TypeDescriptor,
    },
    Map {
        type_id: TypeId,
        type_name: &'static str,
        key_type: &'static str,
        string_keys: bool,
        value_type: &'static str,
    },
    Scalar {
        type_id: TypeId,
        type_name: &'static str,
    },
}

impl Shape {
    pub fn record<T: Record>() -> Self {
        Shape::Record {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            describe: T::describe,
        }
    }

    pub fn scalar<T: 'static>() -> Self {
        Shape::Scalar {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn map<M: 'static, K: 'static, V: 'static>() -> Self {
        Shape::Map {
            type_id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
            key_type: std::any::type_name::<K>(),
            string_keys: is_string_key::<K>(),
            value_type: std::any::type_name::<V>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        match self {
            Shape::Record { type_id, .. }
            | Shape::Map { type_id, .. }
            | Shape::Scalar { type_id, .. } => *type_id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Record { type_name, .. }
            | Shape::Map { type_name, .. }
            | Shape::Scalar { type_name, .. } => type_name,
        }
    }

    /// Records and maps are dereferenced when held behind a pointer
    pub fn is_composite(&self) -> bool {
        matches!(self, Shape::Record { .. } | Shape::Map { .. })
    }
}

/// Where one row lands
pub enum SlotMut<'a> {
    Record(&'a mut dyn RecordMut),
    Map(&'a mut dyn MapMut),
    Scalar(&'a mut dyn ScanTarget),
    /// A sequence filled whole from one column, e.g. `Vec<u8>` from bytes
    Sequence(&'a mut dyn SequenceMut),
}

/// A string-keyed map destination
pub trait MapMut {
    fn insert_column(&mut self, column: &str, value: Value) -> ValueResult<()>;
}

/// A type that can receive a row
pub trait Scannable: 'static {
    fn shape() -> Shape
    where
        Self: Sized;

    /// Whether this is a pointer to a record or map, allocated per row
    fn indirect() -> bool
    where
        Self: Sized,
    {
        false
    }

    /// `None` when the storage cannot be written through this value
    fn slot(&mut self) -> Option<SlotMut<'_>>;

    /// `Some` only for growable sequences
    fn sequence(&mut self) -> Option<&mut dyn SequenceMut> {
        None
    }
}

/// Implement [`Scannable`] for record types
#[macro_export]
macro_rules! scannable_record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Scannable for $ty {
                fn shape() -> $crate::Shape {
                    $crate::Shape::record::<$ty>()
                }

                fn slot(&mut self) -> Option<$crate::SlotMut<'_>> {
                    Some($crate::SlotMut::Record(self))
                }
            }
        )+
    };
}

/// Implement [`Scannable`] for scalar types that implement `FromValue`
#[macro_export]
macro_rules! scannable_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Scannable for $ty {
                fn shape() -> $crate::Shape {
                    $crate::Shape::scalar::<$ty>()
                }

                fn slot(&mut self) -> Option<$crate::SlotMut<'_>> {
                    Some($crate::SlotMut::Scalar(self))
                }
            }
        )+
    };
}

scannable_scalar!(
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    String,
    rust_decimal::Decimal,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    uuid::Uuid,
    Value,
    serde_json::Value,
);

impl<T: FromValue + 'static> Scannable for Option<T> {
    fn shape() -> Shape {
        Shape::scalar::<Self>()
    }

    fn slot(&mut self) -> Option<SlotMut<'_>> {
        Some(SlotMut::Scalar(self))
    }
}

impl<T: Scannable> Scannable for Box<T> {
    fn shape() -> Shape {
        <T as Scannable>::shape()
    }

    fn indirect() -> bool {
        <T as Scannable>::shape().is_composite()
    }

    fn slot(&mut self) -> Option<SlotMut<'_>> {
        Scannable::slot(&mut **self)
    }

    fn sequence(&mut self) -> Option<&mut dyn SequenceMut> {
        Scannable::sequence(&mut **self)
    }
}

impl<T: Scannable> Scannable for Arc<T> {
    fn shape() -> Shape {
        <T as Scannable>::shape()
    }

    fn indirect() -> bool {
        <T as Scannable>::shape().is_composite()
    }

    fn slot(&mut self) -> Option<SlotMut<'_>> {
        // A shared Arc is read-only storage
        Arc::get_mut(self).and_then(|inner| Scannable::slot(inner))
    }

    fn sequence(&mut self) -> Option<&mut dyn SequenceMut> {
        Arc::get_mut(self).and_then(|inner| Scannable::sequence(inner))
    }
}

// ============================================================================
// Maps
// ============================================================================

fn is_string_key<K: 'static>() -> bool {
    let id = TypeId::of::<K>();
    id == TypeId::of::<String>() || id == TypeId::of::<Box<str>>() || id == TypeId::of::<Arc<str>>()
}

/// Build a `K` from a column name, `None` unless `K` is string-like
fn string_key<K: 'static>(column: &str) -> Option<K> {
    let id = TypeId::of::<K>();
    let key: Box<dyn Any> = if id == TypeId::of::<String>() {
        Box::new(column.to_string())
    } else if id == TypeId::of::<Box<str>>() {
        Box::new(Box::<str>::from(column))
    } else if id == TypeId::of::<Arc<str>>() {
        Box::new(Arc::<str>::from(column))
    } else {
        return None;
    };
    key.downcast::<K>().ok().map(|key| *key)
}

fn key_for<K: 'static>(column: &str) -> ValueResult<K> {
    string_key::<K>(column).ok_or(ValueError::Unsupported {
        target: std::any::type_name::<K>(),
    })
}

impl<K, V> MapMut for HashMap<K, V>
where
    K: Eq + Hash + 'static,
    V: FromValue + 'static,
{
    fn insert_column(&mut self, column: &str, value: Value) -> ValueResult<()> {
        let key = key_for::<K>(column)?;
        self.insert(key, V::from_value(value)?);
        Ok(())
    }
}

impl<K, V> Scannable for HashMap<K, V>
where
    K: Eq + Hash + 'static,
    V: FromValue + 'static,
{
    fn shape() -> Shape {
        Shape::map::<Self, K, V>()
    }

    fn slot(&mut self) -> Option<SlotMut<'_>> {
        Some(SlotMut::Map(self))
    }
}

impl<K, V> MapMut for BTreeMap<K, V>
where
    K: Ord + 'static,
    V: FromValue + 'static,
{
    fn insert_column(&mut self, column: &str, value: Value) -> ValueResult<()> {
        let key = key_for::<K>(column)?;
        self.insert(key, V::from_value(value)?);
        Ok(())
    }
}

impl<K, V> Scannable for BTreeMap<K, V>
where
    K: Ord + 'static,
    V: FromValue + 'static,
{
    fn shape() -> Shape {
        Shape::map::<Self, K, V>()
    }

    fn slot(&mut self) -> Option<SlotMut<'_>> {
        Some(SlotMut::Map(self))
    }
}

// ============================================================================
// Sequences
// ============================================================================

/// A growable ordered sequence destination
pub trait SequenceMut {
    fn element_shape(&self) -> Shape;

    /// Elements are boxed records or maps, allocated fresh per row
    fn element_indirect(&self) -> bool;

    /// Drop every element
    fn truncate_all(&mut self);

    /// Allocate an element, let `fill` populate it, then append it. The
    /// element is discarded if `fill` fails.
    fn push_filled(&mut self, fill: &mut dyn FnMut(SlotMut<'_>) -> Result<()>) -> Result<()>;

    /// Replace the contents from one list-like column value
    fn assign_whole(&mut self, value: Value) -> ValueResult<()>;
}

fn fill_element<T: Scannable + Default>(value: Value) -> ValueResult<T> {
    let mut element = T::default();
    let target = std::any::type_name::<T>();
    match Scannable::slot(&mut element) {
        Some(SlotMut::Scalar(slot)) => slot.assign(value)?,
        Some(SlotMut::Record(record)) => record.assign_record(value)?,
        Some(SlotMut::Sequence(seq)) => seq.assign_whole(value)?,
        Some(SlotMut::Map(map)) => match value {
            Value::Map(entries) => {
                for (column, v) in entries {
                    map.insert_column(&column, v)?;
                }
            }
            Value::Struct(fields) => {
                for (column, v) in fields {
                    map.insert_column(&column, v)?;
                }
            }
            other => {
                return Err(ValueError::Mismatch {
                    target,
                    found: other.type_name(),
                });
            }
        },
        None => return Err(ValueError::Unsupported { target }),
    }
    Ok(element)
}

fn list_items(value: Value, target: &'static str) -> ValueResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items),
        Value::Bytea(bytes) => Ok(bytes.into_iter().map(Value::U8).collect()),
        other => Err(ValueError::Mismatch {
            target,
            found: other.type_name(),
        }),
    }
}

macro_rules! impl_sequence {
    ($seq:ident, $push:ident) => {
        impl<T: Scannable + Default> SequenceMut for $seq<T> {
            fn element_shape(&self) -> Shape {
                <T as Scannable>::shape()
            }

            fn element_indirect(&self) -> bool {
                <T as Scannable>::indirect()
            }

            fn truncate_all(&mut self) {
                self.clear();
            }

            fn push_filled(
                &mut self,
                fill: &mut dyn FnMut(SlotMut<'_>) -> Result<()>,
            ) -> Result<()> {
                let mut element = T::default();
                let slot = Scannable::slot(&mut element).ok_or_else(|| {
                    Error::InvalidDestination(format!(
                        "fresh {} element is not writable",
                        std::any::type_name::<T>()
                    ))
                })?;
                fill(slot)?;
                self.$push(element);
                Ok(())
            }

            fn assign_whole(&mut self, value: Value) -> ValueResult<()> {
                let items = list_items(value, std::any::type_name::<Self>())?;
                let elements = items
                    .into_iter()
                    .map(fill_element::<T>)
                    .collect::<ValueResult<Vec<T>>>()?;
                self.clear();
                self.extend(elements);
                Ok(())
            }
        }

        impl<T: Scannable + Default> Scannable for $seq<T> {
            // Filled from a single row, a sequence is an opaque value
            fn shape() -> Shape {
                Shape::scalar::<Self>()
            }

            fn slot(&mut self) -> Option<SlotMut<'_>> {
                Some(SlotMut::Sequence(self))
            }

            fn sequence(&mut self) -> Option<&mut dyn SequenceMut> {
                Some(self)
            }
        }
    };
}

impl_sequence!(Vec, push);
impl_sequence!(VecDeque, push_back);

// ============================================================================
// Destinations
// ============================================================================

/// Object-safe view of anything a scan pass can fill
pub trait Destination {
    fn type_name(&self) -> &'static str;

    /// Shape of the destination when filled from exactly one row
    fn shape(&self) -> Shape;

    fn slot(&mut self) -> Option<SlotMut<'_>>;

    /// `Some` only for growable sequences
    fn sequence(&mut self) -> Option<&mut dyn SequenceMut> {
        None
    }
}

impl<T: Scannable> Destination for T {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn shape(&self) -> Shape {
        <T as Scannable>::shape()
    }

    fn slot(&mut self) -> Option<SlotMut<'_>> {
        Scannable::slot(self)
    }

    fn sequence(&mut self) -> Option<&mut dyn SequenceMut> {
        Scannable::sequence(self)
    }
}

/// Outcome of classifying a destination for one scan pass
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    /// Shape of what each row fills: the destination itself, or one element
    pub shape: Shape,
    /// Accumulate into a sequence
    pub many: bool,
    /// Sequence elements are boxed records or maps
    pub by_ref: bool,
}

/// Decide how `dest` is filled. In many-rows mode the sequence is emptied.
pub fn classify(dest: &mut dyn Destination, many: bool) -> Result<Classification> {
    let type_name = dest.type_name();

    let classification = if many {
        let seq = dest.sequence().ok_or(Error::NotASequence(type_name))?;
        seq.truncate_all();
        Classification {
            shape: seq.element_shape(),
            many: true,
            by_ref: seq.element_indirect(),
        }
    } else {
        if dest.slot().is_none() {
            return Err(Error::InvalidDestination(format!(
                "{} is not writable",
                type_name
            )));
        }
        Classification {
            shape: dest.shape(),
            many: false,
            by_ref: false,
        }
    };

    if let Shape::Map {
        key_type,
        string_keys: false,
        ..
    } = classification.shape
    {
        return Err(Error::UnsupportedMapKey { key_type });
    }

    Ok(classification)
}
