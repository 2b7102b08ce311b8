//! Value types for rowscan
//!
//! Opaque column values as a row source hands them out.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// A row of values, ordered like the row's columns
pub type Row = Vec<Value>;

/// A single column value
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    // Null
    Null,
    // Boolean
    Bool(bool),
    // Integer types
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    // Float types
    F32(f32),
    F64(f64),
    // Decimal
    Decimal(Decimal),
    // String
    Str(String),
    // Date/Time types
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    // Special types
    Uuid(Uuid),
    Bytea(Vec<u8>),
    // Collection types
    List(Vec<Value>),             // Variable-size list
    Map(HashMap<String, Value>),  // Key-value pairs
    Struct(Vec<(String, Value)>), // Named fields
    // JSON type (schemaless)
    Json(serde_json::Value),
}

impl Value {
    /// Create a string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::Str(s.into())
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Widen any integer variant to i128 so range checks stay lossless
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::I8(i) => Some(*i as i128),
            Value::I16(i) => Some(*i as i128),
            Value::I32(i) => Some(*i as i128),
            Value::I64(i) => Some(*i as i128),
            Value::U8(u) => Some(*u as i128),
            Value::U16(u) => Some(*u as i128),
            Value::U32(u) => Some(*u as i128),
            Value::U64(u) => Some(*u as i128),
            _ => None,
        }
    }

    // ========================================================================
    // Type Name
    // ========================================================================

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Bytea(_) => "bytea",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Json(_) => "json",
        }
    }

    /// Render this value as JSON, used when a map stores schemaless values
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::I8(i) => Json::from(*i),
            Value::I16(i) => Json::from(*i),
            Value::I32(i) => Json::from(*i),
            Value::I64(i) => Json::from(*i),
            Value::U8(u) => Json::from(*u),
            Value::U16(u) => Json::from(*u),
            Value::U32(u) => Json::from(*u),
            Value::U64(u) => Json::from(*u),
            Value::F32(f) => serde_json::Number::from_f64(*f as f64)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::F64(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Decimal(d) => Json::String(d.to_string()),
            Value::Str(s) => Json::String(s.clone()),
            Value::Date(d) => Json::String(d.to_string()),
            Value::Time(t) => Json::String(t.to_string()),
            Value::Timestamp(ts) => Json::String(ts.to_string()),
            Value::Uuid(u) => Json::String(u.to_string()),
            Value::Bytea(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Struct(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Json(j) => j.clone(),
        }
    }
}

// ============================================================================
// Conversions into Value
// ============================================================================

macro_rules! impl_from_native {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$native> for Value {
                fn from(v: $native) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_native!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    String => Str,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    Uuid => Uuid,
    Vec<u8> => Bytea,
    serde_json::Value => Json,
);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({:?})", b),
            Value::I8(i) => write!(f, "I8({:?})", i),
            Value::I16(i) => write!(f, "I16({:?})", i),
            Value::I32(i) => write!(f, "I32({:?})", i),
            Value::I64(i) => write!(f, "I64({:?})", i),
            Value::U8(u) => write!(f, "U8({:?})", u),
            Value::U16(u) => write!(f, "U16({:?})", u),
            Value::U32(u) => write!(f, "U32({:?})", u),
            Value::U64(u) => write!(f, "U64({:?})", u),
            Value::F32(fl) => write!(f, "F32({:?})", fl),
            Value::F64(fl) => write!(f, "F64({:?})", fl),
            Value::Decimal(d) => write!(f, "Decimal({:?})", d),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Date(d) => write!(f, "Date({:?})", d),
            Value::Time(t) => write!(f, "Time({:?})", t),
            Value::Timestamp(ts) => write!(f, "Timestamp({:?})", ts),
            Value::Uuid(u) => write!(f, "Uuid({:?})", u),
            Value::Bytea(b) => write!(f, "Bytea({} bytes)", b.len()),
            Value::List(list) => write!(f, "List({:?})", list),
            Value::Map(map) => write!(f, "Map({:?})", map),
            Value::Struct(fields) => write!(f, "Struct({:?})", fields),
            Value::Json(j) => write!(f, "Json({:?})", j),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I8(i) => write!(f, "{}", i),
            Value::I16(i) => write!(f, "{}", i),
            Value::I32(i) => write!(f, "{}", i),
            Value::I64(i) => write!(f, "{}", i),
            Value::U8(u) => write!(f, "{}", u),
            Value::U16(u) => write!(f, "{}", u),
            Value::U32(u) => write!(f, "{}", u),
            Value::U64(u) => write!(f, "{}", u),
            Value::F32(fl) => write!(f, "{}", fl),
            Value::F64(fl) => write!(f, "{}", fl),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::Timestamp(ts) => write!(f, "{}", ts),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Bytea(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(_) | Value::Map(_) | Value::Struct(_) => write!(f, "{:?}", self),
            Value::Json(j) => write!(f, "{}", j),
        }
    }
}
