//! Value assignment primitive
//!
//! `FromValue` is how a single column value lands in a typed slot. The
//! conversions are deliberately narrow: integers are range checked, strings
//! may be parsed into UUIDs, and nothing else is coerced.

use crate::types::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, ValueError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    #[error("cannot assign {found} value to {target}")]
    Mismatch {
        target: &'static str,
        found: &'static str,
    },

    #[error("cannot assign NULL to {target}")]
    UnexpectedNull { target: &'static str },

    #[error("value {value} out of range for {target}")]
    OutOfRange { target: &'static str, value: String },

    #[error("invalid {target}: {message}")]
    Invalid {
        target: &'static str,
        message: String,
    },

    #[error("{target} cannot be assigned from a single column")]
    Unsupported { target: &'static str },
}

impl ValueError {
    fn mismatch<T>(found: &Value) -> Self {
        match found {
            Value::Null => ValueError::UnexpectedNull {
                target: std::any::type_name::<T>(),
            },
            other => ValueError::Mismatch {
                target: std::any::type_name::<T>(),
                found: other.type_name(),
            },
        }
    }
}

/// Build `Self` from one column value
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(ValueError::mismatch::<Self>(&other)),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($int:ty),* $(,)?) => {
        $(
            impl FromValue for $int {
                fn from_value(value: Value) -> Result<Self> {
                    let wide = value
                        .as_i128()
                        .ok_or_else(|| ValueError::mismatch::<Self>(&value))?;
                    <$int>::try_from(wide).map_err(|_| ValueError::OutOfRange {
                        target: stringify!($int),
                        value: wide.to_string(),
                    })
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::F32(f) => Ok(f),
            other => Err(ValueError::mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::F64(f) => Ok(f),
            Value::F32(f) => Ok(f as f64),
            other => Err(ValueError::mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Decimal(d) => Ok(d),
            other => match other.as_i128() {
                Some(wide) => Decimal::try_from_i128_with_scale(wide, 0).map_err(|e| {
                    ValueError::Invalid {
                        target: "Decimal",
                        message: e.to_string(),
                    }
                }),
                None => Err(ValueError::mismatch::<Self>(&other)),
            },
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(ValueError::mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for Box<str> {
    fn from_value(value: Value) -> Result<Self> {
        String::from_value(value).map(String::into_boxed_str)
    }
}

impl FromValue for Arc<str> {
    fn from_value(value: Value) -> Result<Self> {
        String::from_value(value).map(Arc::from)
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(d),
            other => Err(ValueError::mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Time(t) => Ok(t),
            other => Err(ValueError::mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            other => Err(ValueError::mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Str(s) => Uuid::parse_str(&s).map_err(|e| ValueError::Invalid {
                target: "Uuid",
                message: e.to_string(),
            }),
            other => Err(ValueError::mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Str(s) => serde_json::from_str(&s).map_err(|e| ValueError::Invalid {
                target: "json",
                message: e.to_string(),
            }),
            other => Ok(other.to_json()),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Box<T> {
    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            // Byte strings decode element-wise so Vec<u8> is the natural target
            Value::Bytea(bytes) => bytes
                .into_iter()
                .map(|b| T::from_value(Value::U8(b)))
                .collect(),
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ValueError::mismatch::<Self>(&other)),
        }
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(map) => map
                .into_iter()
                .map(|(k, v)| Ok((k, T::from_value(v)?)))
                .collect(),
            Value::Struct(fields) => fields
                .into_iter()
                .map(|(k, v)| Ok((k, T::from_value(v)?)))
                .collect(),
            other => Err(ValueError::mismatch::<Self>(&other)),
        }
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self> {
        HashMap::<String, T>::from_value(value).map(|map| map.into_iter().collect())
    }
}
