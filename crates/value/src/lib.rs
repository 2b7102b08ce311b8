//! rowscan Value - column value type shared by row sources and destinations
//!
//! This crate provides:
//! - The opaque `Value` a row source yields per column
//! - `FromValue`, the single-column assignment primitive
//! - `ValueError`, raised when a value does not fit its target

pub mod convert;
pub mod types;

pub use convert::{FromValue, Result, ValueError};
pub use types::{Row, Value};
