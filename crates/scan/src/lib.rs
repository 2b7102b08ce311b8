//! Row scanning into typed destinations
//!
//! This crate fills records, string-keyed maps and scalars from an abstract
//! row sequence:
//! - Record types describe their fields once; the column index derived from
//!   that description is cached per type
//! - Nested records are addressed with prefixed columns (`owner.name`),
//!   embedded records share their parent's namespace
//! - Optional nested records are allocated only when the row carries one of
//!   their columns
//! - Row sources implement [`Rows`]; [`MemoryRows`] covers fetched results
//!
//! ```
//! use rowscan::{Field, FieldMut, MemoryRows, Record, Scanner, TypeDescriptor, Value};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct User {
//!     user_name: String,
//!     age: i32,
//! }
//!
//! impl Record for User {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::of::<Self>()
//!             .field(Field::scalar("UserName"))
//!             .field(Field::scalar("Age"))
//!     }
//!
//!     fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
//!         vec![FieldMut::value(&mut self.user_name), FieldMut::value(&mut self.age)]
//!     }
//! }
//!
//! rowscan::scannable_record!(User);
//!
//! let rows = MemoryRows::new(
//!     ["user_name", "age"],
//!     vec![vec![Value::string("ada"), Value::I32(36)]],
//! );
//! let mut user = User::default();
//! Scanner::default().fill_one(&mut user, rows).unwrap();
//! assert_eq!(user.user_name, "ada");
//! ```

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod filler;
pub mod index;
pub mod memory;
pub mod naming;
pub mod record;
pub mod rows;
pub mod scanner;
pub mod shape;

pub use cache::{CacheStats, ConcurrentIndexCache, IndexCache, LruIndexCache};
pub use config::ScanConfig;
pub use descriptor::{Field, FieldDescriptor, FieldKind, TypeDescriptor};
pub use error::{Error, Phase, Result, SourceError};
pub use filler::RowFiller;
pub use index::{ColumnIndex, FieldPath, Indexer};
pub use memory::{MemoryRows, MemoryRowsError};
pub use naming::{NameMapper, to_snake_case};
pub use record::{FieldMut, OptionalRecord, Record, RecordMut, ScanTarget};
pub use rows::{Rows, Target};
pub use scanner::Scanner;
pub use shape::{Classification, Destination, MapMut, Scannable, SequenceMut, Shape, SlotMut, classify};

pub use rowscan_value::{FromValue, Value, ValueError};
