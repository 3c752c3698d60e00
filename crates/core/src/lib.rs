//! Rowstage Core - Core types for the Rowstage write-back row cache.
//!
//! This crate provides the types shared by the cache and its collaborators:
//!
//! - `DataType`: Supported field types
//! - `Value`: Runtime cell values
//! - `Record`: An owned positional snapshot of a row's values
//! - `FieldValue`: A named value exchanged with a record store
//! - `RowOp`: The staged operation of a cached row
//! - `schema`: Field and table layout definitions
//! - `Error` / `StoreError`: Error types for cache and store operations
//!
//! # Example
//!
//! ```rust
//! use rowstage_core::{DataType, Record, Value};
//! use rowstage_core::schema::SchemaBuilder;
//!
//! let schema = SchemaBuilder::new("users")
//!     .unwrap()
//!     .add_field("id", DataType::Int64)
//!     .unwrap()
//!     .add_field("name", DataType::String)
//!     .unwrap()
//!     .add_primary_key(&["id"], true)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let record = Record::new(vec![Value::Int64(1), Value::String("Alice".into())]);
//! assert!(schema.check_width(&record).is_ok());
//! assert_eq!(schema.auto_column(), Some(0));
//! ```

mod error;
mod record;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result, StoreError, StoreErrorKind, StoreResult};
pub use record::{FieldValue, Record, RowOp};
pub use types::DataType;
pub use value::Value;
