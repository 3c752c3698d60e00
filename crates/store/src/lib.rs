//! Rowstage Store - Collaborators consumed by the Rowstage row cache.
//!
//! This crate provides:
//!
//! - `RecordSource`: A forward-only cursor that feeds raw rows into a cache
//! - `RecordStore`: The keyed, transactional store that staged edits are
//!   written back to
//! - `VecSource`: A `RecordSource` over an owned list of records
//! - `MemoryStore`: An in-memory `RecordStore` with journaled transactions
//!   and failure injection
//!
//! # Example
//!
//! ```rust
//! use rowstage_core::schema::SchemaBuilder;
//! use rowstage_core::{DataType, FieldValue, Value};
//! use rowstage_store::{MemoryStore, RecordSource, RecordStore};
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
//! let mut store = MemoryStore::new();
//! store.create_table(schema).unwrap();
//!
//! store.begin_transaction().unwrap();
//! let id = store.insert("users", &[FieldValue::new("name", "Alice")]).unwrap();
//! store.commit().unwrap();
//! assert_eq!(id, Some(Value::Int64(1)));
//!
//! let mut source = store.scan("users").unwrap();
//! assert!(source.next().unwrap().is_some());
//! assert!(source.next().unwrap().is_none());
//! ```

mod journal;
pub mod memory;
pub mod source;
pub mod store;

pub use journal::{Journal, JournalEntry};
pub use memory::{FailPoint, MemoryStore, StoreCall, StoreOp};
pub use source::{RecordSource, VecSource};
pub use store::RecordStore;
