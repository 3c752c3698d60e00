//! Rowstage Model - Write-back row cache with staged edits.
//!
//! This crate provides:
//!
//! - `RowState`: Per-row change tracking over a baseline and staged values
//! - `RowCache`: Ordered rows with batched loading, staging and stable sort
//! - `TransactionCoordinator`: All-or-nothing bulk submit through a store
//! - `Notifier`: Change events and error reports for a view layer
//! - `TableModel`: A facade binding all of the above to one table
//!
//! # Example
//!
//! ```rust
//! use rowstage_core::schema::SchemaBuilder;
//! use rowstage_core::{DataType, Value};
//! use rowstage_model::{ModelOptions, TableModel};
//! use rowstage_store::MemoryStore;
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
//! store.seed("users", vec![Value::Null, "Alice".into()]).unwrap();
//!
//! let mut model = TableModel::new(ModelOptions::new("users")).unwrap();
//! model.select(store.scan("users").unwrap()).unwrap();
//!
//! model.insert_rows(1, 1).unwrap();
//! model.set_data(1, 1, "Bob").unwrap();
//! assert!(model.is_dirty());
//!
//! let summary = model.submit_all(&mut store).unwrap();
//! assert_eq!(summary.inserted, 1);
//! assert_eq!(model.data(1, 0), Some(&Value::Int64(2)));
//! assert_eq!(store.len("users"), 2);
//! ```

pub mod cache;
pub mod model;
pub mod notify;
pub mod options;
pub mod ranges;
pub mod row;
pub mod submit;

pub use cache::{RemoveOutcome, RowCache, SortOrder};
pub use model::TableModel;
pub use notify::{ChangeCallback, ErrorSink, ModelEvent, Notifier, SubscriptionId};
pub use options::{ModelOptions, DEFAULT_FETCH_BATCH_SIZE};
pub use ranges::{contiguous_runs, RowRange};
pub use row::RowState;
pub use submit::{revert_all, SubmitHook, SubmitSummary, TransactionCoordinator};
