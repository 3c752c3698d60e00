//! The record store collaborator.

use rowstage_core::{FieldValue, StoreError, StoreResult, Value};

/// A keyed store that staged row edits are written back to.
///
/// Rows are addressed by their identity: the named key values captured from
/// the row's baseline. Write calls carry only the fields that should be
/// written; store-assigned fields are never among them.
///
/// The cache issues at most one transaction at a time and always pairs
/// `begin_transaction` with either `commit` or `rollback`.
pub trait RecordStore {
    fn begin_transaction(&mut self) -> StoreResult<()>;

    fn commit(&mut self) -> StoreResult<()>;

    fn rollback(&mut self) -> StoreResult<()>;

    /// Inserts a row built from `values`, returning the store-assigned key
    /// if the table has one.
    fn insert(&mut self, table: &str, values: &[FieldValue]) -> StoreResult<Option<Value>>;

    /// Writes `changes` into the row identified by `key`.
    fn update(&mut self, table: &str, key: &[FieldValue], changes: &[FieldValue]) -> StoreResult<()>;

    /// Removes the row identified by `key`.
    fn delete(&mut self, table: &str, key: &[FieldValue]) -> StoreResult<()>;

    /// The most recent failure reported by this store.
    fn last_error(&self) -> Option<&StoreError>;
}

impl<S: RecordStore + ?Sized> RecordStore for &mut S {
    fn begin_transaction(&mut self) -> StoreResult<()> {
        (**self).begin_transaction()
    }

    fn commit(&mut self) -> StoreResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> StoreResult<()> {
        (**self).rollback()
    }

    fn insert(&mut self, table: &str, values: &[FieldValue]) -> StoreResult<Option<Value>> {
        (**self).insert(table, values)
    }

    fn update(&mut self, table: &str, key: &[FieldValue], changes: &[FieldValue]) -> StoreResult<()> {
        (**self).update(table, key, changes)
    }

    fn delete(&mut self, table: &str, key: &[FieldValue]) -> StoreResult<()> {
        (**self).delete(table, key)
    }

    fn last_error(&self) -> Option<&StoreError> {
        (**self).last_error()
    }
}
