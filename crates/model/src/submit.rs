//! Bulk submit and revert of staged row operations.
//!
//! `TransactionCoordinator::submit_all` writes every dirty row of a
//! `RowCache` through a `RecordStore` inside one transaction. Either every
//! staged operation reaches the store and the cache is reconciled, or the
//! store transaction is rolled back and every row touched by the pass is
//! restored to the state it had before the pass began.

use crate::cache::RowCache;
use crate::notify::ModelEvent;
use crate::ranges::contiguous_runs;
use crate::row::RowState;
use rowstage_core::{Error, FieldValue, Result, RowOp, Value};
use rowstage_store::RecordStore;
use tracing::{debug, info, warn};

/// Callbacks run just before a row's operation is sent to the store.
///
/// Implementations may amend the outgoing field lists, for example to stamp
/// audit columns. All methods default to no-ops.
pub trait SubmitHook {
    fn before_insert(&mut self, _row: usize, _values: &mut Vec<FieldValue>) {}

    fn before_update(&mut self, _row: usize, _key: &[FieldValue], _changes: &mut Vec<FieldValue>) {}

    fn before_delete(&mut self, _row: usize, _key: &[FieldValue]) {}
}

/// Counts reported by a successful `submit_all`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Number of contiguous runs removed from the cache after commit.
    pub removed_runs: usize,
}

impl SubmitSummary {
    /// Total number of rows written.
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// An open store transaction that rolls back unless committed.
struct StoreTransaction<'t, S: RecordStore + ?Sized> {
    store: &'t mut S,
    table: &'t str,
    open: bool,
}

impl<'t, S: RecordStore + ?Sized> StoreTransaction<'t, S> {
    fn begin(store: &'t mut S, table: &'t str) -> Result<Self> {
        store
            .begin_transaction()
            .map_err(|e| Error::store(table, e))?;
        Ok(Self {
            store,
            table,
            open: true,
        })
    }

    fn store(&mut self) -> &mut S {
        self.store
    }

    /// Commits; on failure the transaction is rolled back when dropped.
    fn commit(mut self) -> Result<()> {
        self.store
            .commit()
            .map_err(|e| Error::store(self.table, e))?;
        self.open = false;
        Ok(())
    }

    fn abort(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        match self.store.rollback() {
            Ok(()) => warn!(table = self.table, "transaction rolled back"),
            Err(err) => warn!(table = self.table, error = %err, "rollback failed"),
        }
    }
}

impl<S: RecordStore + ?Sized> Drop for StoreTransaction<'_, S> {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Applies a cache's staged operations to a record store.
pub struct TransactionCoordinator<'a, S: RecordStore + ?Sized> {
    store: &'a mut S,
    table: &'a str,
    hook: Option<&'a mut dyn SubmitHook>,
}

impl<'a, S: RecordStore + ?Sized> TransactionCoordinator<'a, S> {
    /// Creates a coordinator writing to `table` through `store`.
    pub fn new(store: &'a mut S, table: &'a str) -> Self {
        Self {
            store,
            table,
            hook: None,
        }
    }

    pub fn with_hook(mut self, hook: &'a mut dyn SubmitHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Writes every dirty row in index order under one transaction.
    ///
    /// On success inserted and updated rows become clean, store-assigned
    /// keys are written back and announced once the transaction commits,
    /// and deleted rows are removed from the cache one contiguous run at a
    /// time. On failure the store is rolled back,
    /// every row touched by this pass is restored, and the error names the
    /// failing row and operation. A cache without dirty rows never opens a
    /// transaction.
    pub fn submit_all(&mut self, cache: &mut RowCache) -> Result<SubmitSummary> {
        if self.table.is_empty() {
            return Err(Error::not_configured("no table name given for submit"));
        }
        let dirty = cache.dirty_rows();
        if dirty.is_empty() {
            return Ok(SubmitSummary::default());
        }

        let table = self.table;
        let mut snapshots: Vec<(usize, RowState)> = Vec::with_capacity(dirty.len());
        let mut deleted = Vec::new();
        let mut generated = Vec::new();
        let mut summary = SubmitSummary::default();

        let mut tx = StoreTransaction::begin(&mut *self.store, table)?;
        let mut hook = self.hook.as_deref_mut();
        for &row in &dirty {
            let Some(state) = cache.row(row) else {
                continue;
            };
            snapshots.push((row, state.clone()));
            let op = state.op();
            debug!(table, row, op = %op, "applying row operation");

            let applied = match op {
                RowOp::Insert => apply_insert(tx.store(), table, cache, row, hook.as_deref_mut()),
                RowOp::Update => {
                    apply_update(tx.store(), table, cache, row, hook.as_deref_mut()).map(|_| None)
                }
                RowOp::Delete => {
                    apply_delete(tx.store(), table, cache, row, hook.as_deref_mut()).map(|_| None)
                }
                RowOp::None => Ok(None),
            };
            match applied {
                Ok(Some(key)) => generated.push((row, key)),
                Ok(None) => {}
                Err(err) => {
                    drop(tx);
                    cache.restore(snapshots);
                    return Err(err);
                }
            }
            match op {
                RowOp::Insert => summary.inserted += 1,
                RowOp::Update => summary.updated += 1,
                RowOp::Delete => {
                    summary.deleted += 1;
                    deleted.push(row);
                }
                RowOp::None => {}
            }
        }

        if let Err(err) = tx.commit() {
            cache.restore(snapshots);
            return Err(err);
        }

        for (row, (column, value)) in generated {
            cache.emit(ModelEvent::GeneratedKey { row, value });
            cache.emit(ModelEvent::CellChanged { row, column });
        }
        let runs = contiguous_runs(&deleted);
        cache.remove_runs(&runs);
        summary.removed_runs = runs.len();
        info!(
            table,
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            "submitted staged rows"
        );
        Ok(summary)
    }
}

fn apply_insert<S: RecordStore + ?Sized>(
    store: &mut S,
    table: &str,
    cache: &mut RowCache,
    row: usize,
    hook: Option<&mut (dyn SubmitHook + '_)>,
) -> Result<Option<(usize, Value)>> {
    let mut values = match cache.row(row) {
        Some(state) => state.changed_values(),
        None => return Ok(None),
    };
    if let Some(hook) = hook {
        hook.before_insert(row, &mut values);
    }
    let generated = store
        .insert(table, &values)
        .map_err(|e| Error::store_row(table, row, RowOp::Insert, e))?;

    let auto = cache.schema().auto_column();
    let Some(state) = cache.row_mut(row) else {
        return Ok(None);
    };
    let echoed = match (generated, auto) {
        (Some(value), Some(column)) => {
            state.set_value(column, value.clone());
            Some((column, value))
        }
        _ => None,
    };
    state.set_submitted();

    if let Some((_, value)) = &echoed {
        debug!(table, row, key = %value, "store assigned key");
    }
    Ok(echoed)
}

fn apply_update<S: RecordStore + ?Sized>(
    store: &mut S,
    table: &str,
    cache: &mut RowCache,
    row: usize,
    hook: Option<&mut (dyn SubmitHook + '_)>,
) -> Result<()> {
    let (key, mut changes) = match cache.row(row) {
        Some(state) => (state.key_values(), state.changed_values()),
        None => return Ok(()),
    };
    if changes.is_empty() {
        return Err(Error::unsupported(format!(
            "row {} has no writable changes to update",
            row
        )));
    }
    if let Some(hook) = hook {
        hook.before_update(row, &key, &mut changes);
    }
    store
        .update(table, &key, &changes)
        .map_err(|e| Error::store_row(table, row, RowOp::Update, e))?;
    if let Some(state) = cache.row_mut(row) {
        state.set_submitted();
    }
    Ok(())
}

fn apply_delete<S: RecordStore + ?Sized>(
    store: &mut S,
    table: &str,
    cache: &mut RowCache,
    row: usize,
    hook: Option<&mut (dyn SubmitHook + '_)>,
) -> Result<()> {
    let key = match cache.row(row) {
        Some(state) => state.key_values(),
        None => return Ok(()),
    };
    if let Some(hook) = hook {
        hook.before_delete(row, &key);
    }
    store
        .delete(table, &key)
        .map_err(|e| Error::store_row(table, row, RowOp::Delete, e))?;
    if let Some(state) = cache.row_mut(row) {
        state.set_submitted();
    }
    Ok(())
}

/// Discards every staged change in the cache.
///
/// Staged inserts are dropped; staged updates and deletes go back to their
/// baseline. Returns true if anything changed.
pub fn revert_all(cache: &mut RowCache) -> bool {
    let mut inserts = Vec::new();
    let mut reverted = 0;
    for row in cache.dirty_rows() {
        let Some(state) = cache.row_mut(row) else {
            continue;
        };
        if state.op() == RowOp::Insert {
            inserts.push(row);
        } else {
            state.revert();
            reverted += 1;
        }
    }

    if reverted > 0 {
        cache.emit(ModelEvent::LayoutAboutToChange);
        cache.emit(ModelEvent::LayoutChanged);
    }
    cache.remove_runs(&contiguous_runs(&inserts));
    debug!(
        table = cache.schema().table(),
        reverted,
        discarded = inserts.len(),
        "reverted staged rows"
    );
    reverted > 0 || !inserts.is_empty()
}
