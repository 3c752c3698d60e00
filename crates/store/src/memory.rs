//! In-memory record store.
//!
//! `MemoryStore` keeps each table as an ordered map of row slots with a
//! hash index over declared key fields. Writes inside a transaction are
//! applied eagerly and journaled so that `rollback` can undo them.
//! Failures can be injected per operation to exercise error paths.

use crate::journal::{Journal, JournalEntry, SlotId};
use crate::source::VecSource;
use crate::store::RecordStore;
use hashbrown::HashMap;
use rowstage_core::schema::{Field, Schema};
use rowstage_core::{DataType, FieldValue, Record, StoreError, StoreResult, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The store operations a `FailPoint` can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Begin,
    Commit,
    Rollback,
    Insert,
    Update,
    Delete,
}

/// Makes one future call of `op` fail with `error`.
#[derive(Clone, Debug)]
pub struct FailPoint {
    op: StoreOp,
    skip: usize,
    error: StoreError,
}

impl FailPoint {
    pub fn new(op: StoreOp, error: StoreError) -> Self {
        Self { op, skip: 0, error }
    }

    /// Lets `skip` calls of the operation succeed before failing.
    pub fn after(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }
}

/// A call received by the store, recorded for inspection.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    Begin,
    Commit,
    Rollback,
    Insert {
        table: String,
        values: Vec<FieldValue>,
    },
    Update {
        table: String,
        key: Vec<FieldValue>,
        changes: Vec<FieldValue>,
    },
    Delete {
        table: String,
        key: Vec<FieldValue>,
    },
}

struct MemTable {
    schema: Arc<Schema>,
    rows: BTreeMap<SlotId, Vec<Value>>,
    /// Declared key values → slot. Empty for keyless tables.
    keys: HashMap<Vec<Value>, SlotId>,
    declared_key: bool,
    next_slot: SlotId,
    next_auto: i64,
}

impl MemTable {
    fn new(schema: Schema) -> Self {
        let declared_key = schema.fields().iter().any(Field::is_key);
        Self {
            schema: Arc::new(schema),
            rows: BTreeMap::new(),
            keys: HashMap::new(),
            declared_key,
            next_slot: 0,
            next_auto: 1,
        }
    }

    fn key_of(&self, row: &[Value]) -> Vec<Value> {
        self.schema
            .key_columns()
            .into_iter()
            .map(|i| row[i].clone())
            .collect()
    }

    fn resolve(&self, fields: &[FieldValue]) -> StoreResult<Vec<(usize, Value)>> {
        fields
            .iter()
            .map(|fv| {
                self.schema
                    .index_of(&fv.name)
                    .map(|i| (i, fv.value.clone()))
                    .ok_or_else(|| {
                        StoreError::statement(format!(
                            "unknown field {} in table {}",
                            fv.name,
                            self.schema.table()
                        ))
                    })
            })
            .collect()
    }

    fn find(&self, key: &[FieldValue]) -> StoreResult<Vec<SlotId>> {
        let key = self.resolve(key)?;
        if key.is_empty() {
            return Err(StoreError::statement("row identity is empty"));
        }
        let slots: Vec<SlotId> = self
            .rows
            .iter()
            .filter(|(_, row)| key.iter().all(|(i, v)| &row[*i] == v))
            .map(|(slot, _)| *slot)
            .collect();
        if slots.is_empty() {
            return Err(StoreError::not_found(format!(
                "no row in {} matches the given identity",
                self.schema.table()
            )));
        }
        Ok(slots)
    }

    fn check_row(&self, row: &[Value], ignore: Option<SlotId>) -> StoreResult<()> {
        for field in self.schema.fields() {
            if !field.is_nullable() && row[field.index()].is_null() {
                return Err(StoreError::constraint(format!(
                    "null value in non-nullable field {}",
                    field.name()
                )));
            }
        }
        if self.declared_key {
            if let Some(&other) = self.keys.get(&self.key_of(row)) {
                if Some(other) != ignore {
                    return Err(StoreError::constraint(format!(
                        "duplicate key in table {}",
                        self.schema.table()
                    )));
                }
            }
        }
        Ok(())
    }

    fn put(&mut self, slot: SlotId, row: Vec<Value>) {
        if let Some(auto) = self.schema.auto_column() {
            if let Some(v) = row[auto].as_i64() {
                self.next_auto = self.next_auto.max(v + 1);
            }
        }
        if self.declared_key {
            self.keys.insert(self.key_of(&row), slot);
        }
        self.next_slot = self.next_slot.max(slot + 1);
        self.rows.insert(slot, row);
    }

    fn take(&mut self, slot: SlotId) -> Option<Vec<Value>> {
        let row = self.rows.remove(&slot)?;
        if self.declared_key {
            let key = self.key_of(&row);
            self.keys.remove(&key);
        }
        Some(row)
    }

    fn assign_auto(&mut self, row: &mut [Value]) -> Option<Value> {
        let auto = self.schema.auto_column()?;
        if !row[auto].is_null() {
            return None;
        }
        let id = self.next_auto;
        self.next_auto += 1;
        let value = match self.schema.fields()[auto].data_type() {
            DataType::Int32 => Value::Int32(id as i32),
            _ => Value::Int64(id),
        };
        row[auto] = value.clone();
        Some(value)
    }
}

/// An in-memory `RecordStore`.
#[derive(Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, MemTable>,
    journal: Option<Journal>,
    fail_points: Vec<FailPoint>,
    history: Vec<StoreCall>,
    last_error: Option<StoreError>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table from a schema.
    pub fn create_table(&mut self, schema: Schema) -> StoreResult<()> {
        let name = schema.table().to_owned();
        if self.tables.contains_key(&name) {
            return Err(StoreError::statement(format!("table already exists: {}", name)));
        }
        self.tables.insert(name, MemTable::new(schema));
        Ok(())
    }

    /// Stores a complete row outside of any transaction.
    ///
    /// A null auto-value field is assigned like on insert.
    pub fn seed(&mut self, table: &str, values: Vec<Value>) -> StoreResult<()> {
        let t = self.table_mut(table)?;
        let mut row = values;
        if row.len() != t.schema.len() {
            return Err(StoreError::statement(format!(
                "row for {} has {} values, expected {}",
                table,
                row.len(),
                t.schema.len()
            )));
        }
        t.assign_auto(&mut row);
        t.check_row(&row, None)?;
        let slot = t.next_slot;
        t.put(slot, row);
        Ok(())
    }

    /// Returns a cursor over a snapshot of the table, in storage order.
    pub fn scan(&self, table: &str) -> StoreResult<VecSource> {
        let t = self.table(table)?;
        Ok(VecSource::new(Arc::clone(&t.schema), self.rows(table)?))
    }

    /// Returns the current rows of a table in storage order.
    pub fn rows(&self, table: &str) -> StoreResult<Vec<Record>> {
        let t = self.table(table)?;
        Ok(t.rows.values().map(|r| Record::new(r.clone())).collect())
    }

    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.rows.len())
    }

    pub fn schema(&self, table: &str) -> Option<Arc<Schema>> {
        self.tables.get(table).map(|t| Arc::clone(&t.schema))
    }

    pub fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    /// Arms a failure for a future call.
    pub fn inject(&mut self, fail_point: FailPoint) {
        self.fail_points.push(fail_point);
    }

    /// Calls received so far, oldest first.
    pub fn history(&self) -> &[StoreCall] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn table(&self, name: &str) -> StoreResult<&MemTable> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::statement(format!("no such table: {}", name)))
    }

    fn table_mut(&mut self, name: &str) -> StoreResult<&mut MemTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::statement(format!("no such table: {}", name)))
    }

    fn trip(&mut self, op: StoreOp) -> StoreResult<()> {
        let Some(pos) = self.fail_points.iter().position(|fp| fp.op == op) else {
            return Ok(());
        };
        if self.fail_points[pos].skip == 0 {
            let fail_point = self.fail_points.remove(pos);
            return Err(fail_point.error);
        }
        self.fail_points[pos].skip -= 1;
        Ok(())
    }

    fn track<T>(&mut self, op: StoreOp, result: StoreResult<T>) -> StoreResult<T> {
        if let Err(err) = &result {
            warn!(?op, error = %err, "memory store operation failed");
            self.last_error = Some(err.clone());
        }
        result
    }

    fn do_insert(&mut self, table: &str, values: &[FieldValue]) -> StoreResult<Option<Value>> {
        self.trip(StoreOp::Insert)?;
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::statement(format!("no such table: {}", table)))?;

        let mut row = t.schema.template().into_values();
        for (i, v) in t.resolve(values)? {
            row[i] = v;
        }
        let generated = t.assign_auto(&mut row);
        t.check_row(&row, None)?;

        let slot = t.next_slot;
        t.put(slot, row);
        if let Some(journal) = self.journal.as_mut() {
            journal.record_insert(table, slot);
        }
        debug!(table, slot, "inserted row");
        Ok(generated)
    }

    fn do_update(
        &mut self,
        table: &str,
        key: &[FieldValue],
        changes: &[FieldValue],
    ) -> StoreResult<()> {
        self.trip(StoreOp::Update)?;
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::statement(format!("no such table: {}", table)))?;

        let changes = t.resolve(changes)?;
        if changes.is_empty() {
            return Err(StoreError::statement("no fields to update"));
        }
        let slots = t.find(key)?;

        let mut staged = Vec::with_capacity(slots.len());
        for slot in slots {
            let old = t.rows[&slot].clone();
            let mut new = old.clone();
            for (i, v) in &changes {
                new[*i] = v.clone();
            }
            t.check_row(&new, Some(slot))?;
            staged.push((slot, old, new));
        }

        for (slot, old, new) in staged {
            t.take(slot);
            t.put(slot, new);
            if let Some(journal) = self.journal.as_mut() {
                journal.record_update(table, slot, old);
            }
            debug!(table, slot, "updated row");
        }
        Ok(())
    }

    fn do_delete(&mut self, table: &str, key: &[FieldValue]) -> StoreResult<()> {
        self.trip(StoreOp::Delete)?;
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::statement(format!("no such table: {}", table)))?;

        for slot in t.find(key)? {
            if let Some(row) = t.take(slot) {
                if let Some(journal) = self.journal.as_mut() {
                    journal.record_delete(table, slot, row);
                }
                debug!(table, slot, "deleted row");
            }
        }
        Ok(())
    }

    fn undo(&mut self, journal: Journal) {
        for entry in journal.into_undo() {
            let Some(t) = self.tables.get_mut(entry.table()) else {
                continue;
            };
            match entry {
                JournalEntry::Insert { slot, .. } => {
                    t.take(slot);
                }
                JournalEntry::Update { slot, old, .. } => {
                    t.take(slot);
                    t.put(slot, old);
                }
                JournalEntry::Delete { slot, row, .. } => {
                    t.put(slot, row);
                }
            }
        }
    }
}

impl RecordStore for MemoryStore {
    fn begin_transaction(&mut self) -> StoreResult<()> {
        self.history.push(StoreCall::Begin);
        let result = self.trip(StoreOp::Begin).and_then(|_| {
            if self.journal.is_some() {
                return Err(StoreError::transaction("transaction already active"));
            }
            self.journal = Some(Journal::new());
            Ok(())
        });
        self.track(StoreOp::Begin, result)
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.history.push(StoreCall::Commit);
        let result = self.trip(StoreOp::Commit).and_then(|_| {
            let journal = self
                .journal
                .take()
                .ok_or_else(|| StoreError::transaction("no active transaction"))?;
            let changes = journal.commit();
            debug!(changes = changes.len(), "committed transaction");
            Ok(())
        });
        self.track(StoreOp::Commit, result)
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.history.push(StoreCall::Rollback);
        let result = self.trip(StoreOp::Rollback).and_then(|_| {
            let journal = self
                .journal
                .take()
                .ok_or_else(|| StoreError::transaction("no active transaction"))?;
            debug!(changes = journal.len(), "rolling back transaction");
            self.undo(journal);
            Ok(())
        });
        self.track(StoreOp::Rollback, result)
    }

    fn insert(&mut self, table: &str, values: &[FieldValue]) -> StoreResult<Option<Value>> {
        self.history.push(StoreCall::Insert {
            table: table.into(),
            values: values.to_vec(),
        });
        let result = self.do_insert(table, values);
        self.track(StoreOp::Insert, result)
    }

    fn update(&mut self, table: &str, key: &[FieldValue], changes: &[FieldValue]) -> StoreResult<()> {
        self.history.push(StoreCall::Update {
            table: table.into(),
            key: key.to_vec(),
            changes: changes.to_vec(),
        });
        let result = self.do_update(table, key, changes);
        self.track(StoreOp::Update, result)
    }

    fn delete(&mut self, table: &str, key: &[FieldValue]) -> StoreResult<()> {
        self.history.push(StoreCall::Delete {
            table: table.into(),
            key: key.to_vec(),
        });
        let result = self.do_delete(table, key);
        self.track(StoreOp::Delete, result)
    }

    fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }
}
