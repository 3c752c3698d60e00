//! Per-row change tracking.
//!
//! A `RowState` keeps two owned snapshots of one row: `current`, the staged
//! values shown to the consumer, and `baseline`, the values last known to
//! match the store. A per-field changed mask records which fields the
//! consumer edited; store-assigned fields never enter that mask.
//!
//! Operation transitions:
//!
//! | from            | event             | to       |
//! |-----------------|-------------------|----------|
//! | None            | edit              | Update   |
//! | Update / Insert | edit              | same     |
//! | Delete          | edit              | rejected |
//! | None / Update   | stage delete      | Delete   |
//! | Delete          | stage delete      | Delete   |
//! | Insert / Update | submitted         | None     |
//! | Delete          | submitted         | Delete (values cleared, row awaits removal) |
//! | Update / Delete | revert            | None     |

use rowstage_core::schema::Schema;
use rowstage_core::{Error, FieldValue, Record, Result, RowOp, Value};
use std::sync::Arc;

/// One cached row and its staged operation.
#[derive(Clone, Debug)]
pub struct RowState {
    schema: Arc<Schema>,
    op: RowOp,
    current: Record,
    baseline: Record,
    changed: Vec<bool>,
    committed: bool,
    is_new: bool,
}

impl RowState {
    /// Creates a clean row from values read out of the store.
    pub fn loaded(schema: Arc<Schema>, record: Record) -> Self {
        let width = schema.len();
        Self {
            schema,
            op: RowOp::None,
            current: record.clone(),
            baseline: record,
            changed: vec![false; width],
            committed: true,
            is_new: false,
        }
    }

    /// Creates a staged new row holding the schema's template values.
    pub fn staged_insert(schema: Arc<Schema>) -> Self {
        let template = schema.template();
        let width = schema.len();
        Self {
            schema,
            op: RowOp::Insert,
            current: template.clone(),
            baseline: template,
            changed: vec![false; width],
            committed: false,
            is_new: true,
        }
    }

    #[inline]
    pub fn op(&self) -> RowOp {
        self.op
    }

    /// True when `current` has no change that still has to reach the store.
    #[inline]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// True for rows created by insert staging that were never stored.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    #[inline]
    pub fn current(&self) -> &Record {
        &self.current
    }

    #[inline]
    pub fn baseline(&self) -> &Record {
        &self.baseline
    }

    pub fn value(&self, column: usize) -> Option<&Value> {
        self.current.get(column)
    }

    /// Whether the consumer edited `column`.
    pub fn is_changed(&self, column: usize) -> bool {
        self.changed.get(column).copied().unwrap_or(false)
    }

    /// Positions of every consumer-edited field.
    pub fn changed_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.changed
            .iter()
            .enumerate()
            .filter(|(_, c)| **c)
            .map(|(i, _)| i)
    }

    /// The row has staged changes that have not reached the store.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        !self.committed
    }

    /// Whether `column` of this row would be written by a submit.
    pub fn is_dirty_at(&self, column: usize) -> bool {
        if self.committed || column >= self.changed.len() {
            return false;
        }
        match self.op {
            RowOp::Insert | RowOp::Delete => true,
            RowOp::Update => self.changed[column],
            RowOp::None => false,
        }
    }

    fn is_auto(&self, column: usize) -> bool {
        self.schema
            .field(column)
            .map_or(false, |f| f.is_auto_value())
    }

    /// Stages an edit of one field.
    ///
    /// Returns false, leaving the row untouched, when the row is staged for
    /// deletion or `column` is out of range.
    pub fn set_value(&mut self, column: usize, value: Value) -> bool {
        if self.op == RowOp::Delete || !self.current.set(column, value) {
            return false;
        }
        if !self.is_auto(column) {
            if let Some(flag) = self.changed.get_mut(column) {
                *flag = true;
            }
        }
        if self.op == RowOp::None {
            self.op = RowOp::Update;
        }
        self.committed = false;
        true
    }

    /// Stages removal of a stored row.
    ///
    /// The staged values stay visible; every writable field is flagged so the
    /// whole row reads as dirty. Staging an already deleted row is a no-op.
    /// A row that was never stored cannot be deleted; callers discard it.
    pub fn mark_deleted(&mut self) -> Result<()> {
        match self.op {
            RowOp::Insert => Err(Error::unsupported(
                "a row that was never stored cannot be staged for deletion",
            )),
            RowOp::Delete => Ok(()),
            RowOp::None | RowOp::Update => {
                self.op = RowOp::Delete;
                self.flag_all(true);
                self.committed = false;
                Ok(())
            }
        }
    }

    /// Records that the store accepted this row's staged operation.
    pub fn set_submitted(&mut self) {
        self.flag_all(false);
        self.committed = true;
        if self.op == RowOp::Delete {
            self.current.clear_values();
            return;
        }
        self.baseline = self.current.clone();
        self.op = RowOp::None;
        self.is_new = false;
    }

    /// Discards staged edits, restoring the baseline.
    ///
    /// A committed row is left alone. Update and Delete rows become clean.
    /// An Insert row is reset to its template values but stays staged.
    pub fn revert(&mut self) {
        if self.committed {
            return;
        }
        self.current = self.baseline.clone();
        self.flag_all(false);
        if self.op == RowOp::Insert {
            return;
        }
        self.op = RowOp::None;
        self.committed = true;
    }

    /// Reconciles the row with a fresh read from the store.
    ///
    /// `Some` makes the row clean with the given values. `None` means the
    /// row no longer exists: it becomes a committed delete awaiting removal.
    pub fn refresh(&mut self, record: Option<Record>) {
        self.flag_all(false);
        self.committed = true;
        match record {
            Some(record) => {
                self.op = RowOp::None;
                self.current = record.clone();
                self.baseline = record;
                self.is_new = false;
            }
            None => {
                self.op = RowOp::Delete;
                self.current.clear_values();
                self.baseline.clear_values();
            }
        }
    }

    /// The baseline identity used to locate this row in the store.
    ///
    /// Empty for rows that were never stored.
    pub fn key_values(&self) -> Vec<FieldValue> {
        if self.op == RowOp::Insert {
            return Vec::new();
        }
        self.schema
            .key_columns()
            .into_iter()
            .filter_map(|i| {
                let field = self.schema.field(i)?;
                let value = self.baseline.get(i)?;
                Some(FieldValue::new(field.name(), value.clone()))
            })
            .collect()
    }

    /// The consumer-edited fields with their staged values.
    pub fn changed_values(&self) -> Vec<FieldValue> {
        self.changed_columns()
            .filter_map(|i| {
                let field = self.schema.field(i)?;
                Some(FieldValue::new(field.name(), self.current.get(i)?.clone()))
            })
            .collect()
    }

    /// Sets every flag to `on`, except store-assigned fields which stay off.
    fn flag_all(&mut self, on: bool) {
        for (i, flag) in self.changed.iter_mut().enumerate() {
            let auto = self.schema.field(i).map_or(false, |f| f.is_auto_value());
            *flag = on && !auto;
        }
    }
}
