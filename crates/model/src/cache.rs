//! The ordered row cache.
//!
//! `RowCache` owns every `RowState` of one result set. Index order is the
//! row order the consumer sees; all position-based operations (append,
//! staged insert and delete, sort, removal after submit) work on it.

use crate::notify::{ModelEvent, Notifier};
use crate::ranges::{contiguous_runs, RowRange};
use crate::row::RowState;
use rowstage_core::schema::Schema;
use rowstage_core::{Error, Record, Result, RowOp, Value};
use rowstage_store::RecordSource;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Direction of an in-memory sort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// What `stage_remove` did to the targeted rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// Stored rows newly staged for deletion.
    pub staged: usize,
    /// Never-stored rows dropped from the cache.
    pub discarded: usize,
}

/// Ordered collection of cached rows.
pub struct RowCache {
    schema: Arc<Schema>,
    rows: Vec<RowState>,
    exhausted: bool,
    active_sort: Option<(usize, SortOrder)>,
    notifier: Notifier,
}

impl RowCache {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            exhausted: false,
            active_sort: None,
            notifier: Notifier::new(),
        }
    }

    /// Drops every row and rebinds the cache to `schema`.
    pub fn reset(&mut self, schema: Arc<Schema>) {
        self.schema = schema;
        self.rows.clear();
        self.exhausted = false;
        self.active_sort = None;
        self.notifier.emit(&ModelEvent::Reset);
    }

    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn rows(&self) -> &[RowState] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&RowState> {
        self.rows.get(index)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row)?.value(column)
    }

    /// True once a fetch found the source empty.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The column and direction of the last sort, if any.
    #[inline]
    pub fn active_sort(&self) -> Option<(usize, SortOrder)> {
        self.active_sort
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    pub(crate) fn emit(&self, event: ModelEvent) {
        self.notifier.emit(&event);
    }

    pub(crate) fn row_mut(&mut self, index: usize) -> Option<&mut RowState> {
        self.rows.get_mut(index)
    }

    fn check_cell(&self, row: usize, column: usize) -> Result<()> {
        if row >= self.rows.len() {
            return Err(Error::invalid_argument(format!(
                "row {} out of range (rows: {})",
                row,
                self.rows.len()
            )));
        }
        if column >= self.schema.len() {
            return Err(Error::invalid_argument(format!(
                "column {} out of range (columns: {})",
                column,
                self.schema.len()
            )));
        }
        Ok(())
    }

    /// Stages an edit of one cell.
    ///
    /// Returns `Ok(false)` without touching any flag when `value` equals the
    /// cell's current value.
    pub fn set_value(&mut self, row: usize, column: usize, value: Value) -> Result<bool> {
        self.check_cell(row, column)?;
        let state = &mut self.rows[row];
        if state.op() == RowOp::Delete {
            return Err(Error::unsupported(format!(
                "row {} is staged for deletion and cannot be edited",
                row
            )));
        }
        if state.value(column) == Some(&value) {
            return Ok(false);
        }
        state.set_value(column, value);
        self.emit(ModelEvent::CellChanged { row, column });
        Ok(true)
    }

    /// Inserts `count` fresh staged-insert rows before `at`.
    pub fn stage_insert(&mut self, at: usize, count: usize) -> Result<()> {
        if at > self.rows.len() || count == 0 {
            return Err(Error::invalid_argument(format!(
                "cannot insert {} rows at {} (rows: {})",
                count,
                at,
                self.rows.len()
            )));
        }
        let fresh = (0..count).map(|_| RowState::staged_insert(Arc::clone(&self.schema)));
        self.rows.splice(at..at, fresh);
        self.emit(ModelEvent::RowsInserted {
            start: at,
            end: at + count - 1,
        });
        Ok(())
    }

    /// Stages removal of `count` rows starting at `at`.
    ///
    /// Stored rows are staged for deletion and stay visible until submitted.
    /// Never-stored rows are dropped at once. Rows already staged for
    /// deletion are left alone.
    pub fn stage_remove(&mut self, at: usize, count: usize) -> Result<RemoveOutcome> {
        let end = at.checked_add(count).filter(|&end| count > 0 && end <= self.rows.len());
        let Some(end) = end else {
            return Err(Error::invalid_argument(format!(
                "cannot remove {} rows at {} (rows: {})",
                count,
                at,
                self.rows.len()
            )));
        };

        let mut outcome = RemoveOutcome::default();
        let mut discard = Vec::new();
        for i in (at..end).rev() {
            let row = &mut self.rows[i];
            match row.op() {
                RowOp::Insert => discard.push(i),
                RowOp::Delete => {}
                RowOp::None | RowOp::Update => {
                    row.mark_deleted()?;
                    outcome.staged += 1;
                }
            }
        }

        discard.reverse();
        outcome.discarded = discard.len();
        self.remove_runs(&contiguous_runs(&discard));

        if outcome.staged > 0 {
            self.emit(ModelEvent::LayoutAboutToChange);
            self.emit(ModelEvent::LayoutChanged);
        }
        Ok(outcome)
    }

    /// Pulls up to `batch` rows from `source` and appends them as clean rows.
    ///
    /// Returns the number of rows appended. A pull that finds no row marks
    /// the cache exhausted; running out of rows is never an error. A source
    /// failure or a record of the wrong width keeps the rows pulled before
    /// it and is then reported.
    pub fn load_more(&mut self, source: &mut dyn RecordSource, batch: usize) -> Result<usize> {
        if batch == 0 {
            return Err(Error::invalid_argument("batch size must be positive"));
        }

        let mut fetched: Vec<Record> = Vec::with_capacity(batch);
        let mut failure = None;
        while fetched.len() < batch {
            match source.next() {
                Ok(Some(record)) => {
                    if let Err(err) = self.schema.check_width(&record) {
                        failure = Some(err);
                        break;
                    }
                    fetched.push(record);
                }
                Ok(None) => break,
                Err(err) => {
                    failure = Some(Error::store(self.schema.table(), err));
                    break;
                }
            }
        }

        let count = fetched.len();
        if count == 0 && failure.is_none() {
            self.exhausted = true;
            debug!(table = self.schema.table(), "source exhausted");
            return Ok(0);
        }

        if count > 0 {
            let start = self.rows.len();
            let schema = &self.schema;
            self.rows
                .extend(fetched.into_iter().map(|r| RowState::loaded(Arc::clone(schema), r)));
            debug!(table = self.schema.table(), start, count, "appended batch");
            self.emit(ModelEvent::RowsInserted {
                start,
                end: start + count - 1,
            });
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }

    /// Stable in-memory sort by one column's staged value.
    ///
    /// Nulls come first ascending and last descending; they are never handed
    /// to the value comparator. Rows with equal keys keep their relative
    /// order. Operations and dirty flags are untouched.
    pub fn sort(&mut self, column: usize, order: SortOrder) -> Result<()> {
        if column >= self.schema.len() {
            return Err(Error::invalid_argument(format!(
                "column {} out of range (columns: {})",
                column,
                self.schema.len()
            )));
        }
        self.active_sort = Some((column, order));
        if self.rows.is_empty() {
            return Ok(());
        }

        self.emit(ModelEvent::LayoutAboutToChange);
        self.rows
            .sort_by(|a, b| compare_cells(a.value(column), b.value(column), order));
        self.emit(ModelEvent::LayoutChanged);
        Ok(())
    }

    /// True if any row has staged changes.
    pub fn is_dirty(&self) -> bool {
        self.rows.iter().any(RowState::is_dirty)
    }

    /// True if the given cell would be written by a submit.
    pub fn is_dirty_at(&self, row: usize, column: usize) -> bool {
        self.rows
            .get(row)
            .map_or(false, |state| state.is_dirty_at(column))
    }

    /// Indices of rows with staged changes, ascending.
    pub fn dirty_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_dirty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Reconciles one row with a fresh read from the store; `None` drops it.
    pub fn refresh_row(&mut self, row: usize, record: Option<Record>) -> Result<()> {
        if row >= self.rows.len() {
            return Err(Error::invalid_argument(format!(
                "row {} out of range (rows: {})",
                row,
                self.rows.len()
            )));
        }
        match record {
            Some(record) => {
                self.schema.check_width(&record)?;
                self.rows[row].refresh(Some(record));
                for column in 0..self.schema.len() {
                    self.emit(ModelEvent::CellChanged { row, column });
                }
            }
            None => {
                self.rows[row].refresh(None);
                self.remove_runs(&[RowRange::new(row, row)]);
            }
        }
        Ok(())
    }

    /// Removes each run, highest first, announcing one removal per run.
    pub(crate) fn remove_runs(&mut self, runs: &[RowRange]) {
        for run in runs.iter().rev() {
            self.rows.drain(run.start..=run.end);
            self.emit(ModelEvent::RowsRemoved {
                start: run.start,
                end: run.end,
            });
        }
    }

    /// Puts back row snapshots taken earlier, announced as one layout change.
    pub(crate) fn restore(&mut self, snapshots: Vec<(usize, RowState)>) {
        if snapshots.is_empty() {
            return;
        }
        self.emit(ModelEvent::LayoutAboutToChange);
        for (index, state) in snapshots {
            if let Some(slot) = self.rows.get_mut(index) {
                *slot = state;
            }
        }
        self.emit(ModelEvent::LayoutChanged);
    }
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>, order: SortOrder) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b, order) {
        (None, None, _) => Ordering::Equal,
        (None, Some(_), SortOrder::Ascending) => Ordering::Less,
        (None, Some(_), SortOrder::Descending) => Ordering::Greater,
        (Some(_), None, SortOrder::Ascending) => Ordering::Greater,
        (Some(_), None, SortOrder::Descending) => Ordering::Less,
        (Some(a), Some(b), SortOrder::Ascending) => a.cmp(b),
        (Some(a), Some(b), SortOrder::Descending) => b.cmp(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowstage_core::schema::SchemaBuilder;
    use rowstage_core::{DataType, StoreError, StoreResult};
    use rowstage_store::VecSource;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn schema() -> Arc<Schema> {
        Arc::new(
            SchemaBuilder::new("people")
                .unwrap()
                .add_field("id", DataType::Int64)
                .unwrap()
                .add_field("name", DataType::String)
                .unwrap()
                .add_nullable(&["name"])
                .add_primary_key(&["id"], true)
                .unwrap()
                .build()
                .unwrap(),
        )
    }

    fn record(id: i64, name: Option<&str>) -> Record {
        Record::new(vec![Value::Int64(id), name.into()])
    }

    fn source(n: i64) -> VecSource {
        VecSource::new(
            schema(),
            (1..=n).map(|i| record(i, Some("x"))).collect(),
        )
    }

    fn cache_with(rows: Vec<Record>) -> RowCache {
        let mut cache = RowCache::new(schema());
        let mut src = VecSource::new(schema(), rows);
        cache.load_more(&mut src, 100).unwrap();
        cache
    }

    fn record_events(cache: &mut RowCache) -> Rc<RefCell<Vec<ModelEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        cache
            .notifier_mut()
            .subscribe(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    fn ids(cache: &RowCache) -> Vec<i64> {
        cache
            .rows()
            .iter()
            .map(|r| r.value(0).and_then(Value::as_i64).unwrap_or(-1))
            .collect()
    }

    #[test]
    fn test_load_more_batches() {
        let mut cache = RowCache::new(schema());
        let mut src = source(5);
        let mut sizes = Vec::new();
        let mut exhausted = Vec::new();
        for _ in 0..4 {
            sizes.push(cache.load_more(&mut src, 2).unwrap());
            exhausted.push(cache.is_exhausted());
        }
        assert_eq!(sizes, vec![2, 2, 1, 0]);
        assert_eq!(exhausted, vec![false, false, false, true]);
        assert_eq!(cache.len(), 5);
        assert!(!cache.is_dirty());
    }

    #[test]
    fn test_load_more_rejects_zero_batch() {
        let mut cache = RowCache::new(schema());
        assert!(matches!(
            cache.load_more(&mut source(1), 0),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_load_more_notifies_appended_range() {
        let mut cache = RowCache::new(schema());
        let events = record_events(&mut cache);
        let mut src = source(3);
        cache.load_more(&mut src, 2).unwrap();
        cache.load_more(&mut src, 2).unwrap();
        assert_eq!(
            *events.borrow(),
            vec![
                ModelEvent::RowsInserted { start: 0, end: 1 },
                ModelEvent::RowsInserted { start: 2, end: 2 },
            ]
        );
    }

    struct FailingSource {
        inner: VecSource,
        fail_after: usize,
    }

    impl RecordSource for FailingSource {
        fn schema(&self) -> Arc<Schema> {
            self.inner.schema()
        }

        fn next(&mut self) -> StoreResult<Option<Record>> {
            if self.inner.yielded() == self.fail_after {
                return Err(StoreError::connection("cursor lost"));
            }
            self.inner.next()
        }
    }

    #[test]
    fn test_load_more_keeps_rows_before_failure() {
        let mut cache = RowCache::new(schema());
        let mut src = FailingSource {
            inner: source(5),
            fail_after: 1,
        };
        let err = cache.load_more(&mut src, 3).unwrap_err();
        assert!(err.store_error().is_some());
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_exhausted());
    }

    #[test]
    fn test_load_more_rejects_wrong_width() {
        let mut cache = RowCache::new(schema());
        let mut src = VecSource::new(schema(), vec![Record::new(vec![Value::Int64(1)])]);
        assert!(cache.load_more(&mut src, 1).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_more_keeps_rows_before_wrong_width() {
        let mut cache = RowCache::new(schema());
        let events = record_events(&mut cache);
        let mut src = VecSource::new(
            schema(),
            vec![
                record(1, Some("a")),
                record(2, Some("b")),
                Record::new(vec![Value::Int64(3)]),
                record(4, Some("d")),
            ],
        );

        let err = cache.load_more(&mut src, 10).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(ids(&cache), vec![1, 2]);
        assert_eq!(
            *events.borrow(),
            vec![ModelEvent::RowsInserted { start: 0, end: 1 }]
        );
        assert!(!cache.is_exhausted());

        assert_eq!(cache.load_more(&mut src, 10).unwrap(), 1);
        assert_eq!(ids(&cache), vec![1, 2, 4]);
    }

    #[test]
    fn test_stage_insert() {
        let mut cache = cache_with(vec![record(1, Some("a")), record(2, Some("b"))]);
        let events = record_events(&mut cache);

        cache.stage_insert(1, 2).unwrap();
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.row(1).unwrap().op(), RowOp::Insert);
        assert_eq!(cache.row(2).unwrap().op(), RowOp::Insert);
        assert_eq!(cache.row(3).unwrap().value(0), Some(&Value::Int64(2)));
        assert_eq!(
            *events.borrow(),
            vec![ModelEvent::RowsInserted { start: 1, end: 2 }]
        );

        cache.stage_insert(4, 1).unwrap();
        assert!(cache.stage_insert(6, 1).is_err());
        assert!(cache.stage_insert(0, 0).is_err());
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn test_stage_remove_mixed_rows() {
        let mut cache = cache_with(vec![record(1, Some("a")), record(2, Some("b"))]);
        cache.stage_insert(1, 1).unwrap();
        cache.set_value(2, 1, "edited".into()).unwrap();
        // rows: [clean 1, insert, update 2]

        let outcome = cache.stage_remove(0, 3).unwrap();
        assert_eq!(outcome, RemoveOutcome { staged: 2, discarded: 1 });
        assert_eq!(cache.len(), 2);
        assert!(cache.rows().iter().all(|r| r.op() == RowOp::Delete));

        let again = cache.stage_remove(0, 2).unwrap();
        assert_eq!(again, RemoveOutcome::default());
    }

    #[test]
    fn test_stage_remove_notifies_discarded_runs() {
        let mut cache = cache_with(vec![record(1, Some("a"))]);
        cache.stage_insert(0, 2).unwrap();
        cache.stage_insert(3, 1).unwrap();
        // rows: [insert, insert, clean 1, insert]
        let events = record_events(&mut cache);

        cache.stage_remove(0, 4).unwrap();
        assert_eq!(ids(&cache), vec![1]);
        assert_eq!(
            *events.borrow(),
            vec![
                ModelEvent::RowsRemoved { start: 3, end: 3 },
                ModelEvent::RowsRemoved { start: 0, end: 1 },
                ModelEvent::LayoutAboutToChange,
                ModelEvent::LayoutChanged,
            ]
        );
    }

    #[test]
    fn test_stage_remove_bounds() {
        let mut cache = cache_with(vec![record(1, None)]);
        assert!(cache.stage_remove(0, 2).is_err());
        assert!(cache.stage_remove(1, 1).is_err());
        assert!(cache.stage_remove(0, 0).is_err());
        assert!(cache.stage_remove(usize::MAX, 2).is_err());
        assert_eq!(cache.row(0).unwrap().op(), RowOp::None);
    }

    #[test]
    fn test_set_value() {
        let mut cache = cache_with(vec![record(1, Some("a"))]);
        let events = record_events(&mut cache);

        assert!(!cache.set_value(0, 1, "a".into()).unwrap());
        assert!(!cache.is_dirty());

        assert!(cache.set_value(0, 1, "b".into()).unwrap());
        assert!(cache.is_dirty());
        assert!(cache.is_dirty_at(0, 1));
        assert!(!cache.is_dirty_at(0, 0));
        assert_eq!(
            *events.borrow(),
            vec![ModelEvent::CellChanged { row: 0, column: 1 }]
        );

        assert!(matches!(
            cache.set_value(0, 2, Value::Null),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            cache.set_value(1, 0, Value::Null),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_set_value_on_deleted_row_is_unsupported() {
        let mut cache = cache_with(vec![record(1, Some("a"))]);
        cache.stage_remove(0, 1).unwrap();
        assert!(matches!(
            cache.set_value(0, 1, "b".into()),
            Err(Error::Unsupported { .. })
        ));
        assert_eq!(cache.value(0, 1), Some(&Value::String("a".into())));
    }

    #[test]
    fn test_sort_nulls_and_direction() {
        let mut cache = cache_with(vec![
            record(1, Some("c")),
            record(2, None),
            record(3, Some("a")),
            record(4, Some("b")),
        ]);

        cache.sort(1, SortOrder::Ascending).unwrap();
        assert_eq!(ids(&cache), vec![2, 3, 4, 1]);

        cache.sort(1, SortOrder::Descending).unwrap();
        assert_eq!(ids(&cache), vec![1, 4, 3, 2]);
        assert_eq!(cache.active_sort(), Some((1, SortOrder::Descending)));
    }

    #[test]
    fn test_sort_is_stable_and_keeps_flags() {
        let mut cache = cache_with(vec![
            record(1, Some("b")),
            record(2, Some("a")),
            record(3, Some("b")),
            record(4, Some("a")),
        ]);
        cache.set_value(2, 0, Value::Int64(30)).unwrap();
        cache.stage_remove(3, 1).unwrap();

        cache.sort(1, SortOrder::Ascending).unwrap();
        assert_eq!(ids(&cache), vec![2, 4, 1, 30]);
        assert_eq!(cache.row(1).unwrap().op(), RowOp::Delete);
        assert_eq!(cache.row(2).unwrap().op(), RowOp::None);
        assert_eq!(cache.row(3).unwrap().op(), RowOp::Update);
    }

    #[test]
    fn test_sort_events_and_bad_column() {
        let mut cache = cache_with(vec![record(2, None), record(1, None)]);
        let events = record_events(&mut cache);
        cache.sort(0, SortOrder::Ascending).unwrap();
        assert_eq!(
            *events.borrow(),
            vec![ModelEvent::LayoutAboutToChange, ModelEvent::LayoutChanged]
        );
        assert!(cache.sort(2, SortOrder::Ascending).is_err());
    }

    #[test]
    fn test_dirty_rows() {
        let mut cache = cache_with(vec![record(1, None), record(2, None), record(3, None)]);
        cache.set_value(2, 1, "x".into()).unwrap();
        cache.stage_remove(0, 1).unwrap();
        assert_eq!(cache.dirty_rows(), vec![0, 2]);
        assert!(cache.is_dirty_at(0, 0));
        assert!(!cache.is_dirty_at(1, 1));
        assert!(!cache.is_dirty_at(9, 0));
    }

    #[test]
    fn test_refresh_row() {
        let mut cache = cache_with(vec![record(1, Some("a")), record(2, Some("b"))]);
        cache.set_value(0, 1, "edited".into()).unwrap();

        cache.refresh_row(0, Some(record(1, Some("server")))).unwrap();
        assert_eq!(cache.value(0, 1), Some(&Value::String("server".into())));
        assert!(!cache.is_dirty());

        let events = record_events(&mut cache);
        cache.refresh_row(1, None).unwrap();
        assert_eq!(ids(&cache), vec![1]);
        assert_eq!(
            *events.borrow(),
            vec![ModelEvent::RowsRemoved { start: 1, end: 1 }]
        );
        assert!(cache.refresh_row(5, None).is_err());
    }

    #[test]
    fn test_reset() {
        let mut cache = cache_with(vec![record(1, None)]);
        let mut src = source(0);
        cache.load_more(&mut src, 1).unwrap();
        assert!(cache.is_exhausted());

        cache.reset(schema());
        assert!(cache.is_empty());
        assert!(!cache.is_exhausted());
    }
}
