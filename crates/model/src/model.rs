//! The table model facade.
//!
//! `TableModel` binds a row cache to one backing table: it pulls rows from a
//! bound `RecordSource` in batches, stages consumer edits, and submits them
//! through a caller-supplied `RecordStore`. The store is passed in per
//! submit rather than held, so one store can serve many models.

use crate::cache::{RemoveOutcome, RowCache, SortOrder};
use crate::notify::{ModelEvent, SubscriptionId};
use crate::options::ModelOptions;
use crate::submit::{revert_all, SubmitHook, SubmitSummary, TransactionCoordinator};
use rowstage_core::schema::Schema;
use rowstage_core::{Error, Record, Result, Value};
use rowstage_store::{RecordSource, RecordStore};
use std::sync::Arc;
use tracing::debug;

/// A write-back table model over one backing table.
pub struct TableModel {
    options: ModelOptions,
    cache: RowCache,
    source: Option<Box<dyn RecordSource>>,
    hook: Option<Box<dyn SubmitHook>>,
    last_error: Option<Error>,
}

fn unbound_schema(table: &str) -> Arc<Schema> {
    Arc::new(Schema::new(table, Vec::new()))
}

impl TableModel {
    /// Creates an empty model; fails if `options` do not validate.
    pub fn new(options: ModelOptions) -> Result<Self> {
        options.validate()?;
        let cache = RowCache::new(unbound_schema(&options.table));
        Ok(Self {
            options,
            cache,
            source: None,
            hook: None,
            last_error: None,
        })
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn cache(&self) -> &RowCache {
        &self.cache
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.cache.schema()
    }

    /// Records a failure as the last error and reports it to error sinks.
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.cache.notifier().report(err);
            self.last_error = Some(err.clone());
        }
        result
    }

    /// The most recent failure of any model operation.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Binds `source`, drops every cached row and loads the first batch.
    ///
    /// Returns the number of rows loaded.
    pub fn select<R>(&mut self, source: R) -> Result<usize>
    where
        R: RecordSource + 'static,
    {
        let configured = self.options.require_table().map(|_| ());
        if let Err(err) = configured {
            return self.track(Err(err));
        }
        let schema = source.schema();
        debug!(
            table = %self.options.table,
            columns = schema.len(),
            auto = ?schema.auto_column(),
            "selecting rows"
        );
        self.cache.reset(schema);
        self.source = Some(Box::new(source));
        self.fetch_more()
    }

    /// True while a bound source may still yield rows.
    pub fn can_fetch_more(&self) -> bool {
        self.source.is_some() && !self.cache.is_exhausted()
    }

    /// Appends up to one batch of rows from the bound source.
    pub fn fetch_more(&mut self) -> Result<usize> {
        let batch = self.options.fetch_batch_size;
        let result = match self.source.as_deref_mut() {
            None => Err(Error::not_configured("no record source bound")),
            Some(_) if self.cache.is_exhausted() => Ok(0),
            Some(source) => self.cache.load_more(source, batch),
        };
        self.track(result)
    }

    pub fn fetch_batch_size(&self) -> usize {
        self.options.fetch_batch_size
    }

    /// Sets the fetch batch size; zero is ignored.
    pub fn set_fetch_batch_size(&mut self, size: usize) {
        if size > 0 {
            self.options.fetch_batch_size = size;
        }
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.cache.len()
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.cache.schema().len()
    }

    /// The name of the field shown in `column`.
    pub fn header(&self, column: usize) -> Option<&str> {
        self.cache.schema().field(column).map(|f| f.name())
    }

    /// The 1-based label of `row`.
    pub fn row_label(&self, row: usize) -> Option<usize> {
        (row < self.cache.len()).then_some(row + 1)
    }

    pub fn data(&self, row: usize, column: usize) -> Option<&Value> {
        self.cache.value(row, column)
    }

    /// Stages an edit; returns false when `value` equals the current value.
    pub fn set_data(&mut self, row: usize, column: usize, value: impl Into<Value>) -> Result<bool> {
        let result = self.cache.set_value(row, column, value.into());
        self.track(result)
    }

    pub fn insert_rows(&mut self, at: usize, count: usize) -> Result<()> {
        let result = self.cache.stage_insert(at, count);
        self.track(result)
    }

    pub fn remove_rows(&mut self, at: usize, count: usize) -> Result<RemoveOutcome> {
        let result = self.cache.stage_remove(at, count);
        self.track(result)
    }

    pub fn sort(&mut self, column: usize, order: SortOrder) -> Result<()> {
        let result = self.cache.sort(column, order);
        self.track(result)
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }

    pub fn is_dirty_at(&self, row: usize, column: usize) -> bool {
        self.cache.is_dirty_at(row, column)
    }

    /// Writes every staged change to `store` in one transaction.
    pub fn submit_all<S>(&mut self, store: &mut S) -> Result<SubmitSummary>
    where
        S: RecordStore + ?Sized,
    {
        let result = match self.options.require_table() {
            Ok(table) => {
                let mut coordinator = TransactionCoordinator::new(store, table);
                if let Some(hook) = self.hook.as_deref_mut() {
                    coordinator = coordinator.with_hook(hook);
                }
                coordinator.submit_all(&mut self.cache)
            }
            Err(err) => Err(err),
        };
        self.track(result)
    }

    /// Discards every staged change; returns true if anything changed.
    pub fn revert_all(&mut self) -> bool {
        revert_all(&mut self.cache)
    }

    /// Reconciles `row` with a fresh read; `None` means it no longer exists.
    pub fn refresh_row(&mut self, row: usize, values: Option<Vec<Value>>) -> Result<()> {
        let result = self.cache.refresh_row(row, values.map(Record::new));
        self.track(result)
    }

    /// Installs callbacks run before each row operation is submitted.
    pub fn set_hook<H>(&mut self, hook: H)
    where
        H: SubmitHook + 'static,
    {
        self.hook = Some(Box::new(hook));
    }

    pub fn clear_hook(&mut self) {
        self.hook = None;
    }

    /// Drops the bound source, every cached row and the field layout.
    ///
    /// Subscriptions, options and the last error are kept.
    pub fn clear(&mut self) {
        self.source = None;
        self.cache.reset(unbound_schema(&self.options.table));
    }

    /// Clears the model and binds it to another backing table.
    pub fn set_table(&mut self, table: impl Into<String>) {
        self.options.table = table.into();
        self.clear();
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&ModelEvent) + 'static,
    {
        self.cache.notifier_mut().subscribe(callback)
    }

    pub fn subscribe_errors<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&Error) + 'static,
    {
        self.cache.notifier_mut().subscribe_errors(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.cache.notifier_mut().unsubscribe(id)
    }
}
