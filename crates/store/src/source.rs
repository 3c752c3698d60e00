//! Forward-only record sources.

use rowstage_core::schema::Schema;
use rowstage_core::{Record, StoreResult};
use std::collections::VecDeque;
use std::sync::Arc;

/// A one-directional producer of raw rows, such as an executed query's
/// cursor.
///
/// `next` returns `Ok(None)` once the source is exhausted; exhaustion is a
/// normal terminal condition, not an error. Implementations must not be
/// driven concurrently.
pub trait RecordSource {
    /// The layout of every record this source yields.
    fn schema(&self) -> Arc<Schema>;

    /// Advances the cursor by one row.
    fn next(&mut self) -> StoreResult<Option<Record>>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn schema(&self) -> Arc<Schema> {
        (**self).schema()
    }

    fn next(&mut self) -> StoreResult<Option<Record>> {
        (**self).next()
    }
}

/// A `RecordSource` over an owned list of records.
pub struct VecSource {
    schema: Arc<Schema>,
    rows: VecDeque<Record>,
    yielded: usize,
}

impl VecSource {
    pub fn new(schema: Arc<Schema>, rows: Vec<Record>) -> Self {
        Self {
            schema,
            rows: rows.into(),
            yielded: 0,
        }
    }

    /// Number of rows not yet pulled.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Number of rows pulled so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }
}

impl RecordSource for VecSource {
    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn next(&mut self) -> StoreResult<Option<Record>> {
        let row = self.rows.pop_front();
        if row.is_some() {
            self.yielded += 1;
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowstage_core::schema::SchemaBuilder;
    use rowstage_core::{DataType, Value};

    fn schema() -> Arc<Schema> {
        Arc::new(
            SchemaBuilder::new("t")
                .unwrap()
                .add_field("id", DataType::Int64)
                .unwrap()
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_vec_source_drains_in_order() {
        let rows = (1..=3).map(|i| Record::new(vec![Value::Int64(i)])).collect();
        let mut source = VecSource::new(schema(), rows);

        assert_eq!(source.remaining(), 3);
        assert_eq!(source.next().unwrap().unwrap().get(0), Some(&Value::Int64(1)));
        assert_eq!(source.next().unwrap().unwrap().get(0), Some(&Value::Int64(2)));
        assert_eq!(source.yielded(), 2);
        assert!(source.next().unwrap().is_some());
        assert!(source.next().unwrap().is_none());
        assert!(source.next().unwrap().is_none());
        assert_eq!(source.yielded(), 3);
    }

    #[test]
    fn test_boxed_source() {
        let mut source: Box<dyn RecordSource> = Box::new(VecSource::new(schema(), Vec::new()));
        assert_eq!(source.schema().table(), "t");
        assert!(source.next().unwrap().is_none());
    }
}
