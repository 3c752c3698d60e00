//! Record snapshots and the values exchanged with a record store.

use crate::value::Value;
use core::fmt;

/// An owned, positional snapshot of one row's values.
///
/// Cached rows keep two of these: the staged values and the baseline last
/// known to match the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[inline]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Sets a value at the given position, returning false if out of range.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Replaces every value with Null, keeping the width.
    pub fn clear_values(&mut self) {
        self.values.iter_mut().for_each(|v| *v = Value::Null);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// A named value handed to a record store, either as a column to write or
/// as one component of a row's identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// The staged operation of a cached row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RowOp {
    /// Clean: matches the store.
    #[default]
    None,
    /// New row, never stored.
    Insert,
    /// Stored row with pending field edits.
    Update,
    /// Stored row staged for removal.
    Delete,
}

impl RowOp {
    pub fn name(&self) -> &'static str {
        match self {
            RowOp::None => "none",
            RowOp::Insert => "insert",
            RowOp::Update => "update",
            RowOp::Delete => "delete",
        }
    }
}

impl fmt::Display for RowOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_set_and_get() {
        let mut record = Record::new(vec![Value::Int64(1), Value::String("Alice".into())]);
        assert!(record.set(1, "Bob".into()));
        assert_eq!(record.get(1), Some(&Value::String("Bob".into())));
        assert!(!record.set(5, Value::Null));
        assert_eq!(record.get(5), None);
    }

    #[test]
    fn test_clear_values_keeps_width() {
        let mut record = Record::new(vec![Value::Int64(1), Value::Boolean(true)]);
        record.clear_values();
        assert_eq!(record.len(), 2);
        assert!(record.values().iter().all(Value::is_null));
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::new("id", 7i64).to_string(), "id=7");
        assert_eq!(RowOp::Delete.to_string(), "delete");
    }
}
