//! Cell values.
//!
//! `Value` is what a cached row stores per field, what a record source yields
//! and what a record store receives on write-back.

use crate::types::DataType;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

/// A value held in one cell of a cached row.
#[derive(Clone, Debug)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// DateTime stored as Unix timestamp in milliseconds
    DateTime(i64),
    /// Binary data
    Bytes(Vec<u8>),
}

/// Numeric view used for cross-type comparisons.
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Value {
    /// Returns the data type of this value, or None if it's Null.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::String(_) => Some(DataType::String),
            Value::DateTime(_) => Some(DataType::DateTime),
            Value::Bytes(_) => Some(DataType::Bytes),
        }
    }

    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an i64 if it is any integer type.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Creates the template value a freshly staged row starts with.
    pub fn template_for(dt: DataType, nullable: bool) -> Self {
        if nullable {
            return Value::Null;
        }
        match dt {
            DataType::Boolean => Value::Boolean(false),
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::Float64 => Value::Float64(0.0),
            DataType::String => Value::String(String::new()),
            DataType::DateTime => Value::DateTime(0),
            DataType::Bytes => Value::Bytes(Vec::new()),
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            Value::Int32(v) => Some(Numeric::Int(i64::from(*v))),
            Value::Int64(v) => Some(Numeric::Int(*v)),
            Value::Float64(v) => Some(Numeric::Float(*v)),
            _ => None,
        }
    }

    /// Orders numbers of equal magnitude but different types.
    fn width(&self) -> u8 {
        match self {
            Value::Int32(_) => 0,
            Value::Int64(_) => 1,
            _ => 2,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int32(_) | Value::Int64(_) | Value::Float64(_) => 2,
            Value::String(_) => 3,
            Value::DateTime(_) => 4,
            Value::Bytes(_) => 5,
        }
    }
}

/// NaN sorts after every other float.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn cmp_numeric(a: Numeric, b: Numeric) -> Ordering {
    match (a, b) {
        (Numeric::Int(a), Numeric::Int(b)) => a.cmp(&b),
        (Numeric::Int(a), Numeric::Float(b)) => cmp_f64(a as f64, b),
        (Numeric::Float(a), Numeric::Int(b)) => cmp_f64(a, b as f64),
        (Numeric::Float(a), Numeric::Float(b)) => cmp_f64(a, b),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Int32(i) => i.hash(state),
            Value::Int64(i) => i.hash(state),
            Value::Float64(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::DateTime(d) => d.hash(state),
            Value::Bytes(b) => b.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    /// Total order: Null first, numbers compare across integer and float
    /// widths, otherwise values of different types order by type rank.
    /// Numbers equal in magnitude order by width so that `cmp` agrees
    /// with `eq`.
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return cmp_numeric(a, b).then_with(|| self.width().cmp(&other.width()));
        }
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "'{}'", v),
            Value::DateTime(v) => write!(f, "@{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_null() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Null.data_type(), None);
        assert_eq!(Value::Int64(1).data_type(), Some(DataType::Int64));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Int32(42).as_i64(), Some(42));
        assert_eq!(Value::Int64(100).as_i64(), Some(100));
        assert_eq!(Value::Float64(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(Value::Bytes(vec![1, 2]).as_bytes(), Some(&[1u8, 2][..]));
        assert_eq!(Value::String("1".into()).as_i64(), None);
    }

    #[test]
    fn test_value_equality_is_type_strict() {
        assert_eq!(Value::Int32(42), Value::Int32(42));
        assert_ne!(Value::Int32(42), Value::Int64(42));
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::Int32(1) < Value::Int64(2));
        assert!(Value::Int64(3) > Value::Float64(2.5));
        assert!(Value::Float64(f64::NAN) > Value::Float64(1e300));
        assert!(Value::String("a".into()) < Value::String("b".into()));
        assert!(Value::Null < Value::Boolean(false));
        assert!(Value::Int64(i64::MAX) < Value::String(String::new()));
    }

    #[test]
    fn test_ordering_agrees_with_equality() {
        let values = [
            Value::Int32(1),
            Value::Int64(1),
            Value::Float64(1.0),
            Value::Float64(f64::NAN),
            Value::Int64(0),
        ];
        for a in &values {
            for b in &values {
                assert_eq!(a.cmp(b) == Ordering::Equal, a == b, "{:?} vs {:?}", a, b);
            }
        }
        assert!(Value::Int32(1) < Value::Int64(1));
        assert!(Value::Int64(1) < Value::Float64(1.0));
        assert!(Value::Int64(1) < Value::Int32(2));
    }

    #[test]
    fn test_template_values() {
        assert_eq!(Value::template_for(DataType::Int64, false), Value::Int64(0));
        assert_eq!(Value::template_for(DataType::String, false), Value::String(String::new()));
        assert!(Value::template_for(DataType::Int64, true).is_null());
    }

    #[test]
    fn test_value_from_impls() {
        let v: Value = "hello".into();
        assert_eq!(v.as_str(), Some("hello"));

        let v: Value = Some(100i64).into();
        assert_eq!(v.as_i64(), Some(100));

        let v: Value = None::<i32>.into();
        assert!(v.is_null());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::String("x".into()).to_string(), "'x'");
        assert_eq!(Value::Bytes(vec![0; 3]).to_string(), "<3 bytes>");
    }
}
