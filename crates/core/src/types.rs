//! Data type definitions for cached fields.

use core::fmt;

/// The declared type of a field.
///
/// The cache never coerces values between types; the type is carried so that
/// fresh rows can be seeded with sensible template values and so that stores
/// can validate what they are given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point number
    Float64,
    /// UTF-8 string
    String,
    /// Date and time stored as Unix timestamp (milliseconds)
    DateTime,
    /// Binary data
    Bytes,
}

impl DataType {
    /// Returns true for the integer types that a store may auto-assign.
    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64)
    }

    /// Returns the lowercase name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::String => "string",
            DataType::DateTime => "datetime",
            DataType::Bytes => "bytes",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_types() {
        assert!(DataType::Int32.is_integer());
        assert!(DataType::Int64.is_integer());
        assert!(!DataType::Float64.is_integer());
        assert!(!DataType::String.is_integer());
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::DateTime.to_string(), "datetime");
        assert_eq!(DataType::Bytes.to_string(), "bytes");
    }
}
