//! Error types for the row cache and its store collaborators.

use crate::record::RowOp;
use thiserror::Error;

/// Result type alias for cache operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for record store and record source calls.
pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Classification of a failure reported by a record store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// The connection to the store is unusable.
    Connection,
    /// A constraint (uniqueness, not-null, ...) rejected the write.
    Constraint,
    /// The statement could not be prepared or executed.
    Statement,
    /// Begin, commit or rollback failed, or was issued out of order.
    Transaction,
    /// The addressed row does not exist.
    NotFound,
}

/// A failure reported by a record store or record source.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind:?} error: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Connection, message)
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Constraint, message)
    }

    pub fn statement(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Statement, message)
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Transaction, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message)
    }
}

/// Error types for cache operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Bad row or column index, empty range or non-positive batch size.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
    /// No table or identity has been bound.
    #[error("Not configured: {message}")]
    NotConfigured { message: String },
    /// The record store rejected an operation.
    #[error("Store error on table {table}{}: {source}", describe_row(.row, .op))]
    Store {
        table: String,
        row: Option<usize>,
        op: Option<RowOp>,
        #[source]
        source: StoreError,
    },
    /// The operation does not apply to the row's current state.
    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },
}

fn describe_row(row: &Option<usize>, op: &Option<RowOp>) -> String {
    match (row, op) {
        (Some(row), Some(op)) => format!(" ({} of row {})", op, row),
        (Some(row), None) => format!(" (row {})", row),
        (None, Some(op)) => format!(" ({})", op),
        (None, None) => String::new(),
    }
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Error::NotConfigured {
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::Unsupported {
            message: message.into(),
        }
    }

    /// Wraps a store failure that is not tied to a particular row.
    pub fn store(table: impl Into<String>, source: StoreError) -> Self {
        Error::Store {
            table: table.into(),
            row: None,
            op: None,
            source,
        }
    }

    /// Wraps a store failure raised while applying one row's operation.
    pub fn store_row(table: impl Into<String>, row: usize, op: RowOp, source: StoreError) -> Self {
        Error::Store {
            table: table.into(),
            row: Some(row),
            op: Some(op),
            source,
        }
    }

    /// Returns the wrapped store failure, if this is a store error.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Error::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_argument("row 9 out of range");
        assert!(err.to_string().contains("row 9 out of range"));

        let err = Error::not_configured("no table name");
        assert!(err.to_string().starts_with("Not configured"));
    }

    #[test]
    fn test_store_error_context() {
        let err = Error::store_row(
            "people",
            3,
            RowOp::Update,
            StoreError::constraint("duplicate key"),
        );
        let text = err.to_string();
        assert!(text.contains("people"));
        assert!(text.contains("update of row 3"));
        assert!(text.contains("duplicate key"));
        assert_eq!(
            err.store_error().map(|e| e.kind),
            Some(StoreErrorKind::Constraint)
        );

        let bare = Error::store("people", StoreError::connection("gone"));
        assert_eq!(bare.to_string(), "Store error on table people: Connection error: gone");
    }

    #[test]
    fn test_non_store_errors_have_no_source() {
        assert!(Error::unsupported("edit of deleted row").store_error().is_none());
    }
}
