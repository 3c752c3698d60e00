//! Table model configuration.

use rowstage_core::{Error, Result};
use serde::Deserialize;

/// Rows pulled from the source per fetch unless configured otherwise.
pub const DEFAULT_FETCH_BATCH_SIZE: usize = 100;

fn default_fetch_batch_size() -> usize {
    DEFAULT_FETCH_BATCH_SIZE
}

/// Settings for a `TableModel`.
///
/// Deserializable so hosts can embed it in their own configuration:
///
/// ```rust
/// use rowstage_model::ModelOptions;
///
/// let options: ModelOptions = serde_json::from_str(r#"{ "table": "people" }"#).unwrap();
/// assert_eq!(options.fetch_batch_size, 100);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ModelOptions {
    /// Backing table that staged edits are written to.
    #[serde(default)]
    pub table: String,
    /// Maximum number of rows appended per fetch.
    #[serde(default = "default_fetch_batch_size")]
    pub fetch_batch_size: usize,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            table: String::new(),
            fetch_batch_size: DEFAULT_FETCH_BATCH_SIZE,
        }
    }
}

impl ModelOptions {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn fetch_batch_size(mut self, size: usize) -> Self {
        self.fetch_batch_size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_batch_size == 0 {
            return Err(Error::invalid_argument("fetch batch size must be positive"));
        }
        Ok(())
    }

    /// Fails with `NotConfigured` until a table name is set.
    pub fn require_table(&self) -> Result<&str> {
        if self.table.is_empty() {
            return Err(Error::not_configured("no table name given"));
        }
        Ok(&self.table)
    }
}
