//! Field definitions.

use crate::types::DataType;
use crate::value::Value;

/// One positional field of a cached table.
///
/// `key` fields form the row's identity in the backing store. An
/// `auto_value` field is assigned by the store (for example an
/// auto-increment id) and is never written back as a consumer edit.
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    data_type: DataType,
    nullable: bool,
    key: bool,
    auto_value: bool,
    default_value: Option<Value>,
    index: usize,
}

impl Field {
    /// Creates a new, non-key field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            key: false,
            auto_value: false,
            default_value: None,
            index: 0,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Marks this field as part of the row identity.
    pub fn key(mut self, key: bool) -> Self {
        self.key = key;
        self
    }

    /// Marks this field as assigned by the store.
    pub fn auto_value(mut self, auto_value: bool) -> Self {
        self.auto_value = auto_value;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline]
    pub fn is_key(&self) -> bool {
        self.key
    }

    #[inline]
    pub fn is_auto_value(&self) -> bool {
        self.auto_value
    }

    /// Position of this field within its schema.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The value a freshly staged row holds in this field.
    ///
    /// Auto-value fields start out null so the store's assignment is the
    /// only value they ever carry.
    pub fn template_value(&self) -> Value {
        if self.auto_value {
            return Value::Null;
        }
        self.default_value
            .clone()
            .unwrap_or_else(|| Value::template_for(self.data_type, self.nullable))
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.data_type == other.data_type
    }
}
