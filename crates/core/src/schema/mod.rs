//! Schema module.
//!
//! A `Schema` describes the positional fields shared by every row of one
//! cached table: names, types, which fields carry row identity and which one
//! (if any) the store assigns on insert.

mod field;

pub use field::Field;

use crate::error::{Error, Result};
use crate::record::Record;
use crate::types::DataType;

/// The field layout of one cached table.
#[derive(Clone, Debug)]
pub struct Schema {
    table: String,
    fields: Vec<Field>,
}

impl Schema {
    /// Creates a schema from already-built fields.
    pub fn new(table: impl Into<String>, fields: Vec<Field>) -> Self {
        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(i, f)| f.with_index(i))
            .collect();
        Self {
            table: table.into(),
            fields,
        }
    }

    /// Returns the backing table name.
    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Returns the first store-assigned field, if any.
    pub fn auto_column(&self) -> Option<usize> {
        self.fields.iter().position(Field::is_auto_value)
    }

    /// Returns the positions of the identity fields.
    ///
    /// A table without declared key fields is identified by every field.
    pub fn key_columns(&self) -> Vec<usize> {
        let keys: Vec<usize> = self
            .fields
            .iter()
            .filter(|f| f.is_key())
            .map(Field::index)
            .collect();
        if keys.is_empty() {
            (0..self.fields.len()).collect()
        } else {
            keys
        }
    }

    /// Builds the record a freshly staged row starts with.
    pub fn template(&self) -> Record {
        Record::new(self.fields.iter().map(Field::template_value).collect())
    }

    /// Checks that a record has exactly one value per field.
    pub fn check_width(&self, record: &Record) -> Result<()> {
        if record.len() != self.fields.len() {
            return Err(Error::invalid_argument(format!(
                "record for table {} has {} values, expected {}",
                self.table,
                record.len(),
                self.fields.len()
            )));
        }
        Ok(())
    }
}

/// Builder for schemas.
pub struct SchemaBuilder {
    table: String,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn new(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        check_naming_rules(&table)?;
        Ok(Self {
            table,
            fields: Vec::new(),
        })
    }

    /// Adds a plain field.
    pub fn add_field(self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        self.push(Field::new(name, data_type))
    }

    /// Adds a field with its flags already set.
    pub fn push(mut self, field: Field) -> Result<Self> {
        check_naming_rules(field.name())?;
        if self.fields.iter().any(|f| f.name() == field.name()) {
            return Err(Error::invalid_argument(format!(
                "field already exists: {}",
                field.name()
            )));
        }
        self.fields.push(field);
        Ok(self)
    }

    /// Marks the named fields nullable.
    pub fn add_nullable(mut self, names: &[&str]) -> Self {
        for name in names {
            if let Some(field) = self.fields.iter_mut().find(|f| f.name() == *name) {
                *field = field.clone().nullable(true);
            }
        }
        self
    }

    /// Declares the identity fields. With `auto_value` set, a single integer
    /// key is assigned by the store on insert.
    pub fn add_primary_key(mut self, names: &[&str], auto_value: bool) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::invalid_argument("primary key needs at least one field"));
        }
        if auto_value && names.len() != 1 {
            return Err(Error::invalid_argument(
                "auto-value keys must consist of a single field",
            ));
        }
        for name in names {
            let field = self
                .fields
                .iter_mut()
                .find(|f| f.name() == *name)
                .ok_or_else(|| Error::invalid_argument(format!("field not found: {}", name)))?;
            if auto_value && !field.data_type().is_integer() {
                return Err(Error::invalid_argument(format!(
                    "auto-value key {} requires an integer type",
                    name
                )));
            }
            *field = field.clone().key(true).auto_value(auto_value);
        }
        Ok(self)
    }

    pub fn build(self) -> Result<Schema> {
        if self.fields.is_empty() {
            return Err(Error::invalid_argument(format!(
                "table {} has no fields",
                self.table
            )));
        }
        Ok(Schema::new(self.table, self.fields))
    }
}

fn check_naming_rules(name: &str) -> Result<()> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(Error::invalid_argument("name cannot be empty")),
        Some(first) if !first.is_ascii_alphabetic() && first != '_' => {
            return Err(Error::invalid_argument(format!(
                "name must start with letter or underscore: {}",
                name
            )))
        }
        _ => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::invalid_argument(format!(
            "name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn people() -> Schema {
        SchemaBuilder::new("people")
            .unwrap()
            .add_field("id", DataType::Int64)
            .unwrap()
            .add_field("name", DataType::String)
            .unwrap()
            .add_field("email", DataType::String)
            .unwrap()
            .add_nullable(&["email"])
            .add_primary_key(&["id"], true)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_builder() {
        let schema = people();
        assert_eq!(schema.table(), "people");
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.index_of("name"), Some(1));
        assert_eq!(schema.field(2).map(Field::index), Some(2));
        assert_eq!(schema.auto_column(), Some(0));
        assert_eq!(schema.key_columns(), vec![0]);
    }

    #[test]
    fn test_keyless_schema_uses_every_field() {
        let schema = SchemaBuilder::new("log")
            .unwrap()
            .add_field("at", DataType::DateTime)
            .unwrap()
            .add_field("line", DataType::String)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(schema.key_columns(), vec![0, 1]);
        assert_eq!(schema.auto_column(), None);
    }

    #[test]
    fn test_template() {
        let template = people().template();
        assert_eq!(
            template.values(),
            &[Value::Null, Value::String(String::new()), Value::Null]
        );
    }

    #[test]
    fn test_naming_rules() {
        assert!(SchemaBuilder::new("").is_err());
        assert!(SchemaBuilder::new("1abc").is_err());
        assert!(SchemaBuilder::new("a-b").is_err());
        assert!(SchemaBuilder::new("_ok1").is_ok());
    }

    #[test]
    fn test_builder_rejections() {
        let dup = SchemaBuilder::new("t")
            .unwrap()
            .add_field("a", DataType::Int32)
            .unwrap()
            .add_field("a", DataType::Int32);
        assert!(dup.is_err());

        let text_auto = SchemaBuilder::new("t")
            .unwrap()
            .add_field("a", DataType::String)
            .unwrap()
            .add_primary_key(&["a"], true);
        assert!(text_auto.is_err());

        let missing = SchemaBuilder::new("t")
            .unwrap()
            .add_field("a", DataType::Int32)
            .unwrap()
            .add_primary_key(&["b"], false);
        assert!(missing.is_err());

        assert!(SchemaBuilder::new("t").unwrap().build().is_err());
    }

    #[test]
    fn test_check_width() {
        let schema = people();
        assert!(schema.check_width(&schema.template()).is_ok());
        assert!(schema.check_width(&Record::new(vec![Value::Null])).is_err());
    }
}
