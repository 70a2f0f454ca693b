//! Record shapes and the typed boundary between text cells and values.

pub mod codec;
pub mod fields;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Text,
    Integer,
    Real,
    Boolean,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::Text => "text",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Real => "real",
            PrimitiveType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

impl PrimitiveType {
    /// Parses a single (non-list) cell. Empty cells of non-text fields are
    /// missing values; empty text stays an empty string.
    pub fn parse(self, field: &str, raw: &str) -> Result<Value, PipelineError> {
        if raw.is_empty() {
            return Ok(match self {
                PrimitiveType::Text => Value::Text(String::new()),
                _ => Value::Null,
            });
        }

        let invalid = || PipelineError::InvalidValue {
            field: field.to_string(),
            expected: self,
            value: raw.to_string(),
        };

        match self {
            PrimitiveType::Text => Ok(Value::Text(raw.to_string())),
            PrimitiveType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| invalid()),
            PrimitiveType::Real => raw
                .trim()
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|_| invalid()),
            PrimitiveType::Boolean => match raw.trim() {
                "true" | "True" | "TRUE" | "1" => Ok(Value::Boolean(true)),
                "false" | "False" | "FALSE" | "0" => Ok(Value::Boolean(false)),
                _ => Err(invalid()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub primitive: PrimitiveType,
    /// Logically a list of text values stored in one cell.
    pub multi_valued: bool,
}

impl FieldDescriptor {
    pub const fn text(name: &'static str) -> Self {
        Self::new(name, PrimitiveType::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, PrimitiveType::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Self::new(name, PrimitiveType::Real)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, PrimitiveType::Boolean)
    }

    const fn new(name: &'static str, primitive: PrimitiveType) -> Self {
        Self {
            name,
            primitive,
            multi_valued: false,
        }
    }

    pub const fn multi(self) -> Self {
        Self {
            multi_valued: true,
            ..self
        }
    }

    /// The same field once its list has been expanded to one value per row.
    pub const fn flattened(self) -> Self {
        Self {
            multi_valued: false,
            ..self
        }
    }

    pub fn decode(&self, raw: &str) -> Result<Value, PipelineError> {
        if self.multi_valued {
            Ok(Value::List(codec::decode(raw)))
        } else {
            self.primitive.parse(self.name, raw)
        }
    }
}

/// A named, ordered list of fields plus the subset identifying an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    key: Vec<&'static str>,
}

impl Schema {
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor>, key: Vec<&'static str>) -> Self {
        Self { name, fields, key }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn key(&self) -> &[&'static str] {
        &self.key
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.to_string()).collect()
    }

    pub fn multi_valued_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.multi_valued)
    }

    /// Fails unless `columns` equals the declared field order exactly.
    pub fn validate_columns(&self, columns: &[String]) -> Result<(), PipelineError> {
        let matches = columns.len() == self.fields.len()
            && columns
                .iter()
                .zip(&self.fields)
                .all(|(column, field)| column == field.name);
        if matches {
            Ok(())
        } else {
            Err(PipelineError::SchemaMismatch {
                table: self.name.to_string(),
                expected: self.field_names(),
                actual: columns.to_vec(),
            })
        }
    }

    pub fn validate(&self, table: &Table) -> Result<(), PipelineError> {
        self.validate_columns(table.columns())
    }

    /// Builds a typed table from a header row and text cells.
    pub fn decode_table(
        &self,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<Table, PipelineError> {
        self.validate_columns(&headers)?;

        let mut table = Table::for_schema(self);
        for cells in rows {
            let mut record = Record::new();
            for (index, field) in self.fields.iter().enumerate() {
                let raw = cells.get(index).map(String::as_str).unwrap_or_default();
                record.insert(field.name.to_string(), field.decode(raw)?);
            }
            table.push(record);
        }
        Ok(table)
    }

    /// Renders one record as text cells in declared field order.
    pub fn encode_record(&self, record: &Record) -> Result<Vec<String>, PipelineError> {
        self.fields
            .iter()
            .map(|field| match record.get(field.name) {
                Some(value) => value.to_cell(field.name),
                None => Ok(String::new()),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    List(Vec<String>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form of the value as stored in `field`'s cell.
    pub fn to_cell(&self, field: &str) -> Result<String, PipelineError> {
        Ok(match self {
            Value::Null => String::new(),
            Value::Text(text) => text.clone(),
            Value::Integer(value) => value.to_string(),
            Value::Real(value) => value.to_string(),
            Value::Boolean(value) => value.to_string(),
            Value::List(values) => codec::encode(field, values)?,
        })
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Self {
        Value::List(values)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One flat row, field name to value.
pub type Record = BTreeMap<String, Value>;

/// An in-memory snapshot: ordered column names plus rows keyed by column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    pub fn for_schema(schema: &Schema) -> Self {
        Self::new(schema.field_names(), Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    /// Distinct non-empty text values of `column`, in first-seen order.
    /// List cells contribute each of their elements.
    pub fn distinct_text(&self, column: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for row in &self.rows {
            let values: Vec<&str> = match row.get(column) {
                Some(Value::Text(text)) => vec![text.as_str()],
                Some(Value::List(items)) => items.iter().map(String::as_str).collect(),
                _ => Vec::new(),
            };
            for value in values {
                if !value.is_empty() && seen.insert(value.to_string()) {
                    ids.push(value.to_string());
                }
            }
        }
        ids
    }
}
