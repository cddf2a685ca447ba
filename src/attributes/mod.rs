//! Attribute rows, field schema and validation.
//!
//! The geometry side only needs three things from the attribute table:
//! validate a row against the schema, append a row, and look a row up by
//! record number. [`Schema::validate`], [`AttributeSink`] and
//! [`AttributeSource`] are those seams; `io::dbf` implements them for dBase
//! files.

use std::fmt;

use encoding_rs::Encoding;
use indexmap::IndexMap;
use thiserror::Error;

use crate::error::{Result, ShapefileError};
use crate::notification::NotificationCollection;

/// Longest field name a dBase III descriptor can hold
pub const MAX_FIELD_NAME_LEN: usize = 10;

/// Semantic type of an attribute field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Real,
    Text,
    Boolean,
}

impl FieldKind {
    /// dBase type character used when writing
    pub fn dbf_type(self) -> u8 {
        match self {
            Self::Integer => b'N',
            Self::Real => b'F',
            Self::Text => b'C',
            Self::Boolean => b'L',
        }
    }

    /// Field width used when a descriptor leaves it at zero
    pub fn default_length(self) -> u8 {
        match self {
            Self::Integer => 10,
            Self::Real => 19,
            Self::Text => 80,
            Self::Boolean => 1,
        }
    }

    /// Decimal count used when a Real descriptor leaves it at zero
    pub fn default_decimal_count(self) -> u8 {
        match self {
            Self::Real => 8,
            _ => 0,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "Integer"),
            Self::Real => write!(f, "Real"),
            Self::Text => write!(f, "Text"),
            Self::Boolean => write!(f, "Boolean"),
        }
    }
}

/// One typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Null,
}

impl AttributeValue {
    /// Kind of the value, `None` for Null
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Self::Integer(_) => Some(FieldKind::Integer),
            Self::Real(_) => Some(FieldKind::Real),
            Self::Text(_) => Some(FieldKind::Text),
            Self::Boolean(_) => Some(FieldKind::Boolean),
            Self::Null => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One attribute row, keyed by field name in insertion order
pub type Attributes = IndexMap<String, AttributeValue>;

/// Row synthesized for records added without attributes
pub fn default_attributes(position: u32) -> Attributes {
    let mut row = Attributes::new();
    row.insert("id".to_string(), AttributeValue::Integer(i64::from(position)));
    row
}

/// A schema problem found in one buffered record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    #[error("record {record}: field \"{field}\" not found in schema")]
    UnknownField { record: u32, field: String },

    #[error("record {record}: field \"{field}\" expects {expected}, found {found}")]
    KindMismatch {
        record: u32,
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    #[error("record {record}: value for field \"{field}\" does not fit in {width} bytes")]
    ValueTooWide { record: u32, field: String, width: usize },

    #[error("record {record}: value for field \"{field}\" has characters {encoding} cannot represent")]
    Unmappable {
        record: u32,
        field: String,
        encoding: &'static str,
    },
}

impl AttributeError {
    /// Record number the error refers to
    pub fn record(&self) -> u32 {
        match self {
            Self::UnknownField { record, .. }
            | Self::KindMismatch { record, .. }
            | Self::ValueTooWide { record, .. }
            | Self::Unmappable { record, .. } => *record,
        }
    }
}

/// Definition of one attribute column
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Width in characters
    pub length: u8,
    /// Digits after the decimal point (Real only)
    pub decimal_count: u8,
}

impl FieldDescriptor {
    /// Field with the kind's default width
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self::with_size(name, kind, 0, 0)
    }

    /// Field with explicit width; zero selects the kind's default
    pub fn with_size(name: impl Into<String>, kind: FieldKind, length: u8, decimal_count: u8) -> Self {
        let length = if length == 0 { kind.default_length() } else { length };
        let decimal_count = match kind {
            FieldKind::Real if decimal_count == 0 => kind.default_decimal_count().min(length.saturating_sub(2)),
            FieldKind::Real => decimal_count,
            _ => 0,
        };
        FieldDescriptor {
            name: name.into(),
            kind,
            length,
            decimal_count,
        }
    }

    /// Render a numeric, boolean or null value the way it is stored, without
    /// padding. Text is returned unchanged.
    pub fn render(&self, value: &AttributeValue) -> String {
        match value {
            AttributeValue::Integer(v) => v.to_string(),
            AttributeValue::Real(v) if v.is_finite() => {
                format!("{:.*}", usize::from(self.decimal_count), v)
            }
            AttributeValue::Real(_) | AttributeValue::Null => match self.kind {
                FieldKind::Boolean => "?".to_string(),
                _ => String::new(),
            },
            AttributeValue::Text(s) => s.clone(),
            AttributeValue::Boolean(b) => (if *b { "T" } else { "F" }).to_string(),
        }
    }
}

/// Ordered list of attribute columns
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Default for Schema {
    fn default() -> Self {
        Schema {
            fields: vec![FieldDescriptor::new("id", FieldKind::Integer)],
        }
    }
}

impl Schema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Schema { fields }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by exact name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Bytes per stored row, including the deletion flag
    pub fn record_length(&self) -> usize {
        1 + self.fields.iter().map(|f| usize::from(f.length)).sum::<usize>()
    }

    /// Check that every field can be stored in a dBase III descriptor.
    pub fn check(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(ShapefileError::AttributeEncoding("schema has no fields".into()));
        }
        for field in &self.fields {
            if field.name.is_empty() || field.name.len() > MAX_FIELD_NAME_LEN || !field.name.is_ascii() {
                return Err(ShapefileError::AttributeEncoding(format!(
                    "field name \"{}\" must be 1-{} ASCII characters",
                    field.name, MAX_FIELD_NAME_LEN
                )));
            }
        }
        if self.record_length() > usize::from(u16::MAX) {
            return Err(ShapefileError::AttributeEncoding("record length exceeds 65535 bytes".into()));
        }
        Ok(())
    }

    /// Validate one row. Problems are returned, never raised, so callers can
    /// collect them across every buffered record.
    ///
    /// Text is measured after encoding with `encoding`, the encoding the
    /// table will be written in.
    pub fn validate(&self, record: u32, attributes: &Attributes, encoding: &'static Encoding) -> Vec<AttributeError> {
        let mut errors = Vec::new();
        for (name, value) in attributes {
            let Some(field) = self.field(name) else {
                errors.push(AttributeError::UnknownField {
                    record,
                    field: name.clone(),
                });
                continue;
            };
            let Some(found) = value.kind() else {
                continue;
            };
            if found != field.kind {
                errors.push(AttributeError::KindMismatch {
                    record,
                    field: name.clone(),
                    expected: field.kind,
                    found,
                });
                continue;
            }
            let width = match value {
                AttributeValue::Text(text) => {
                    let (encoded, _, unmappable) = encoding.encode(text);
                    if unmappable {
                        errors.push(AttributeError::Unmappable {
                            record,
                            field: name.clone(),
                            encoding: encoding.name(),
                        });
                        continue;
                    }
                    encoded.len()
                }
                _ => field.render(value).len(),
            };
            if width > usize::from(field.length) {
                errors.push(AttributeError::ValueTooWide {
                    record,
                    field: name.clone(),
                    width: usize::from(field.length),
                });
            }
        }
        errors
    }
}

/// Destination for attribute rows, one per geometry record in order
pub trait AttributeSink {
    /// Persist one row positionally aligned with the next geometry record
    fn append_row(&mut self, attributes: &Attributes) -> Result<()>;

    /// Finalize the table after the last row
    fn finish(&mut self) -> Result<()>;
}

/// Attribute rows looked up by 1-based record number
pub trait AttributeSource {
    fn row_at(&mut self, record_number: u32) -> Result<Attributes>;

    /// Move any diagnostics gathered while reading rows into `into`
    fn drain_notifications(&mut self, _into: &mut NotificationCollection) {}
}
