//! CSV schema types and representations.
//!
//! A schema is an ordered list of named, typed fields. Every CSV record read
//! through a source must have exactly one token per schema field.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::ConfigError;

/// Declared type of a CSV column.
///
/// Closed set of scalar types. Each variant has exactly one textual grammar,
/// applied by the coercion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// UTF-8 text, taken verbatim.
    String,
    /// `true` / `false`, case-insensitive.
    Boolean,
    /// 8-bit signed integer.
    Int8,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 8-bit unsigned integer.
    UInt8,
    /// 16-bit unsigned integer.
    UInt16,
    /// 32-bit unsigned integer.
    UInt32,
    /// 64-bit unsigned integer.
    UInt64,
    /// 32-bit IEEE 754 floating-point.
    Float32,
    /// 64-bit IEEE 754 floating-point.
    Float64,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Time of day, `HH:MM:SS` with optional fraction.
    Time,
    /// Local date-time, `YYYY-MM-DDTHH:MM:SS` with optional fraction.
    Timestamp,
    /// Date-time with UTC offset (RFC 3339).
    TimestampTz,
}

impl FieldType {
    /// All variants, in declaration order.
    pub const ALL: [FieldType; 16] = [
        FieldType::String,
        FieldType::Boolean,
        FieldType::Int8,
        FieldType::Int16,
        FieldType::Int32,
        FieldType::Int64,
        FieldType::UInt8,
        FieldType::UInt16,
        FieldType::UInt32,
        FieldType::UInt64,
        FieldType::Float32,
        FieldType::Float64,
        FieldType::Date,
        FieldType::Time,
        FieldType::Timestamp,
        FieldType::TimestampTz,
    ];

    /// Canonical lowercase name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Int8 => "int8",
            FieldType::Int16 => "int16",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::UInt8 => "uint8",
            FieldType::UInt16 => "uint16",
            FieldType::UInt32 => "uint32",
            FieldType::UInt64 => "uint64",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Timestamp => "timestamp",
            FieldType::TimestampTz => "timestamptz",
        }
    }

    /// Whether values of this type are numbers.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, FieldType::Float32 | FieldType::Float64)
    }

    /// Whether values of this type are integers.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldType::Int8
                | FieldType::Int16
                | FieldType::Int32
                | FieldType::Int64
                | FieldType::UInt8
                | FieldType::UInt16
                | FieldType::UInt32
                | FieldType::UInt64
        )
    }

    /// Whether values of this type are dates or times.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            FieldType::Date | FieldType::Time | FieldType::Timestamp | FieldType::TimestampTz
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = ConfigError;

    /// Parse a type name. Accepts canonical names and common aliases,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "utf8" | "text" | "varchar" => FieldType::String,
            "boolean" | "bool" => FieldType::Boolean,
            "int8" | "tinyint" | "byte" => FieldType::Int8,
            "int16" | "smallint" | "short" => FieldType::Int16,
            "int32" | "int" | "integer" => FieldType::Int32,
            "int64" | "long" | "bigint" => FieldType::Int64,
            "uint8" => FieldType::UInt8,
            "uint16" => FieldType::UInt16,
            "uint32" => FieldType::UInt32,
            "uint64" => FieldType::UInt64,
            "float32" | "float" | "real" => FieldType::Float32,
            "float64" | "double" => FieldType::Float64,
            "date" => FieldType::Date,
            "time" => FieldType::Time,
            "timestamp" | "datetime" => FieldType::Timestamp,
            "timestamptz" | "timestamp_tz" | "timestamp with time zone" => FieldType::TimestampTz,
            _ => return Err(ConfigError::UnknownType(s.to_string())),
        };
        Ok(ty)
    }
}

/// A single named column of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Column name.
    pub name: Arc<str>,
    /// Declared type.
    pub field_type: FieldType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<Arc<str>>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// Serialize the field to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        json!({ "name": self.name.as_ref(), "type": self.field_type.name() })
    }
}

/// Ordered, immutable set of typed fields.
///
/// Invariants checked at construction: at least one field, one type per
/// name, and unique names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSchema {
    fields: Arc<[Field]>,
}

impl CsvSchema {
    /// Create a schema from parallel name and type lists.
    ///
    /// # Errors
    /// - `ConfigError::SchemaLengthMismatch` if the lists differ in length
    /// - `ConfigError::EmptySchema` if no fields are given
    /// - `ConfigError::DuplicateField` if a name repeats
    pub fn new<N, S>(names: N, types: Vec<FieldType>) -> Result<Self, ConfigError>
    where
        N: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let names: Vec<Arc<str>> = names.into_iter().map(Into::into).collect();
        if names.len() != types.len() {
            return Err(ConfigError::SchemaLengthMismatch {
                names: names.len(),
                types: types.len(),
            });
        }
        Self::from_fields(
            names
                .into_iter()
                .zip(types)
                .map(|(name, ty)| Field::new(name, ty))
                .collect(),
        )
    }

    /// Create a schema from a list of fields.
    pub fn from_fields(fields: Vec<Field>) -> Result<Self, ConfigError> {
        if fields.is_empty() {
            return Err(ConfigError::EmptySchema);
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.clone()) {
                return Err(ConfigError::DuplicateField(field.name.to_string()));
            }
        }

        Ok(Self {
            fields: fields.into(),
        })
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false; construction rejects empty schemas.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field at `index`, if any.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Position of the field named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name.as_ref() == name)
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_ref())
    }

    /// Field types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = FieldType> + '_ {
        self.fields.iter().map(|f| f.field_type)
    }

    /// Schema of the given columns, in the given order.
    ///
    /// Callers pass unique, in-range indices (a validated projection).
    pub(crate) fn select(&self, indices: &[usize]) -> Self {
        Self {
            fields: indices.iter().map(|&i| self.fields[i].clone()).collect(),
        }
    }

    /// Serialize the schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        Value::Array(self.fields.iter().map(Field::to_json_value).collect())
    }

    /// Serialize the schema to a JSON string.
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }
}
