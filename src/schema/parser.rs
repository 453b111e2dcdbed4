//! JSON parser for CSV schema declarations.
//!
//! Accepts either a bare array of fields or an object with a `fields` array:
//!
//! ```json
//! [{"name": "id", "type": "int64"}, {"name": "name", "type": "string"}]
//! {"fields": [{"name": "id", "type": "int64"}]}
//! ```

use serde_json::Value;

use crate::error::ConfigError;
use crate::schema::{CsvSchema, Field, FieldType};

/// Parse a schema declaration from a JSON string.
///
/// # Example
/// ```
/// use csvliner::schema::{parse_schema, FieldType};
///
/// let schema = parse_schema(r#"[{"name": "id", "type": "long"}]"#).unwrap();
/// assert_eq!(schema.fields()[0].field_type, FieldType::Int64);
/// ```
pub fn parse_schema(json: &str) -> Result<CsvSchema, ConfigError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ConfigError::InvalidSchema(format!("Invalid JSON: {}", e)))?;
    parse_schema_value(&value)
}

/// Parse a schema declaration from an already-decoded JSON value.
pub fn parse_schema_value(value: &Value) -> Result<CsvSchema, ConfigError> {
    let fields = match value {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("fields") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ConfigError::InvalidSchema(
                    "'fields' must be an array".to_string(),
                ))
            }
            None => {
                return Err(ConfigError::InvalidSchema(
                    "Schema object is missing 'fields'".to_string(),
                ))
            }
        },
        other => {
            return Err(ConfigError::InvalidSchema(format!(
                "Expected an array or object, found {}",
                other
            )))
        }
    };

    let fields = fields
        .iter()
        .enumerate()
        .map(|(i, f)| parse_field(i, f))
        .collect::<Result<Vec<_>, _>>()?;

    CsvSchema::from_fields(fields)
}

fn parse_field(position: usize, value: &Value) -> Result<Field, ConfigError> {
    let obj = value.as_object().ok_or_else(|| {
        ConfigError::InvalidSchema(format!("Field {} must be an object", position))
    })?;

    let name = obj.get("name").and_then(Value::as_str).ok_or_else(|| {
        ConfigError::InvalidSchema(format!("Field {} is missing a string 'name'", position))
    })?;

    let type_name = obj.get("type").and_then(Value::as_str).ok_or_else(|| {
        ConfigError::InvalidSchema(format!("Field '{}' is missing a string 'type'", name))
    })?;

    Ok(Field::new(name, type_name.parse::<FieldType>()?))
}

impl CsvSchema {
    /// Parse a schema declaration from JSON. See [`parse_schema`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        parse_schema(json)
    }
}
