//! Type mapping from CSV field types to Polars data types.
//!
//! | Field type | Polars type |
//! |------------|-------------|
//! | `string` | `String` |
//! | `boolean` | `Boolean` |
//! | `int8` ... `uint64` | `Int8` ... `UInt64` |
//! | `float32`, `float64` | `Float32`, `Float64` |
//! | `date` | `Date` |
//! | `time` | `Time` |
//! | `timestamp` | `Datetime(us, None)` |
//! | `timestamptz` | `Datetime(us, UTC)` |

use polars::prelude::*;

use crate::schema::{CsvSchema, Field as CsvField, FieldType};

/// Polars data type for a declared field type.
pub fn field_type_to_dtype(field_type: FieldType) -> DataType {
    match field_type {
        FieldType::String => DataType::String,
        FieldType::Boolean => DataType::Boolean,
        FieldType::Int8 => DataType::Int8,
        FieldType::Int16 => DataType::Int16,
        FieldType::Int32 => DataType::Int32,
        FieldType::Int64 => DataType::Int64,
        FieldType::UInt8 => DataType::UInt8,
        FieldType::UInt16 => DataType::UInt16,
        FieldType::UInt32 => DataType::UInt32,
        FieldType::UInt64 => DataType::UInt64,
        FieldType::Float32 => DataType::Float32,
        FieldType::Float64 => DataType::Float64,
        FieldType::Date => DataType::Date,
        FieldType::Time => DataType::Time,
        FieldType::Timestamp => DataType::Datetime(TimeUnit::Microseconds, None),
        FieldType::TimestampTz => {
            DataType::Datetime(TimeUnit::Microseconds, Some(TimeZone::UTC))
        }
    }
}

/// Polars field for a schema field.
pub fn field_to_polars(field: &CsvField) -> Field {
    Field::new(field.name.as_ref().into(), field_type_to_dtype(field.field_type))
}

/// Polars schema for a CSV schema, in field order.
pub fn schema_to_polars(schema: &CsvSchema) -> Schema {
    Schema::from_iter(schema.fields().iter().map(field_to_polars))
}
