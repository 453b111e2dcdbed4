//! DataFrameBuilder for converting typed rows to Polars DataFrames.
//!
//! Rows are accumulated column by column and turned into a DataFrame once
//! the batch size is reached (or on `finish`).

use polars::prelude::*;

use crate::convert::dtype::schema_to_polars;
use crate::reader::{TypedRow, Value};
use crate::schema::{CsvSchema, FieldType};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Error type for DataFrameBuilder operations.
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    /// Row has a different number of values than the schema.
    #[error("Row has {found} values, expected {expected}")]
    Shape { expected: usize, found: usize },
    /// Value does not match the declared column type.
    #[error("Column '{column}' expects {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: FieldType,
        found: FieldType,
    },
    /// Polars error during DataFrame creation.
    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<PolarsError> for BuilderError {
    fn from(err: PolarsError) -> Self {
        BuilderError::Polars(err.to_string())
    }
}

/// Values of one column, stored in the Polars physical representation.
enum ColumnValues {
    String(Vec<String>),
    Boolean(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    /// Days since the Unix epoch.
    Date(Vec<i32>),
    /// Nanoseconds since midnight.
    Time(Vec<i64>),
    /// Microseconds since the Unix epoch.
    Timestamp(Vec<i64>),
    /// Microseconds since the Unix epoch, UTC.
    TimestampTz(Vec<i64>),
}

impl ColumnValues {
    fn new(field_type: FieldType) -> Self {
        match field_type {
            FieldType::String => Self::String(Vec::new()),
            FieldType::Boolean => Self::Boolean(Vec::new()),
            FieldType::Int8 => Self::Int8(Vec::new()),
            FieldType::Int16 => Self::Int16(Vec::new()),
            FieldType::Int32 => Self::Int32(Vec::new()),
            FieldType::Int64 => Self::Int64(Vec::new()),
            FieldType::UInt8 => Self::UInt8(Vec::new()),
            FieldType::UInt16 => Self::UInt16(Vec::new()),
            FieldType::UInt32 => Self::UInt32(Vec::new()),
            FieldType::UInt64 => Self::UInt64(Vec::new()),
            FieldType::Float32 => Self::Float32(Vec::new()),
            FieldType::Float64 => Self::Float64(Vec::new()),
            FieldType::Date => Self::Date(Vec::new()),
            FieldType::Time => Self::Time(Vec::new()),
            FieldType::Timestamp => Self::Timestamp(Vec::new()),
            FieldType::TimestampTz => Self::TimestampTz(Vec::new()),
        }
    }

    /// Append a value; returns it back if the type does not match.
    fn push(&mut self, value: Value) -> Result<(), Value> {
        match (self, value) {
            (Self::String(v), Value::String(x)) => v.push(x),
            (Self::Boolean(v), Value::Boolean(x)) => v.push(x),
            (Self::Int8(v), Value::Int8(x)) => v.push(x),
            (Self::Int16(v), Value::Int16(x)) => v.push(x),
            (Self::Int32(v), Value::Int32(x)) => v.push(x),
            (Self::Int64(v), Value::Int64(x)) => v.push(x),
            (Self::UInt8(v), Value::UInt8(x)) => v.push(x),
            (Self::UInt16(v), Value::UInt16(x)) => v.push(x),
            (Self::UInt32(v), Value::UInt32(x)) => v.push(x),
            (Self::UInt64(v), Value::UInt64(x)) => v.push(x),
            (Self::Float32(v), Value::Float32(x)) => v.push(x),
            (Self::Float64(v), Value::Float64(x)) => v.push(x),
            (Self::Date(v), Value::Date(x)) => {
                v.push(chrono::Datelike::num_days_from_ce(&x) - UNIX_EPOCH_DAYS_FROM_CE)
            }
            (Self::Time(v), Value::Time(x)) => {
                let secs = chrono::Timelike::num_seconds_from_midnight(&x) as i64;
                v.push(secs * 1_000_000_000 + chrono::Timelike::nanosecond(&x) as i64)
            }
            (Self::Timestamp(v), Value::Timestamp(x)) => v.push(x.and_utc().timestamp_micros()),
            (Self::TimestampTz(v), Value::TimestampTz(x)) => v.push(x.timestamp_micros()),
            (_, other) => return Err(other),
        }
        Ok(())
    }

    /// Move the accumulated values into a Series.
    fn take_series(&mut self, name: &str) -> Series {
        let name: PlSmallStr = name.into();
        match self {
            Self::String(v) => Series::new(name, std::mem::take(v)),
            Self::Boolean(v) => Series::new(name, std::mem::take(v)),
            Self::Int8(v) => Series::new(name, std::mem::take(v)),
            Self::Int16(v) => Series::new(name, std::mem::take(v)),
            Self::Int32(v) => Series::new(name, std::mem::take(v)),
            Self::Int64(v) => Series::new(name, std::mem::take(v)),
            Self::UInt8(v) => Series::new(name, std::mem::take(v)),
            Self::UInt16(v) => Series::new(name, std::mem::take(v)),
            Self::UInt32(v) => Series::new(name, std::mem::take(v)),
            Self::UInt64(v) => Series::new(name, std::mem::take(v)),
            Self::Float32(v) => Series::new(name, std::mem::take(v)),
            Self::Float64(v) => Series::new(name, std::mem::take(v)),
            Self::Date(v) => Int32Chunked::new(name, &std::mem::take(v))
                .into_date()
                .into_series(),
            Self::Time(v) => Int64Chunked::new(name, &std::mem::take(v))
                .into_time()
                .into_series(),
            Self::Timestamp(v) => Int64Chunked::new(name, &std::mem::take(v))
                .into_datetime(TimeUnit::Microseconds, None)
                .into_series(),
            Self::TimestampTz(v) => Int64Chunked::new(name, &std::mem::take(v))
                .into_datetime(TimeUnit::Microseconds, Some(TimeZone::UTC))
                .into_series(),
        }
    }
}

/// Builds Polars DataFrames from typed rows.
///
/// # Example
/// ```
/// use csvliner::convert::DataFrameBuilder;
/// use csvliner::reader::{TypedRow, Value};
/// use csvliner::schema::{CsvSchema, FieldType};
///
/// let schema = CsvSchema::new(["id"], vec![FieldType::Int64]).unwrap();
/// let mut builder = DataFrameBuilder::new(&schema, 2);
/// builder.push_row(TypedRow::new(vec![Value::Int64(1)])).unwrap();
/// assert!(!builder.is_batch_ready());
/// let df = builder.finish().unwrap().unwrap();
/// assert_eq!(df.height(), 1);
/// ```
pub struct DataFrameBuilder {
    schema: CsvSchema,
    polars_schema: Schema,
    columns: Vec<ColumnValues>,
    batch_size: usize,
    pending: usize,
}

impl DataFrameBuilder {
    /// Create a builder for rows of `schema`, batching `batch_size` rows.
    pub fn new(schema: &CsvSchema, batch_size: usize) -> Self {
        Self {
            schema: schema.clone(),
            polars_schema: schema_to_polars(schema),
            columns: schema.types().map(ColumnValues::new).collect(),
            batch_size,
            pending: 0,
        }
    }

    /// Append one row.
    ///
    /// # Errors
    /// - `BuilderError::Shape` if the row length differs from the schema
    /// - `BuilderError::TypeMismatch` if a value has the wrong type; the
    ///   builder is left unchanged
    pub fn push_row(&mut self, row: TypedRow) -> Result<(), BuilderError> {
        if row.len() != self.columns.len() {
            return Err(BuilderError::Shape {
                expected: self.columns.len(),
                found: row.len(),
            });
        }

        let fields = self.schema.fields();
        if let Some((field, value)) = fields
            .iter()
            .zip(row.values())
            .find(|(field, value)| field.field_type != value.field_type())
        {
            return Err(BuilderError::TypeMismatch {
                column: field.name.to_string(),
                expected: field.field_type,
                found: value.field_type(),
            });
        }

        for (column, value) in self.columns.iter_mut().zip(row) {
            // Types were checked above.
            let _ = column.push(value);
        }
        self.pending += 1;
        Ok(())
    }

    /// Build a DataFrame from the accumulated rows.
    ///
    /// If `force` is false, only builds once the batch size is reached.
    /// Returns `None` if there is nothing to build.
    pub fn build(&mut self, force: bool) -> Result<Option<DataFrame>, BuilderError> {
        if self.pending == 0 || (!force && self.pending < self.batch_size) {
            return Ok(None);
        }

        let columns: Vec<Column> = self
            .columns
            .iter_mut()
            .zip(self.schema.fields())
            .map(|(values, field)| Column::from(values.take_series(&field.name)))
            .collect();
        self.pending = 0;

        Ok(Some(DataFrame::new(columns)?))
    }

    /// Build a DataFrame with all accumulated rows.
    pub fn finish(&mut self) -> Result<Option<DataFrame>, BuilderError> {
        self.build(true)
    }

    /// Number of rows waiting to be built.
    pub fn pending_rows(&self) -> usize {
        self.pending
    }

    pub fn is_batch_ready(&self) -> bool {
        self.pending >= self.batch_size
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Polars schema of the produced DataFrames.
    pub fn schema(&self) -> &Schema {
        &self.polars_schema
    }
}
