//! Streaming, schema-typed CSV reader.
//!
//! A [`CsvSource`] binds a file, a declared schema, a [`FormatConfig`] and a
//! column projection. Opening it yields typed rows, either for a bounded read
//! that ends with the file or an unbounded read that tails it, and rows can
//! be gathered into Polars DataFrames.

pub mod api;
pub mod convert;
pub mod error;
pub mod reader;
pub mod schema;
pub mod source;

// Re-export main types
pub use api::{
    ColumnSelection, CsvSource, ErrorMode, FormatConfig, ProjectionPlan, ReadOptions,
    SourceLocation,
};
pub use convert::{
    field_to_polars, field_type_to_dtype, schema_to_polars, BuilderError, DataFrameBuilder,
};
pub use error::{
    ConfigError, DecodeError, ReadError, ReadErrorKind, ReaderError, SourceError,
};
pub use reader::{
    coerce, write_record, write_row, Partition, PartitionReader, ReadMode, ReadStats, RowReader,
    TypedRow, Value,
};
pub use schema::{parse_schema, CsvSchema, Field, FieldType};
pub use source::{BoxedSource, LocalSource, MemorySource, SharedSource, StreamSource};
