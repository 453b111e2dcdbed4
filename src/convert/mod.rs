//! CSV schema to Polars type conversion
//!
//! Maps declared field types to Polars data types and provides the
//! `DataFrameBuilder` for batching typed rows into DataFrames.

mod dataframe;
mod dtype;

pub use dataframe::{BuilderError, DataFrameBuilder};
pub use dtype::{field_to_polars, field_type_to_dtype, schema_to_polars};
