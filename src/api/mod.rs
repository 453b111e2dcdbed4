//! Public API for defining and opening CSV sources.
//!
//! # Module Structure
//! - `options`: format and read options (`FormatConfig`, `ReadOptions`)
//! - `columns`: column selection and projection planning
//! - `source`: the `CsvSource` facade

pub mod columns;
pub mod options;
pub mod source;

pub use columns::{resolve_columns, ColumnSelection, ProjectionPlan};
pub use options::{ErrorMode, FormatConfig, ReadOptions};
pub use source::{CsvSource, SourceLocation};
