//! CSV schema types and parsing.
//!
//! This module defines the declared column types, the immutable schema and
//! the JSON declaration parser.

mod parser;
mod types;

pub use parser::{parse_schema, parse_schema_value};
pub use types::*;
