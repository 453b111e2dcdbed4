//! CSV decoding pipeline
//!
//! Bytes flow through the stages in this order:
//!
//! 1. [`buffer`]: fetches byte ranges of the source into a sliding window
//! 2. [`filter`]: drops comment lines and the header line
//! 3. [`tokenizer`]: splits records into raw field spans
//! 4. [`assembler`]: coerces the projected fields ([`coerce`]) into a row
//!
//! [`partition`] drives the stages for one byte range; [`stream`] chains
//! partitions into a single reader.

pub mod assembler;
pub mod buffer;
pub mod coerce;
pub mod encode;
pub mod filter;
pub mod partition;
pub mod stream;
pub mod tokenizer;
mod value;

pub use assembler::{ParseOutcome, RowAssembler};
pub use buffer::FetchBuffer;
pub use coerce::{coerce, CoercionError};
pub use encode::{write_record, write_row};
pub use filter::{locate_first_line, HeaderSkip, LineAction, LineFilter};
pub use partition::{
    plan_partitions, plan_record_partitions, Partition, PartitionConfig, PartitionReader,
    ReadMode, ReadStats,
};
pub use stream::RowReader;
pub use tokenizer::{RawToken, RecordBounds, Scan, Tokenizer};
pub use value::{TypedRow, Value};
