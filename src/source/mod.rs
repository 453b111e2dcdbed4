//! Byte source abstractions for streaming CSV data
//!
//! The reader consumes byte ranges of an already-resolved file through the
//! [`StreamSource`] trait. Local files and in-memory buffers are provided.

mod local;
mod memory;
mod traits;

pub use local::LocalSource;
pub use memory::MemorySource;
pub use traits::{BoxedSource, SharedSource, StreamSource};
