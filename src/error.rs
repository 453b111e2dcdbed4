//! Error types for CSV streaming

use std::io;
use thiserror::Error;

/// Errors raised while building a source definition.
///
/// These are always detected before any byte is read: schema construction,
/// format validation and projection planning all fail synchronously.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Field names and field types have different lengths
    #[error("Schema has {names} field names but {types} field types")]
    SchemaLengthMismatch { names: usize, types: usize },
    /// Schema without any field
    #[error("Schema must declare at least one field")]
    EmptySchema,
    /// Two fields share the same name
    #[error("Duplicate field name: {0}")]
    DuplicateField(String),
    /// Unrecognized type name in a schema declaration
    #[error("Unknown field type: {0}")]
    UnknownType(String),
    /// Malformed schema declaration
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Projection index outside the schema
    #[error("Column index {index} is out of range for a schema with {len} columns")]
    ProjectionOutOfRange { index: usize, len: usize },
    /// Projection selecting no column at all
    #[error("Projection must select at least one column")]
    EmptyProjection,
    /// Projection by name referenced an unknown column
    #[error("Column '{name}' not found. Available columns: [{available}]")]
    UnknownColumn { name: String, available: String },
    /// Delimiter configured as an empty string
    #[error("{0} delimiter must not be empty")]
    EmptyDelimiter(&'static str),
    /// Any other invalid format or read option
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Cause of a record-level decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Quoted field still open when the input ended
    #[error("Unterminated quoted field")]
    UnterminatedQuote,
    /// Quote character found inside an unquoted field
    #[error("Quote character inside unquoted field at byte {position} of the record")]
    MalformedQuote { position: usize },
    /// Closing quote followed by something other than a delimiter
    #[error("Unexpected byte 0x{byte:02x} after closing quote at byte {position} of the record")]
    TrailingAfterQuote { position: usize, byte: u8 },
    /// Record has a different number of fields than the schema
    #[error("Expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    /// Field could not be converted to its declared type
    #[error("Cannot parse '{token}' as {field_type} for column '{column}': {message}")]
    Coercion {
        column: String,
        field_type: String,
        token: String,
        message: String,
    },
    /// Field is not valid UTF-8
    #[error("Invalid UTF-8 in column '{column}'")]
    InvalidUtf8 { column: String },
    /// Record grew past the configured limit without a row delimiter
    #[error("Record exceeds maximum size of {limit} bytes")]
    RecordTooLarge { limit: usize },
}

/// Errors that can occur with data sources
#[derive(Debug, Error)]
pub enum SourceError {
    /// File system error
    #[error("File system error: {0}")]
    FileSystemError(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Path not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Top-level reader error type
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Source error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// DataFrame conversion error
    #[error("Conversion error: {0}")]
    Convert(#[from] crate::convert::BuilderError),

    /// Decode failure at a specific record
    #[error("Decode error in partition {partition} at offset {offset}: {cause}")]
    Decode {
        partition: usize,
        offset: u64,
        cause: DecodeError,
    },
}

impl ReaderError {
    /// Byte offset of the failing record, for decode failures.
    pub fn offset(&self) -> Option<u64> {
        match self {
            ReaderError::Decode { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Whether this is a record-level decode failure.
    pub fn is_decode(&self) -> bool {
        matches!(self, ReaderError::Decode { .. })
    }
}

/// Record skipped during a lenient read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadError {
    /// The kind of error that occurred
    pub kind: ReadErrorKind,
    /// Partition the record belongs to
    pub partition: usize,
    /// File offset of the skipped record
    pub offset: u64,
    /// Human-readable error message
    pub message: String,
}

impl ReadError {
    /// Create a new ReadError
    pub fn new(kind: ReadErrorKind, partition: usize, offset: u64, message: String) -> Self {
        Self {
            kind,
            partition,
            offset,
            message,
        }
    }

    /// Build a ReadError from the decode failure that caused the skip.
    pub fn from_decode(cause: &DecodeError, partition: usize, offset: u64) -> Self {
        Self::new(
            ReadErrorKind::from(cause),
            partition,
            offset,
            cause.to_string(),
        )
    }
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} in partition {}, offset {}: {}",
            self.kind, self.partition, self.offset, self.message
        )
    }
}

/// Types of recoverable errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorKind {
    /// Record could not be split into fields (quoting or size problems)
    MalformedRecord,
    /// Record has the wrong number of fields
    FieldCount,
    /// A projected field failed type coercion
    Coercion,
}

impl From<&DecodeError> for ReadErrorKind {
    fn from(err: &DecodeError) -> Self {
        match err {
            DecodeError::FieldCount { .. } => ReadErrorKind::FieldCount,
            DecodeError::Coercion { .. } | DecodeError::InvalidUtf8 { .. } => {
                ReadErrorKind::Coercion
            }
            DecodeError::UnterminatedQuote
            | DecodeError::MalformedQuote { .. }
            | DecodeError::TrailingAfterQuote { .. }
            | DecodeError::RecordTooLarge { .. } => ReadErrorKind::MalformedRecord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_error_offset() {
        let err = ReaderError::Decode {
            partition: 2,
            offset: 118,
            cause: DecodeError::UnterminatedQuote,
        };
        assert_eq!(err.offset(), Some(118));
        assert!(err.is_decode());

        let err = ReaderError::from(ConfigError::EmptySchema);
        assert_eq!(err.offset(), None);
        assert!(!err.is_decode());
    }

    #[test]
    fn test_read_error_kind_mapping() {
        let shape = DecodeError::FieldCount {
            expected: 3,
            found: 2,
        };
        assert_eq!(ReadErrorKind::from(&shape), ReadErrorKind::FieldCount);
        assert_eq!(
            ReadErrorKind::from(&DecodeError::MalformedQuote { position: 4 }),
            ReadErrorKind::MalformedRecord
        );

        let err = ReadError::from_decode(&shape, 1, 40);
        assert_eq!(err.kind, ReadErrorKind::FieldCount);
        assert_eq!(err.to_string(), "FieldCount in partition 1, offset 40: Expected 3 fields, found 2");
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::Coercion {
            column: "id".into(),
            field_type: "int64".into(),
            token: "12x".into(),
            message: "invalid digit found in string".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot parse '12x' as int64 for column 'id': invalid digit found in string"
        );
    }
}
