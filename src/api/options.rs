//! CSV format and reader options.
//!
//! `FormatConfig` describes the byte format of the file (delimiters, quoting,
//! comments, header, failure policy). `ReadOptions` controls how the reader
//! fetches and batches data. The two are kept apart the same way Polars keeps
//! format options apart from scan arguments.

use std::time::Duration;

use crate::error::ConfigError;

/// Error handling mode for record decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail the read on the first malformed record.
    #[default]
    Strict,
    /// Skip malformed records and continue.
    ///
    /// Skipped records are counted and can be retrieved after reading.
    Skip,
}

/// Byte format of a delimited file.
///
/// Immutable once built; every `with_*` method returns a new value.
///
/// # Example
/// ```
/// use csvliner::api::FormatConfig;
///
/// let format = FormatConfig::new()
///     .with_field_delimiter("|")
///     .with_quote('"')
///     .with_comment_prefix("#")
///     .with_skip_first_line(true)
///     .lenient();
/// assert!(format.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatConfig {
    field_delimiter: Vec<u8>,
    row_delimiter: Vec<u8>,
    quote: Option<char>,
    comment_prefix: Option<Vec<u8>>,
    skip_first_line: bool,
    lenient: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            field_delimiter: b",".to_vec(),
            row_delimiter: b"\n".to_vec(),
            quote: None,
            comment_prefix: None,
            skip_first_line: false,
            lenient: false,
        }
    }
}

impl FormatConfig {
    /// Create a format with default settings: `,` / `\n`, no quoting,
    /// no comments, no header, strict.
    pub fn new() -> Self {
        Self::default()
    }

    /// RFC 4180 format: `,` / `\r\n` with `"` quoting.
    pub fn rfc4180() -> Self {
        Self::default().with_row_delimiter("\r\n").with_quote('"')
    }

    /// Set the field delimiter.
    pub fn with_field_delimiter(mut self, delimiter: impl AsRef<[u8]>) -> Self {
        self.field_delimiter = delimiter.as_ref().to_vec();
        self
    }

    /// Set the row delimiter.
    pub fn with_row_delimiter(mut self, delimiter: impl AsRef<[u8]>) -> Self {
        self.row_delimiter = delimiter.as_ref().to_vec();
        self
    }

    /// Enable quoting with the given character.
    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = Some(quote);
        self
    }

    /// Disable quoting.
    pub fn without_quote(mut self) -> Self {
        self.quote = None;
        self
    }

    /// Drop physical lines starting with `prefix`.
    pub fn with_comment_prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.comment_prefix = Some(prefix.as_ref().to_vec());
        self
    }

    /// Discard the first non-comment line of the file.
    pub fn with_skip_first_line(mut self, skip: bool) -> Self {
        self.skip_first_line = skip;
        self
    }

    /// Skip malformed records instead of failing.
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    /// Fail on the first malformed record.
    pub fn strict(mut self) -> Self {
        self.lenient = false;
        self
    }

    /// Set the error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.lenient = mode == ErrorMode::Skip;
        self
    }

    pub fn field_delimiter(&self) -> &[u8] {
        &self.field_delimiter
    }

    pub fn row_delimiter(&self) -> &[u8] {
        &self.row_delimiter
    }

    pub fn quote(&self) -> Option<char> {
        self.quote
    }

    /// Quote character as a byte. Only meaningful after `validate()`.
    pub fn quote_byte(&self) -> Option<u8> {
        self.quote.map(|q| q as u8)
    }

    pub fn comment_prefix(&self) -> Option<&[u8]> {
        self.comment_prefix.as_deref()
    }

    pub fn skip_first_line(&self) -> bool {
        self.skip_first_line
    }

    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    pub fn error_mode(&self) -> ErrorMode {
        if self.lenient {
            ErrorMode::Skip
        } else {
            ErrorMode::Strict
        }
    }

    /// Check that the format can be tokenized unambiguously.
    ///
    /// # Errors
    /// - `ConfigError::EmptyDelimiter` for an empty field or row delimiter
    /// - `ConfigError::InvalidFormat` if the delimiters are equal, the quote is
    ///   not a single ASCII character or occurs inside a delimiter, or the
    ///   comment prefix is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_delimiter.is_empty() {
            return Err(ConfigError::EmptyDelimiter("Field"));
        }
        if self.row_delimiter.is_empty() {
            return Err(ConfigError::EmptyDelimiter("Row"));
        }
        if self.field_delimiter == self.row_delimiter {
            return Err(ConfigError::InvalidFormat(
                "Field and row delimiters must differ".to_string(),
            ));
        }

        if let Some(quote) = self.quote {
            if !quote.is_ascii() {
                return Err(ConfigError::InvalidFormat(format!(
                    "Quote character must be a single-byte ASCII character, got {:?}",
                    quote
                )));
            }
            let q = quote as u8;
            if self.field_delimiter.contains(&q) || self.row_delimiter.contains(&q) {
                return Err(ConfigError::InvalidFormat(format!(
                    "Quote character {:?} must not occur in a delimiter",
                    quote
                )));
            }
        }

        if let Some(prefix) = &self.comment_prefix {
            if prefix.is_empty() {
                return Err(ConfigError::InvalidFormat(
                    "Comment prefix must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Reader options.
///
/// Controls fetching, batching and tailing. Analogous to Polars'
/// format-specific option structs.
///
/// # Example
/// ```
/// use csvliner::api::ReadOptions;
///
/// let opts = ReadOptions {
///     target_partitions: 4,
///     read_chunk_size: 256 * 1024,
///     ..Default::default()
/// };
/// assert!(opts.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadOptions {
    /// Bytes requested from the source per fetch (default: 64KB).
    pub read_chunk_size: usize,

    /// Target number of rows per DataFrame batch (default: 100,000).
    pub batch_size: usize,

    /// Number of byte-range partitions a bounded read is split into (default: 1).
    pub target_partitions: usize,

    /// Wait between availability checks while tailing (default: 100ms).
    pub poll_interval: Duration,

    /// Maximum size of a single record in bytes (default: 64MB).
    ///
    /// A record that grows past this limit without a row delimiter is a
    /// decode failure, which bounds buffer growth on garbage input.
    /// Set to `None` to disable the limit.
    pub max_record_size: Option<usize>,

    /// Stop a bounded read after this many rows (default: unlimited).
    pub n_rows: Option<usize>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            read_chunk_size: 64 * 1024,
            batch_size: 100_000,
            target_partitions: 1,
            poll_interval: Duration::from_millis(100),
            max_record_size: Some(64 * 1024 * 1024),
            n_rows: None,
        }
    }
}

impl ReadOptions {
    /// Create new options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fetch size.
    pub fn with_read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size;
        self
    }

    /// Set the DataFrame batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the number of partitions for bounded reads.
    pub fn with_target_partitions(mut self, target_partitions: usize) -> Self {
        self.target_partitions = target_partitions;
        self
    }

    /// Set the tailing poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the maximum record size.
    pub fn with_max_record_size(mut self, limit: Option<usize>) -> Self {
        self.max_record_size = limit;
        self
    }

    /// Limit the number of rows returned by bounded reads.
    pub fn with_n_rows(mut self, n_rows: usize) -> Self {
        self.n_rows = Some(n_rows);
        self
    }

    /// Reject zero sizes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_chunk_size == 0 {
            return Err(ConfigError::InvalidFormat(
                "read_chunk_size must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidFormat(
                "batch_size must be positive".to_string(),
            ));
        }
        if self.target_partitions == 0 {
            return Err(ConfigError::InvalidFormat(
                "target_partitions must be positive".to_string(),
            ));
        }
        if self.max_record_size == Some(0) {
            return Err(ConfigError::InvalidFormat(
                "max_record_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
