//! Per-partition decode loop.
//!
//! A [`PartitionReader`] owns one byte range of the source and turns it into
//! typed rows: fetch, filter comments and header, tokenize, assemble. All of
//! its state (buffer, quote and discard state, header flag) lives and dies
//! with the reader, and nothing is shared with other partitions.
//!
//! # Ownership rules
//!
//! A record belongs to the partition containing its first byte. A partition
//! that does not start at offset 0 begins by discarding bytes up to the first
//! record start at or after its `start`, and the partition before it reads
//! past its own `end` to finish the last record it owns.

use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::api::{FormatConfig, ProjectionPlan, ReadOptions};
use crate::error::{DecodeError, ReadError, ReaderError, SourceError};
use crate::reader::assembler::{ParseOutcome, RowAssembler};
use crate::reader::buffer::FetchBuffer;
use crate::reader::filter::{HeaderSkip, LineAction, LineFilter};
use crate::reader::tokenizer::{RawToken, Scan, Tokenizer};
use crate::reader::value::TypedRow;
use crate::schema::CsvSchema;
use crate::source::{SharedSource, StreamSource};

/// How a reader treats the end of the available bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// End of data terminates the read.
    #[default]
    Bounded,
    /// End of data suspends the read until more bytes arrive.
    Unbounded,
}

/// A byte range of the source decoded by one reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// Position in the partition plan.
    pub index: usize,
    /// First byte owned by the partition.
    pub start: u64,
    /// One past the last owned byte; `None` reads to the end of the source.
    pub end: Option<u64>,
}

impl Partition {
    /// The whole source as a single open-ended partition.
    pub fn whole() -> Self {
        Self {
            index: 0,
            start: 0,
            end: None,
        }
    }

    /// Whether a record starting at `offset` belongs to this partition.
    pub fn owns(&self, offset: u64) -> bool {
        offset >= self.start && self.end.map_or(true, |end| offset < end)
    }
}

/// Split `[0, size)` into at most `target` contiguous partitions.
///
/// An empty source still gets one (empty) partition.
///
/// # Example
/// ```
/// use csvliner::reader::plan_partitions;
///
/// let parts = plan_partitions(10, 3);
/// assert_eq!(parts.len(), 3);
/// assert_eq!((parts[0].start, parts[0].end), (0, Some(4)));
/// assert_eq!((parts[2].start, parts[2].end), (8, Some(10)));
/// ```
pub fn plan_partitions(size: u64, target: usize) -> Vec<Partition> {
    if size == 0 {
        return vec![Partition {
            index: 0,
            start: 0,
            end: Some(0),
        }];
    }

    let chunk = size.div_ceil(target.max(1) as u64);
    (0..)
        .map(|i| i * chunk)
        .take_while(|&start| start < size)
        .enumerate()
        .map(|(index, start)| Partition {
            index,
            start,
            end: Some((start + chunk).min(size)),
        })
        .collect()
}

/// Split the source into at most `options.target_partitions` partitions
/// whose boundaries fall on line starts.
///
/// Without a quote character every row delimiter ends a line, so the byte
/// split of [`plan_partitions`] is used as is. With one, a row delimiter may
/// sit inside a quoted field: the source is scanned once from the start and
/// each boundary moves forward to the first line that begins at or after it.
/// Boundaries that land on the same line collapse, so fewer partitions may
/// come back than requested.
pub async fn plan_record_partitions(
    source: &dyn StreamSource,
    format: &FormatConfig,
    options: &ReadOptions,
) -> Result<Vec<Partition>, SourceError> {
    let size = source.size().await?;
    let naive = plan_partitions(size, options.target_partitions);
    if naive.len() == 1 || format.quote_byte().is_none() {
        return Ok(naive);
    }

    let header = if format.skip_first_line() {
        HeaderSkip::FirstLine
    } else {
        HeaderSkip::Disabled
    };
    let tokenizer = Tokenizer::new(format);
    let mut filter = LineFilter::new(format, header);
    let mut buffer = FetchBuffer::new(0);
    let mut tokens = Vec::new();
    let mut targets = naive.iter().skip(1).map(|p| p.start).peekable();
    let mut starts = vec![0];
    let mut discarding = false;
    let mut exhausted = false;

    loop {
        let offset = buffer.offset();
        let input = buffer.bytes();

        // `None` asks for more bytes.
        let consumed = if discarding {
            match tokenizer.find_line_end(input) {
                Some(n) => {
                    discarding = false;
                    Some(n)
                }
                None if exhausted => break,
                None => None,
            }
        } else {
            if offset >= size {
                break;
            }
            while targets.next_if(|&target| target <= offset).is_some() {
                if starts.last() != Some(&offset) {
                    starts.push(offset);
                }
            }
            if targets.peek().is_none() {
                break;
            }

            match filter.classify(input, offset, exhausted) {
                LineAction::NeedMore => None,
                LineAction::DropComment | LineAction::DropHeader => {
                    discarding = true;
                    Some(0)
                }
                LineAction::Keep => match tokenizer.next_record(input, exhausted, &mut tokens) {
                    Ok(Scan::Record(bounds)) => Some(bounds.consumed),
                    Ok(Scan::End) => break,
                    Ok(Scan::Incomplete) => match options.max_record_size {
                        Some(limit) if input.len() > limit => {
                            discarding = true;
                            Some(0)
                        }
                        _ => None,
                    },
                    // Resync the way a lenient reader does.
                    Err(_) => {
                        discarding = true;
                        Some(0)
                    }
                },
            }
        };

        match consumed {
            Some(n) => buffer.consume(n),
            None if exhausted => break,
            None => {
                let length = options.read_chunk_size.max(buffer.len());
                if buffer.fill(source, length).await? == 0 {
                    exhausted = true;
                }
            }
        }
    }

    let partitions: Vec<Partition> = starts
        .iter()
        .enumerate()
        .map(|(index, &start)| Partition {
            index,
            start,
            end: Some(starts.get(index + 1).copied().unwrap_or(size)),
        })
        .collect();
    debug!(
        size,
        requested = naive.len(),
        partitions = partitions.len(),
        "Planned partitions on line starts"
    );
    Ok(partitions)
}

/// Counters for one read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Rows yielded.
    pub rows: u64,
    /// Records skipped in lenient mode.
    pub skipped: u64,
    /// Comment lines dropped.
    pub comments: u64,
    /// Bytes fetched from the source.
    pub bytes_read: u64,
}

impl AddAssign for ReadStats {
    fn add_assign(&mut self, other: Self) {
        self.rows += other.rows;
        self.skipped += other.skipped;
        self.comments += other.comments;
        self.bytes_read += other.bytes_read;
    }
}

/// Everything a partition reader needs besides its byte range.
#[derive(Debug, Clone)]
pub struct PartitionConfig {
    pub schema: CsvSchema,
    pub projection: ProjectionPlan,
    pub format: FormatConfig,
    pub options: ReadOptions,
    pub header: HeaderSkip,
    pub mode: ReadMode,
}

/// What the decode loop does next.
enum Step {
    Continue,
    Fetch,
    Consume(usize),
    Row(TypedRow, usize),
    /// Skipped record; `None` resyncs at the next row delimiter.
    Skip(ReadError, Option<usize>),
    Fail(ReaderError),
    End,
}

/// Streams typed rows out of one partition.
pub struct PartitionReader {
    partition: Partition,
    source: Option<SharedSource>,
    buffer: FetchBuffer,
    tokenizer: Tokenizer,
    filter: LineFilter,
    assembler: RowAssembler,
    tokens: Vec<RawToken>,
    mode: ReadMode,
    chunk_size: usize,
    max_record_size: Option<usize>,
    poll_interval: Duration,
    /// Dropping bytes up to the next row delimiter.
    discarding: bool,
    /// Bounded mode only: the source returned no more bytes.
    exhausted: bool,
    suspended: bool,
    finished: bool,
    stats: ReadStats,
    errors: Vec<ReadError>,
    cancel: CancellationToken,
}

impl PartitionReader {
    /// Create a reader for `partition`. No bytes are fetched until the
    /// first call to [`next_row`](Self::next_row).
    pub fn new(
        source: SharedSource,
        partition: Partition,
        config: PartitionConfig,
        cancel: CancellationToken,
    ) -> Self {
        let rd_len = config.format.row_delimiter().len() as u64;
        // Start early enough to see a row delimiter that ends exactly at `start`.
        let (fetch_start, discarding) = if partition.start == 0 {
            (0, false)
        } else {
            (partition.start.saturating_sub(rd_len), true)
        };

        debug!(
            partition = partition.index,
            start = partition.start,
            end = ?partition.end,
            mode = ?config.mode,
            "Opening partition"
        );

        Self {
            partition,
            source: Some(source),
            buffer: FetchBuffer::new(fetch_start),
            tokenizer: Tokenizer::new(&config.format),
            filter: LineFilter::new(&config.format, config.header),
            assembler: RowAssembler::new(
                config.schema,
                config.projection,
                config.format.quote_byte(),
                config.format.error_mode(),
                partition.index,
            ),
            tokens: Vec::new(),
            mode: config.mode,
            chunk_size: config.options.read_chunk_size,
            max_record_size: config.options.max_record_size,
            poll_interval: config.options.poll_interval,
            discarding,
            exhausted: false,
            suspended: false,
            finished: false,
            stats: ReadStats::default(),
            errors: Vec::new(),
            cancel,
        }
    }

    /// Next row of the partition.
    ///
    /// Returns `Ok(None)` once the partition is exhausted (bounded mode) or
    /// cancelled. In unbounded mode this waits while no more bytes are
    /// available. After an error or `None`, every later call returns
    /// `Ok(None)`.
    ///
    /// # Errors
    /// - `ReaderError::Decode` for the first malformed record in strict mode
    /// - `ReaderError::Source` if the source cannot be read
    pub async fn next_row(&mut self) -> Result<Option<TypedRow>, ReaderError> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if self.cancel.is_cancelled() {
                debug!(partition = self.partition.index, "Partition cancelled");
                self.finish();
                return Ok(None);
            }

            match self.step() {
                Step::Continue => {}
                Step::Consume(n) => self.buffer.consume(n),
                Step::Fetch => {
                    if let Err(e) = self.fetch().await {
                        self.finish();
                        return Err(e);
                    }
                }
                Step::Row(row, consumed) => {
                    self.buffer.consume(consumed);
                    self.stats.rows += 1;
                    return Ok(Some(row));
                }
                Step::Skip(err, consumed) => {
                    warn!(
                        partition = err.partition,
                        offset = err.offset,
                        kind = ?err.kind,
                        "Skipping malformed record: {}",
                        err.message
                    );
                    self.stats.skipped += 1;
                    self.errors.push(err);
                    match consumed {
                        Some(n) => self.buffer.consume(n),
                        None => self.discarding = true,
                    }
                }
                Step::Fail(err) => {
                    self.finish();
                    return Err(err);
                }
                Step::End => {
                    self.finish();
                    return Ok(None);
                }
            }
        }
    }

    /// Decide the next action from the buffered bytes alone.
    fn step(&mut self) -> Step {
        let at_eof = self.mode == ReadMode::Bounded && self.exhausted;
        let offset = self.buffer.offset();
        let input = self.buffer.bytes();

        if self.discarding {
            return match self.tokenizer.find_line_end(input) {
                Some(n) => {
                    self.discarding = false;
                    Step::Consume(n)
                }
                None if at_eof => {
                    self.discarding = false;
                    Step::Consume(input.len())
                }
                None => {
                    // Keep a possible partial delimiter at the end.
                    let keep = self.tokenizer.row_delimiter().len() - 1;
                    match input.len().saturating_sub(keep) {
                        0 => Step::Fetch,
                        n => Step::Consume(n),
                    }
                }
            };
        }

        if !self.partition.owns(offset) {
            return Step::End;
        }

        match self.filter.classify(input, offset, at_eof) {
            LineAction::Keep => {}
            LineAction::NeedMore => return Step::Fetch,
            LineAction::DropComment => {
                self.stats.comments += 1;
                self.discarding = true;
                return Step::Continue;
            }
            LineAction::DropHeader => {
                debug!(partition = self.partition.index, offset, "Skipping header line");
                self.discarding = true;
                return Step::Continue;
            }
        }

        match self.tokenizer.next_record(input, at_eof, &mut self.tokens) {
            Ok(Scan::End) => Step::End,
            Ok(Scan::Incomplete) => match self.max_record_size {
                Some(limit) if input.len() > limit => {
                    self.rejected(DecodeError::RecordTooLarge { limit }, offset)
                }
                _ => Step::Fetch,
            },
            Ok(Scan::Record(bounds)) => {
                match self.assembler.assemble(input, &self.tokens, offset) {
                    ParseOutcome::Row(row) => Step::Row(row, bounds.consumed),
                    ParseOutcome::Skipped(err) => Step::Skip(err, Some(bounds.consumed)),
                    ParseOutcome::Failed(err) => Step::Fail(err),
                }
            }
            Err(cause) => self.rejected(cause, offset),
        }
    }

    /// A record that could not be tokenized.
    fn rejected(&self, cause: DecodeError, offset: u64) -> Step {
        match self.assembler.reject(cause, offset) {
            Ok(skipped) => Step::Skip(skipped, None),
            Err(fatal) => Step::Fail(fatal),
        }
    }

    async fn fetch(&mut self) -> Result<(), ReaderError> {
        let Some(source) = self.source.as_ref().map(Arc::clone) else {
            return Ok(());
        };

        // Grow geometrically so a record spanning many chunks costs linear time.
        let length = self.chunk_size.max(self.buffer.len());
        let n = self.buffer.fill(source.as_ref(), length).await?;
        self.stats.bytes_read += n as u64;

        if n > 0 {
            self.suspended = false;
            return Ok(());
        }

        match self.mode {
            ReadMode::Bounded => self.exhausted = true,
            ReadMode::Unbounded => {
                if !self.suspended {
                    debug!(
                        partition = self.partition.index,
                        offset = self.buffer.fetch_offset(),
                        "No more bytes available, waiting"
                    );
                    self.suspended = true;
                }
                trace!(partition = self.partition.index, "Polling for more bytes");
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        Ok(())
    }

    /// Release the buffer and the source handle.
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.buffer.release();
        self.source = None;
        self.tokens = Vec::new();
        debug!(
            partition = self.partition.index,
            rows = self.stats.rows,
            skipped = self.stats.skipped,
            bytes_read = self.stats.bytes_read,
            "Closing partition"
        );
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// Records skipped so far (lenient mode).
    pub fn errors(&self) -> &[ReadError] {
        &self.errors
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Absolute offset of the next unread record.
    pub fn position(&self) -> u64 {
        self.buffer.offset()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl std::fmt::Debug for PartitionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionReader")
            .field("partition", &self.partition)
            .field("mode", &self.mode)
            .field("position", &self.buffer.offset())
            .field("finished", &self.finished)
            .field("stats", &self.stats)
            .finish()
    }
}
