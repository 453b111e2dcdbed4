//! Row reader over a sequence of partitions.
//!
//! [`RowReader`] is what `open_bounded` and `open_unbounded` return: a
//! pull-style reader that drains its partitions one after another and
//! merges their statistics and skip diagnostics.

use std::collections::VecDeque;

use polars::prelude::DataFrame;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::convert::DataFrameBuilder;
use crate::error::{ReadError, ReaderError};
use crate::reader::filter::HeaderSkip;
use crate::reader::partition::{Partition, PartitionConfig, PartitionReader, ReadMode, ReadStats};
use crate::reader::value::TypedRow;
use crate::schema::CsvSchema;
use crate::source::SharedSource;

/// Streams typed rows from one or more partitions of a source.
///
/// Partitions are read in order. Within a partition rows come out in byte
/// order; no ordering across partitions is implied by the API, an engine
/// may equally open each partition on its own worker.
///
/// # Example
/// ```no_run
/// # async fn example(source: csvliner::CsvSource) -> Result<(), csvliner::ReaderError> {
/// let mut reader = source.open_bounded().await?;
/// while let Some(row) = reader.next_row().await? {
///     println!("{:?}", row);
/// }
/// println!("skipped {} records", reader.skipped_count());
/// # Ok(())
/// # }
/// ```
pub struct RowReader {
    source: SharedSource,
    config: PartitionConfig,
    pending: VecDeque<(Partition, HeaderSkip)>,
    current: Option<PartitionReader>,
    /// Totals of the partitions already drained.
    stats: ReadStats,
    errors: Vec<ReadError>,
    n_rows: Option<u64>,
    cancel: CancellationToken,
    finished: bool,
}

impl RowReader {
    /// Create a reader over `partitions`, each with its own header rule.
    ///
    /// The `header` field of `config` is replaced per partition.
    pub fn new(
        source: SharedSource,
        partitions: Vec<(Partition, HeaderSkip)>,
        config: PartitionConfig,
    ) -> Self {
        let n_rows = match config.mode {
            ReadMode::Bounded => config.options.n_rows.map(|n| n as u64),
            ReadMode::Unbounded => None,
        };
        Self {
            source,
            config,
            pending: partitions.into(),
            current: None,
            stats: ReadStats::default(),
            errors: Vec::new(),
            n_rows,
            cancel: CancellationToken::new(),
            finished: false,
        }
    }

    /// Next row, or `None` when every partition is exhausted or the reader
    /// was cancelled.
    ///
    /// In unbounded mode this waits for more bytes instead of returning
    /// `None`.
    ///
    /// # Errors
    /// The first fatal error of any partition. No rows are returned after
    /// an error.
    pub async fn next_row(&mut self) -> Result<Option<TypedRow>, ReaderError> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if self.n_rows.is_some_and(|limit| self.stats().rows >= limit) {
                self.close();
                return Ok(None);
            }

            if self.current.is_none() {
                let Some((partition, header)) = self.pending.pop_front() else {
                    self.close();
                    return Ok(None);
                };
                let mut config = self.config.clone();
                config.header = header;
                self.current = Some(PartitionReader::new(
                    self.source.clone(),
                    partition,
                    config,
                    self.cancel.child_token(),
                ));
            }
            let Some(reader) = self.current.as_mut() else {
                continue;
            };

            match reader.next_row().await {
                Ok(Some(row)) => return Ok(Some(row)),
                Ok(None) => {
                    self.retire_current();
                    if self.cancel.is_cancelled() {
                        self.close();
                    }
                }
                Err(e) => {
                    self.retire_current();
                    self.pending.clear();
                    self.finished = true;
                    return Err(e);
                }
            }
        }
    }

    /// Up to `max_rows` rows; an empty vector means the read is over.
    pub async fn next_batch(&mut self, max_rows: usize) -> Result<Vec<TypedRow>, ReaderError> {
        let mut rows = Vec::with_capacity(max_rows.min(1024));
        while rows.len() < max_rows {
            match self.next_row().await? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// Next DataFrame of up to `batch_size` rows (see `ReadOptions`).
    ///
    /// Returns `None` when the read is over.
    pub async fn next_dataframe(&mut self) -> Result<Option<DataFrame>, ReaderError> {
        let batch_size = self.config.options.batch_size;
        let mut builder = DataFrameBuilder::new(&self.output_schema(), batch_size);
        while !builder.is_batch_ready() {
            match self.next_row().await? {
                Some(row) => builder.push_row(row)?,
                None => break,
            }
        }
        Ok(builder.finish()?)
    }

    /// Drain the remaining rows into a single DataFrame.
    pub async fn collect_dataframe(&mut self) -> Result<Option<DataFrame>, ReaderError> {
        let mut builder = DataFrameBuilder::new(&self.output_schema(), usize::MAX);
        while let Some(row) = self.next_row().await? {
            builder.push_row(row)?;
        }
        Ok(builder.finish()?)
    }

    fn retire_current(&mut self) {
        if let Some(reader) = self.current.take() {
            self.stats += reader.stats();
            self.errors.extend_from_slice(reader.errors());
        }
    }

    fn close(&mut self) {
        if self.finished {
            return;
        }
        self.retire_current();
        self.pending.clear();
        self.finished = true;
        if self.config.mode == ReadMode::Bounded && !self.cancel.is_cancelled() {
            info!(
                rows = self.stats.rows,
                skipped = self.stats.skipped,
                comments = self.stats.comments,
                bytes_read = self.stats.bytes_read,
                "Read complete"
            );
        }
    }

    /// Schema of the rows this reader yields.
    pub fn output_schema(&self) -> CsvSchema {
        self.config.projection.output_schema(&self.config.schema)
    }

    /// Counters across all partitions read so far.
    pub fn stats(&self) -> ReadStats {
        let mut stats = self.stats;
        if let Some(reader) = &self.current {
            stats += reader.stats();
        }
        stats
    }

    /// Records skipped so far (lenient mode).
    pub fn errors(&self) -> Vec<ReadError> {
        let mut errors = self.errors.clone();
        if let Some(reader) = &self.current {
            errors.extend_from_slice(reader.errors());
        }
        errors
    }

    pub fn skipped_count(&self) -> u64 {
        self.stats().skipped
    }

    pub fn mode(&self) -> ReadMode {
        self.config.mode
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Token that stops this reader; cancelling it ends the read at the
    /// next record boundary or while waiting for bytes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the read and release the source.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.close();
    }
}

impl std::fmt::Debug for RowReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowReader")
            .field("mode", &self.config.mode)
            .field("current", &self.current)
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish()
    }
}
