//! Source facade.
//!
//! [`CsvSource`] binds a location, a schema, a format and a projection into
//! one immutable definition. Every `open_*` call starts a fresh read, so a
//! definition can be opened any number of times.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::columns::{resolve_columns, ColumnSelection, ProjectionPlan};
use crate::api::options::{FormatConfig, ReadOptions};
use crate::error::{ConfigError, ReaderError, SourceError};
use crate::reader::{
    locate_first_line, plan_record_partitions, HeaderSkip, Partition, PartitionConfig,
    PartitionReader, ReadMode, RowReader,
};
use crate::schema::{CsvSchema, FieldType};
use crate::source::{LocalSource, SharedSource};

/// Where the bytes of a source come from.
#[derive(Clone)]
pub enum SourceLocation {
    /// A local file, opened anew by every read.
    Path(PathBuf),
    /// An already resolved byte source.
    Source(SharedSource),
}

impl SourceLocation {
    async fn resolve(&self) -> Result<SharedSource, SourceError> {
        match self {
            SourceLocation::Path(path) => Ok(Arc::new(LocalSource::open(path).await?)),
            SourceLocation::Source(source) => Ok(source.clone()),
        }
    }
}

impl std::fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLocation::Path(path) => f.debug_tuple("Path").field(path).finish(),
            SourceLocation::Source(_) => f.write_str("Source(..)"),
        }
    }
}

impl From<PathBuf> for SourceLocation {
    fn from(path: PathBuf) -> Self {
        SourceLocation::Path(path)
    }
}

impl From<&Path> for SourceLocation {
    fn from(path: &Path) -> Self {
        SourceLocation::Path(path.to_path_buf())
    }
}

impl From<&str> for SourceLocation {
    fn from(path: &str) -> Self {
        SourceLocation::Path(PathBuf::from(path))
    }
}

impl From<SharedSource> for SourceLocation {
    fn from(source: SharedSource) -> Self {
        SourceLocation::Source(source)
    }
}

/// A schema-typed CSV source.
///
/// # Example
/// ```no_run
/// use csvliner::{CsvSource, FieldType, FormatConfig};
///
/// # async fn example() -> Result<(), csvliner::ReaderError> {
/// let source = CsvSource::with_fields(
///     "people.csv",
///     ["id", "name"],
///     vec![FieldType::Int32, FieldType::String],
///     FormatConfig::new().with_skip_first_line(true),
/// )?;
///
/// let mut reader = source.with_projection(&[1])?.open_bounded().await?;
/// while let Some(row) = reader.next_row().await? {
///     println!("{}", row[0]);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    location: SourceLocation,
    schema: CsvSchema,
    format: FormatConfig,
    projection: ProjectionPlan,
    options: ReadOptions,
}

impl CsvSource {
    /// Create a source over `location` reading every schema column.
    ///
    /// # Errors
    /// Returns `ConfigError` if the format is invalid.
    pub fn new(
        location: impl Into<SourceLocation>,
        schema: CsvSchema,
        format: FormatConfig,
    ) -> Result<Self, ConfigError> {
        format.validate()?;
        Ok(Self {
            location: location.into(),
            projection: ProjectionPlan::identity(&schema),
            schema,
            format,
            options: ReadOptions::default(),
        })
    }

    /// Create a source over a local file.
    pub fn from_path(
        path: impl AsRef<Path>,
        schema: CsvSchema,
        format: FormatConfig,
    ) -> Result<Self, ConfigError> {
        Self::new(path.as_ref(), schema, format)
    }

    /// Create a source from parallel field name and type lists.
    ///
    /// # Errors
    /// `ConfigError::SchemaLengthMismatch` if the lists differ in length,
    /// plus any schema or format error.
    pub fn with_fields<N, S>(
        location: impl Into<SourceLocation>,
        names: N,
        types: Vec<FieldType>,
        format: FormatConfig,
    ) -> Result<Self, ConfigError>
    where
        N: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self::new(location, CsvSchema::new(names, types)?, format)
    }

    /// Copy of this source with different read options.
    pub fn with_options(&self, options: ReadOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            options,
            ..self.clone()
        })
    }

    /// Copy of this source projected to `indices`.
    ///
    /// Indices refer to the columns of [`output_schema`](Self::output_schema),
    /// so projecting twice narrows the first projection. `self` is left
    /// unchanged.
    ///
    /// # Errors
    /// `ConfigError::ProjectionOutOfRange` for an index outside the current
    /// output schema, `ConfigError::EmptyProjection` for an empty list.
    pub fn with_projection(&self, indices: &[usize]) -> Result<Self, ConfigError> {
        let projection = self.projection.compose(&self.schema, indices)?;
        Ok(Self {
            projection,
            ..self.clone()
        })
    }

    /// Copy of this source projected by column name or index.
    pub fn with_projected_columns(&self, columns: &ColumnSelection) -> Result<Self, ConfigError> {
        let indices = resolve_columns(columns, &self.output_schema())?;
        self.with_projection(&indices)
    }

    /// Full declared schema.
    pub fn schema(&self) -> &CsvSchema {
        &self.schema
    }

    /// Schema of the rows produced by this source.
    pub fn output_schema(&self) -> CsvSchema {
        self.projection.output_schema(&self.schema)
    }

    pub fn projection(&self) -> &ProjectionPlan {
        &self.projection
    }

    pub fn format(&self) -> &FormatConfig {
        &self.format
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Partition plan for a bounded read of the source as it is now.
    ///
    /// Boundaries fall on line starts, never inside a quoted field.
    pub async fn partitions(&self) -> Result<Vec<Partition>, ReaderError> {
        let source = self.location.resolve().await?;
        Ok(plan_record_partitions(source.as_ref(), &self.format, &self.options).await?)
    }

    /// Open a reader for a single partition.
    ///
    /// Lets an engine run the partitions of [`partitions`](Self::partitions)
    /// on its own workers; the header line is dropped only by the partition
    /// that owns it.
    pub async fn open_partition(
        &self,
        partition: Partition,
        mode: ReadMode,
    ) -> Result<PartitionReader, ReaderError> {
        let source = self.location.resolve().await?;
        let header = if partition.start == 0 && partition.end.is_none() {
            self.whole_source_header()
        } else {
            self.header_owner(&source).await?.for_partition(&partition)
        };
        let mut config = self.partition_config(mode);
        config.header = header;
        Ok(PartitionReader::new(
            source,
            partition,
            config,
            CancellationToken::new(),
        ))
    }

    /// Read the source as it is now, to the end.
    ///
    /// The file is split according to `ReadOptions::target_partitions`; the
    /// partitions are drained one after another.
    pub async fn open_bounded(&self) -> Result<RowReader, ReaderError> {
        let source = self.location.resolve().await?;
        let partitions =
            plan_record_partitions(source.as_ref(), &self.format, &self.options).await?;

        let plan = if partitions.len() == 1 {
            let header = self.whole_source_header();
            partitions.into_iter().map(|p| (p, header)).collect()
        } else {
            let owner = self.header_owner(&source).await?;
            partitions
                .into_iter()
                .map(|p| (p, owner.for_partition(&p)))
                .collect::<Vec<_>>()
        };

        debug!(
            partitions = plan.len(),
            columns = self.projection.len(),
            projected = !self.projection.is_identity(&self.schema),
            "Opening bounded read"
        );
        Ok(RowReader::new(
            source,
            plan,
            self.partition_config(ReadMode::Bounded),
        ))
    }

    /// Tail the source from its first byte.
    ///
    /// The reader never reaches an end on its own: when no more bytes are
    /// available it waits for the source to grow. Stop it through its
    /// cancellation token.
    pub async fn open_unbounded(&self) -> Result<RowReader, ReaderError> {
        let source = self.location.resolve().await?;
        debug!(
            columns = self.projection.len(),
            projected = !self.projection.is_identity(&self.schema),
            "Opening unbounded read"
        );
        Ok(RowReader::new(
            source,
            vec![(Partition::whole(), self.whole_source_header())],
            self.partition_config(ReadMode::Unbounded),
        ))
    }

    fn partition_config(&self, mode: ReadMode) -> PartitionConfig {
        PartitionConfig {
            schema: self.schema.clone(),
            projection: self.projection.clone(),
            format: self.format.clone(),
            options: self.options.clone(),
            header: HeaderSkip::Disabled,
            mode,
        }
    }

    fn whole_source_header(&self) -> HeaderSkip {
        if self.format.skip_first_line() {
            HeaderSkip::FirstLine
        } else {
            HeaderSkip::Disabled
        }
    }

    async fn header_owner(&self, source: &SharedSource) -> Result<HeaderOwner, SourceError> {
        if !self.format.skip_first_line() {
            return Ok(HeaderOwner(None));
        }
        let at = locate_first_line(
            source.as_ref(),
            &self.format,
            self.options.read_chunk_size,
        )
        .await?;
        Ok(HeaderOwner(at))
    }
}

/// Offset of the header line, when there is one to drop.
struct HeaderOwner(Option<u64>);

impl HeaderOwner {
    fn for_partition(&self, partition: &Partition) -> HeaderSkip {
        match self.0 {
            Some(at) if partition.owns(at) => HeaderSkip::At(at),
            _ => HeaderSkip::Disabled,
        }
    }
}
