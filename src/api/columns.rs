//! Column selection and projection planning.
//!
//! A projection selects (and possibly reorders) schema columns. The plan
//! keeps two views of it: the output order requested by the caller and the
//! ascending set of token positions that must actually be decoded.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::schema::CsvSchema;

/// Column selection by name or index.
///
/// # Example
/// ```
/// use csvliner::api::ColumnSelection;
///
/// let by_name = ColumnSelection::from_names(["id", "name"]);
/// let by_index = ColumnSelection::from_indices([2, 0]);
/// assert_eq!(by_name.len(), 2);
/// assert_eq!(by_index, ColumnSelection::Indices(vec![2, 0]));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnSelection {
    /// Select columns by name.
    Names(Vec<Arc<str>>),
    /// Select columns by 0-based index.
    Indices(Vec<usize>),
}

impl ColumnSelection {
    /// Create a column selection from names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    /// Create a column selection from indices.
    pub fn from_indices<I>(indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        Self::Indices(indices.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Names(names) => names.len(),
            Self::Indices(indices) => indices.len(),
        }
    }
}

/// Resolve a selection to indices into `schema`.
///
/// # Errors
/// - `ConfigError::UnknownColumn` if a name is not in the schema
/// - `ConfigError::ProjectionOutOfRange` if an index is out of range
pub fn resolve_columns(
    selection: &ColumnSelection,
    schema: &CsvSchema,
) -> Result<Vec<usize>, ConfigError> {
    match selection {
        ColumnSelection::Names(names) => names
            .iter()
            .map(|name| {
                schema
                    .index_of(name)
                    .ok_or_else(|| ConfigError::UnknownColumn {
                        name: name.to_string(),
                        available: schema.names().collect::<Vec<_>>().join(", "),
                    })
            })
            .collect(),
        ColumnSelection::Indices(indices) => {
            for &index in indices {
                check_index(index, schema.len())?;
            }
            Ok(indices.clone())
        }
    }
}

fn check_index(index: usize, len: usize) -> Result<(), ConfigError> {
    if index >= len {
        return Err(ConfigError::ProjectionOutOfRange { index, len });
    }
    Ok(())
}

/// Planned projection over a schema.
///
/// `columns` are original schema positions in output order, without
/// duplicates. `parse_positions` are the same positions in ascending order,
/// and `output_slots[i]` is where `parse_positions[i]` lands in the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectionPlan {
    columns: Arc<[usize]>,
    parse_positions: Arc<[usize]>,
    output_slots: Arc<[usize]>,
}

impl ProjectionPlan {
    /// Plan a projection of `schema` to `indices`.
    ///
    /// Output order follows `indices`; a repeated index keeps its first
    /// position.
    ///
    /// # Errors
    /// - `ConfigError::ProjectionOutOfRange` for an index outside the schema
    /// - `ConfigError::EmptyProjection` if `indices` is empty
    pub fn plan(schema: &CsvSchema, indices: &[usize]) -> Result<Self, ConfigError> {
        if indices.is_empty() {
            return Err(ConfigError::EmptyProjection);
        }

        let mut seen = HashSet::with_capacity(indices.len());
        let mut columns = Vec::with_capacity(indices.len());
        for &index in indices {
            check_index(index, schema.len())?;
            if seen.insert(index) {
                columns.push(index);
            }
        }

        let mut output_slots: Vec<usize> = (0..columns.len()).collect();
        output_slots.sort_unstable_by_key(|&slot| columns[slot]);
        let parse_positions: Vec<usize> = output_slots.iter().map(|&slot| columns[slot]).collect();

        Ok(Self {
            columns: columns.into(),
            parse_positions: parse_positions.into(),
            output_slots: output_slots.into(),
        })
    }

    /// All columns of `schema` in declared order.
    pub fn identity(schema: &CsvSchema) -> Self {
        let columns: Arc<[usize]> = (0..schema.len()).collect();
        Self {
            parse_positions: columns.clone(),
            output_slots: columns.clone(),
            columns,
        }
    }

    /// Project again, with `indices` relative to this plan's output.
    ///
    /// The new indices are mapped back to original schema positions, so a
    /// chain of projections never loses track of which columns it refers to.
    pub fn compose(&self, schema: &CsvSchema, indices: &[usize]) -> Result<Self, ConfigError> {
        let original = indices
            .iter()
            .map(|&i| {
                self.columns
                    .get(i)
                    .copied()
                    .ok_or(ConfigError::ProjectionOutOfRange {
                        index: i,
                        len: self.columns.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::plan(schema, &original)
    }

    /// Original schema positions in output order.
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Original schema positions that need decoding, ascending.
    pub fn parse_positions(&self) -> &[usize] {
        &self.parse_positions
    }

    /// Output position of each entry of [`parse_positions`](Self::parse_positions).
    pub fn output_slots(&self) -> &[usize] {
        &self.output_slots
    }

    /// Number of output columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether this selects every column in declared order.
    pub fn is_identity(&self, schema: &CsvSchema) -> bool {
        self.columns.len() == schema.len() && self.columns.iter().enumerate().all(|(i, &c)| i == c)
    }

    /// Schema of the projected rows.
    pub fn output_schema(&self, schema: &CsvSchema) -> CsvSchema {
        schema.select(&self.columns)
    }
}
