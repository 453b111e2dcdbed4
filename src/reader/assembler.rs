//! Row assembler.
//!
//! Turns one tokenized record into a [`TypedRow`] shaped by the projection,
//! and applies the failure policy. Shape failures (wrong field count) and
//! coercion failures are treated alike: fatal in strict mode, a skipped
//! record in lenient mode.

use crate::api::{ErrorMode, ProjectionPlan};
use crate::error::{DecodeError, ReadError, ReaderError};
use crate::reader::coerce::coerce;
use crate::reader::tokenizer::RawToken;
use crate::reader::value::TypedRow;
use crate::schema::CsvSchema;

/// Result of decoding one record.
#[derive(Debug)]
pub enum ParseOutcome {
    /// A decoded row.
    Row(TypedRow),
    /// The record was malformed and skipped (lenient mode).
    Skipped(ReadError),
    /// The record was malformed and the read must stop (strict mode).
    Failed(ReaderError),
}

/// Assembles typed rows for one partition.
#[derive(Debug, Clone)]
pub struct RowAssembler {
    schema: CsvSchema,
    projection: ProjectionPlan,
    quote: Option<u8>,
    error_mode: ErrorMode,
    partition: usize,
}

impl RowAssembler {
    pub fn new(
        schema: CsvSchema,
        projection: ProjectionPlan,
        quote: Option<u8>,
        error_mode: ErrorMode,
        partition: usize,
    ) -> Self {
        Self {
            schema,
            projection,
            quote,
            error_mode,
            partition,
        }
    }

    /// Decode the record whose fields are `tokens`, spans into `input`.
    ///
    /// `offset` is the absolute byte offset of the record start.
    pub fn assemble(&self, input: &[u8], tokens: &[RawToken], offset: u64) -> ParseOutcome {
        match self.decode(input, tokens) {
            Ok(row) => ParseOutcome::Row(row),
            Err(cause) => match self.reject(cause, offset) {
                Ok(skipped) => ParseOutcome::Skipped(skipped),
                Err(fatal) => ParseOutcome::Failed(fatal),
            },
        }
    }

    /// Apply the failure policy to a record that could not be decoded.
    ///
    /// Returns the skip diagnostic in lenient mode and the fatal error in
    /// strict mode.
    pub fn reject(&self, cause: DecodeError, offset: u64) -> Result<ReadError, ReaderError> {
        match self.error_mode {
            ErrorMode::Skip => Ok(ReadError::from_decode(&cause, self.partition, offset)),
            ErrorMode::Strict => Err(ReaderError::Decode {
                partition: self.partition,
                offset,
                cause,
            }),
        }
    }

    fn decode(&self, input: &[u8], tokens: &[RawToken]) -> Result<TypedRow, DecodeError> {
        if tokens.len() != self.schema.len() {
            return Err(DecodeError::FieldCount {
                expected: self.schema.len(),
                found: tokens.len(),
            });
        }

        // Only projected tokens are unescaped and coerced, left to right, so
        // the first bad field in the record is the one reported.
        let fields = self.schema.fields();
        let mut values = vec![None; self.projection.len()];
        let positions = self.projection.parse_positions();
        for (&column, &slot) in positions.iter().zip(self.projection.output_slots()) {
            let field = &fields[column];
            let bytes = tokens[column].decode(input, self.quote);
            let value = coerce(&bytes, field.field_type)
                .map_err(|e| e.into_decode(field, &bytes))?;
            values[slot] = Some(value);
        }
        Ok(TypedRow::new(values.into_iter().flatten().collect()))
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.error_mode
    }
}
