//! Record encoder.
//!
//! Writes fields back out in a [`FormatConfig`], quoting a field only when it
//! could not be read back otherwise.

use crate::api::FormatConfig;
use crate::reader::value::TypedRow;

/// Append one record, including its row delimiter, to `out`.
///
/// A field is quoted when it contains a delimiter or the quote character,
/// when it ends with the start of a delimiter, or when it would make the
/// line look like a comment; embedded quotes are doubled. Without a configured quote such fields are written as-is and
/// will not read back the same.
///
/// # Example
/// ```
/// use csvliner::api::FormatConfig;
/// use csvliner::reader::write_record;
///
/// let mut out = Vec::new();
/// write_record(["a,b", "c"], &FormatConfig::new().with_quote('"'), &mut out);
/// assert_eq!(out, b"\"a,b\",c\n");
/// ```
pub fn write_record<I, F>(fields: I, format: &FormatConfig, out: &mut Vec<u8>)
where
    I: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let quote = format.quote_byte();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(format.field_delimiter());
        }
        write_field(field.as_ref(), i == 0, format, quote, out);
    }
    out.extend_from_slice(format.row_delimiter());
}

/// Append a typed row, rendering each value in its canonical text form.
pub fn write_row(row: &TypedRow, format: &FormatConfig, out: &mut Vec<u8>) {
    write_record(row.iter().map(|v| v.to_string()), format, out)
}

fn write_field(
    field: &[u8],
    first: bool,
    format: &FormatConfig,
    quote: Option<u8>,
    out: &mut Vec<u8>,
) {
    let Some(q) = quote else {
        out.extend_from_slice(field);
        return;
    };

    let needs_quotes = field.contains(&q)
        || [format.field_delimiter(), format.row_delimiter()]
            .into_iter()
            .any(|d| contains(field, d) || ends_with_partial(field, d))
        || (first && format.comment_prefix().is_some_and(|p| field.starts_with(p)));

    if !needs_quotes {
        out.extend_from_slice(field);
        return;
    }

    out.push(q);
    for &b in field {
        if b == q {
            out.push(q);
        }
        out.push(b);
    }
    out.push(q);
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    memchr::memmem::find(haystack, needle).is_some()
}

/// Whether `field` ends with a proper prefix of `delimiter`, which would
/// join with the delimiter written after it.
fn ends_with_partial(field: &[u8], delimiter: &[u8]) -> bool {
    (1..delimiter.len()).any(|n| field.ends_with(&delimiter[..n]))
}
