//! Record and field tokenizer.
//!
//! Splits a byte buffer into records and fields without copying or decoding
//! anything. Each field is reported as a [`RawToken`], a span into the input
//! plus quoting flags; unescaping happens later and only for the columns
//! that are actually projected.
//!
//! The tokenizer is resumable: when the buffer ends in the middle of a
//! record it reports [`Scan::Incomplete`] and the caller re-runs it from the
//! same record start once more bytes are available. At end of input a final
//! record without a trailing row delimiter is accepted.
//!
//! Quoting follows RFC 4180: a field that begins with the quote character
//! runs to the matching closing quote, delimiters inside it are literal and
//! a doubled quote stands for one quote character.

use std::borrow::Cow;

use memchr::{memchr, memchr2, memchr3};

use crate::api::FormatConfig;
use crate::error::DecodeError;

/// A single field of a record, as a span into the scanned input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawToken {
    /// First byte of the field content (after the opening quote, if any).
    pub start: usize,
    /// One past the last byte of the field content (before the closing quote).
    pub end: usize,
    /// Whether the field was enclosed in quotes.
    pub quoted: bool,
    /// Whether the content contains doubled quotes that need unescaping.
    pub escaped: bool,
}

impl RawToken {
    /// Length of the raw content in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Raw content bytes, quote escapes still in place.
    pub fn raw<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.start..self.end]
    }

    /// Field content with doubled quotes collapsed.
    ///
    /// Borrows from `input` unless unescaping is needed.
    pub fn decode<'a>(&self, input: &'a [u8], quote: Option<u8>) -> Cow<'a, [u8]> {
        let raw = self.raw(input);
        match quote {
            Some(q) if self.escaped => Cow::Owned(unescape(raw, q)),
            _ => Cow::Borrowed(raw),
        }
    }
}

fn unescape(raw: &[u8], quote: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(i) = memchr(quote, rest) {
        // Inside a closed quoted field every quote is the first of a pair.
        out.extend_from_slice(&rest[..=i]);
        rest = rest.get(i + 2..).unwrap_or_default();
    }
    out.extend_from_slice(rest);
    out
}

/// Bounds of a complete record within the scanned input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordBounds {
    /// Bytes belonging to the record, excluding the row delimiter.
    pub content_len: usize,
    /// Bytes to consume, including the row delimiter if one was present.
    pub consumed: usize,
}

/// Result of scanning for the next record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// A complete record; its fields were written to the token buffer.
    Record(RecordBounds),
    /// The input ends inside a record and more bytes may follow.
    Incomplete,
    /// No input left at end of data.
    End,
}

/// Delimiter found at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Field(usize),
    Row(usize),
    /// The remaining input is a proper prefix of a delimiter.
    Partial,
    None,
}

/// Splits bytes into records and fields for a fixed format.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    field_delimiter: Vec<u8>,
    row_delimiter: Vec<u8>,
    quote: Option<u8>,
}

impl Tokenizer {
    /// Create a tokenizer for a validated format.
    pub fn new(format: &FormatConfig) -> Self {
        Self {
            field_delimiter: format.field_delimiter().to_vec(),
            row_delimiter: format.row_delimiter().to_vec(),
            quote: format.quote_byte(),
        }
    }

    pub fn quote(&self) -> Option<u8> {
        self.quote
    }

    pub fn row_delimiter(&self) -> &[u8] {
        &self.row_delimiter
    }

    /// Scan the next record at the start of `input`.
    ///
    /// Field spans are written to `tokens` (cleared first) and are relative
    /// to `input`. With `at_eof` false, a record is only reported once its
    /// row delimiter has been seen.
    ///
    /// # Errors
    /// - `DecodeError::UnterminatedQuote` if a quoted field is still open at end of data
    /// - `DecodeError::MalformedQuote` if a quote appears inside an unquoted field
    /// - `DecodeError::TrailingAfterQuote` if a closing quote is not followed by a delimiter
    pub fn next_record(
        &self,
        input: &[u8],
        at_eof: bool,
        tokens: &mut Vec<RawToken>,
    ) -> Result<Scan, DecodeError> {
        tokens.clear();
        if input.is_empty() {
            return Ok(if at_eof { Scan::End } else { Scan::Incomplete });
        }

        let mut pos = 0;
        loop {
            let quoted = matches!(self.quote, Some(q) if input.get(pos) == Some(&q));

            if quoted {
                let (token, after) = match self.scan_quoted(input, pos, at_eof)? {
                    Some(found) => found,
                    None => return Ok(Scan::Incomplete),
                };
                tokens.push(token);
                pos = after;

                match self.delimiter_at(input, pos, at_eof) {
                    Delimiter::Field(n) => pos += n,
                    Delimiter::Row(n) => return Ok(record(pos, pos + n)),
                    Delimiter::Partial => return Ok(Scan::Incomplete),
                    Delimiter::None if pos == input.len() => return Ok(record(pos, pos)),
                    Delimiter::None => {
                        return Err(DecodeError::TrailingAfterQuote {
                            position: pos,
                            byte: input[pos],
                        })
                    }
                }
                continue;
            }

            let field_start = pos;
            let mut i = pos;
            loop {
                let candidate = match self.next_candidate(&input[i..]) {
                    Some(offset) => i + offset,
                    None if at_eof => {
                        tokens.push(unquoted(field_start, input.len()));
                        return Ok(record(input.len(), input.len()));
                    }
                    None => return Ok(Scan::Incomplete),
                };

                if self.quote == Some(input[candidate]) {
                    return Err(DecodeError::MalformedQuote {
                        position: candidate,
                    });
                }

                match self.delimiter_at(input, candidate, at_eof) {
                    Delimiter::Field(n) => {
                        tokens.push(unquoted(field_start, candidate));
                        pos = candidate + n;
                        break;
                    }
                    Delimiter::Row(n) => {
                        tokens.push(unquoted(field_start, candidate));
                        return Ok(record(candidate, candidate + n));
                    }
                    Delimiter::Partial => return Ok(Scan::Incomplete),
                    Delimiter::None => i = candidate + 1,
                }
            }
        }
    }

    /// Scan a quoted field whose opening quote is at `pos`.
    ///
    /// Returns the token and the position just past the closing quote, or
    /// `None` if more input is needed to find the closing quote.
    fn scan_quoted(
        &self,
        input: &[u8],
        pos: usize,
        at_eof: bool,
    ) -> Result<Option<(RawToken, usize)>, DecodeError> {
        let Some(q) = self.quote else {
            return Ok(None);
        };

        let content_start = pos + 1;
        let mut escaped = false;
        let mut i = content_start;
        loop {
            let Some(offset) = memchr(q, &input[i..]) else {
                return if at_eof {
                    Err(DecodeError::UnterminatedQuote)
                } else {
                    Ok(None)
                };
            };
            let quote_at = i + offset;

            match input.get(quote_at + 1) {
                Some(&next) if next == q => {
                    escaped = true;
                    i = quote_at + 2;
                }
                // The byte after this quote decides between "" and a closing quote.
                None if !at_eof => return Ok(None),
                _ => {
                    let token = RawToken {
                        start: content_start,
                        end: quote_at,
                        quoted: true,
                        escaped,
                    };
                    return Ok(Some((token, quote_at + 1)));
                }
            }
        }
    }

    /// Offset of the next byte that may start a delimiter or is a quote.
    #[inline]
    fn next_candidate(&self, haystack: &[u8]) -> Option<usize> {
        let f = self.field_delimiter[0];
        let r = self.row_delimiter[0];
        match self.quote {
            Some(q) => memchr3(f, r, q, haystack),
            None => memchr2(f, r, haystack),
        }
    }

    /// Match a delimiter at `pos`, longest delimiter first.
    #[inline]
    fn delimiter_at(&self, input: &[u8], pos: usize, at_eof: bool) -> Delimiter {
        let rest = &input[pos..];
        let (first, second) = if self.row_delimiter.len() >= self.field_delimiter.len() {
            (
                (&self.row_delimiter, Delimiter::Row(self.row_delimiter.len())),
                (&self.field_delimiter, Delimiter::Field(self.field_delimiter.len())),
            )
        } else {
            (
                (&self.field_delimiter, Delimiter::Field(self.field_delimiter.len())),
                (&self.row_delimiter, Delimiter::Row(self.row_delimiter.len())),
            )
        };

        for (delimiter, kind) in [first, second] {
            if rest.starts_with(delimiter) {
                return kind;
            }
            if !at_eof && rest.len() < delimiter.len() && delimiter.starts_with(rest) {
                return Delimiter::Partial;
            }
        }
        Delimiter::None
    }

    /// Length up to and including the next row delimiter, ignoring quotes.
    ///
    /// Used to drop whole physical lines (comments, headers, resync after a
    /// malformed record).
    pub fn find_line_end(&self, input: &[u8]) -> Option<usize> {
        memchr::memmem::find(input, &self.row_delimiter).map(|i| i + self.row_delimiter.len())
    }
}

#[inline]
fn unquoted(start: usize, end: usize) -> RawToken {
    RawToken {
        start,
        end,
        quoted: false,
        escaped: false,
    }
}

#[inline]
fn record(content_len: usize, consumed: usize) -> Scan {
    Scan::Record(RecordBounds {
        content_len,
        consumed,
    })
}
