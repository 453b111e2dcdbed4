//! Comment and header filter.
//!
//! Runs at every record start, before the tokenizer is trusted with the
//! bytes that follow. Comment lines and the header line are dropped as whole
//! physical lines: they are never tokenized, so quotes inside them have no
//! effect.

use bytes::{Buf, BytesMut};

use crate::api::FormatConfig;
use crate::error::SourceError;
use crate::source::StreamSource;

/// Which line, if any, a partition drops as the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSkip {
    /// No header handling.
    Disabled,
    /// Drop the first non-comment line this partition sees.
    FirstLine,
    /// Drop the line starting at this absolute offset.
    At(u64),
}

/// What to do with the line at the current record start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    /// Hand the bytes to the tokenizer.
    Keep,
    /// Drop the line as a comment.
    DropComment,
    /// Drop the line as the header.
    DropHeader,
    /// Too few bytes buffered to decide.
    NeedMore,
}

/// Per-partition filter state.
#[derive(Debug, Clone)]
pub struct LineFilter {
    comment_prefix: Option<Vec<u8>>,
    header: HeaderSkip,
}

impl LineFilter {
    pub fn new(format: &FormatConfig, header: HeaderSkip) -> Self {
        Self {
            comment_prefix: format.comment_prefix().map(<[u8]>::to_vec),
            header,
        }
    }

    /// Whether a header line is still waiting to be dropped.
    pub fn header_pending(&self) -> bool {
        self.header != HeaderSkip::Disabled
    }

    /// Classify the line that starts at `input[0]`, absolute offset `offset`.
    ///
    /// Returning `DropHeader` consumes the header skip: it is reported at
    /// most once per filter.
    pub fn classify(&mut self, input: &[u8], offset: u64, at_eof: bool) -> LineAction {
        if let Some(prefix) = &self.comment_prefix {
            if input.starts_with(prefix) {
                return LineAction::DropComment;
            }
            if !at_eof && input.len() < prefix.len() && prefix.starts_with(input) {
                return LineAction::NeedMore;
            }
        }

        match self.header {
            HeaderSkip::Disabled => LineAction::Keep,
            HeaderSkip::At(at) if offset < at => LineAction::Keep,
            HeaderSkip::At(at) if offset > at => {
                // Past the header position without meeting it: not ours.
                self.header = HeaderSkip::Disabled;
                LineAction::Keep
            }
            HeaderSkip::FirstLine | HeaderSkip::At(_) => {
                if input.is_empty() && at_eof {
                    return LineAction::Keep;
                }
                self.header = HeaderSkip::Disabled;
                LineAction::DropHeader
            }
        }
    }
}

/// Absolute offset of the first non-comment line of a source.
///
/// Returns `None` if the source holds nothing but comment lines. Only the
/// comment lines at the start of the file are read.
pub async fn locate_first_line(
    source: &dyn StreamSource,
    format: &FormatConfig,
    chunk_size: usize,
) -> Result<Option<u64>, SourceError> {
    let Some(prefix) = format.comment_prefix() else {
        return Ok(if source.size().await? > 0 { Some(0) } else { None });
    };
    let row_delimiter = format.row_delimiter();

    let mut buf = BytesMut::new();
    let mut buf_offset = 0u64;
    let mut line_start = 0u64;
    let mut eof = false;

    loop {
        let rel = (line_start - buf_offset) as usize;
        let line = &buf[rel..];

        if !line.is_empty() || eof {
            if line.is_empty() {
                return Ok(None);
            }
            if !line.starts_with(prefix) {
                if line.len() >= prefix.len() || !prefix.starts_with(line) || eof {
                    return Ok(Some(line_start));
                }
            } else if let Some(end) = memchr::memmem::find(line, row_delimiter) {
                line_start += (end + row_delimiter.len()) as u64;
                continue;
            } else if eof {
                return Ok(None);
            }
        }

        buf.advance(rel);
        buf_offset = line_start;
        let fetch_at = buf_offset + buf.len() as u64;
        let bytes = source.read_range(fetch_at, chunk_size.max(1)).await?;
        if bytes.is_empty() {
            eof = true;
        }
        buf.extend_from_slice(&bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn run_async<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn test_comment_lines_dropped() {
        let format = FormatConfig::new().with_comment_prefix("#");
        let mut filter = LineFilter::new(&format, HeaderSkip::Disabled);
        assert_eq!(filter.classify(b"#comment\n", 0, false), LineAction::DropComment);
        assert_eq!(filter.classify(b"1,a\n", 9, false), LineAction::Keep);
    }

    #[test]
    fn test_comment_prefix_needs_more_bytes() {
        let format = FormatConfig::new().with_comment_prefix("--");
        let mut filter = LineFilter::new(&format, HeaderSkip::Disabled);
        assert_eq!(filter.classify(b"-", 0, false), LineAction::NeedMore);
        assert_eq!(filter.classify(b"", 0, false), LineAction::NeedMore);
        assert_eq!(filter.classify(b"-", 0, true), LineAction::Keep);
        assert_eq!(filter.classify(b"-1,a", 0, false), LineAction::Keep);
    }

    #[test]
    fn test_header_after_comments() {
        let format = FormatConfig::new().with_comment_prefix("#");
        let mut filter = LineFilter::new(&format, HeaderSkip::FirstLine);
        assert!(filter.header_pending());
        assert_eq!(filter.classify(b"#c\nid\n1\n", 0, false), LineAction::DropComment);
        assert_eq!(filter.classify(b"id\n1\n", 3, false), LineAction::DropHeader);
        assert!(!filter.header_pending());
        assert_eq!(filter.classify(b"1\n", 6, false), LineAction::Keep);
    }

    #[test]
    fn test_header_at_offset() {
        let format = FormatConfig::new();
        let mut filter = LineFilter::new(&format, HeaderSkip::At(10));
        assert_eq!(filter.classify(b"x\n", 4, false), LineAction::Keep);
        assert_eq!(filter.classify(b"id\n", 10, false), LineAction::DropHeader);
        assert_eq!(filter.classify(b"1\n", 13, false), LineAction::Keep);

        let mut filter = LineFilter::new(&format, HeaderSkip::At(10));
        assert_eq!(filter.classify(b"x\n", 12, false), LineAction::Keep);
        assert!(!filter.header_pending());
    }

    #[test]
    fn test_header_not_dropped_at_end_of_empty_input() {
        let mut filter = LineFilter::new(&FormatConfig::new(), HeaderSkip::FirstLine);
        assert_eq!(filter.classify(b"", 0, true), LineAction::Keep);
    }

    #[test]
    fn test_locate_first_line() {
        run_async(async {
            let format = FormatConfig::new().with_comment_prefix("#");
            let source = MemorySource::from("# one\n# two\nid,name\n1,a\n");
            assert_eq!(locate_first_line(&source, &format, 4).await.unwrap(), Some(12));

            let source = MemorySource::from("# only\n# comments");
            assert_eq!(locate_first_line(&source, &format, 3).await.unwrap(), None);

            let source = MemorySource::from("id\n");
            assert_eq!(locate_first_line(&source, &format, 3).await.unwrap(), Some(0));

            let no_comments = FormatConfig::new();
            assert_eq!(
                locate_first_line(&MemorySource::default(), &no_comments, 3).await.unwrap(),
                None
            );
        });
    }
}
