//! CSV format behavior tests.
//!
//! Quoting, delimiters, comments, headers and typed values, read through the
//! public API over in-memory sources.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use csvliner::{
    parse_schema, CsvSource, DecodeError, FormatConfig, MemorySource, ReadOptions, ReaderError,
    SharedSource, TypedRow, Value,
};

fn run_async<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

fn source(data: &str, schema: &str, format: FormatConfig) -> CsvSource {
    let bytes: SharedSource = Arc::new(MemorySource::from(data));
    CsvSource::new(bytes, parse_schema(schema).unwrap(), format).unwrap()
}

fn read_all(source: &CsvSource) -> Result<Vec<TypedRow>, ReaderError> {
    run_async(async {
        let mut reader = source.open_bounded().await?;
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    })
}

fn strings(rows: &[TypedRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|v| v.to_string()).collect())
        .collect()
}

const TWO_STRINGS: &str = r#"[{"name": "a", "type": "string"}, {"name": "b", "type": "string"}]"#;
const ONE_STRING: &str = r#"[{"name": "a", "type": "string"}]"#;

// =============================================================================
// Quoting
// =============================================================================

#[test]
fn test_quoted_field_with_delimiter() {
    let rows = read_all(&source("\"a,b\",c\n", TWO_STRINGS, FormatConfig::new().with_quote('"')))
        .unwrap();
    assert_eq!(strings(&rows), vec![vec!["a,b", "c"]]);
}

#[test]
fn test_doubled_quote_and_embedded_row_delimiter() {
    let data = "\"say \"\"hi\"\"\",\"two\nlines\"\nx,y\n";
    let rows = read_all(&source(data, TWO_STRINGS, FormatConfig::new().with_quote('"'))).unwrap();
    assert_eq!(
        strings(&rows),
        vec![vec!["say \"hi\"", "two\nlines"], vec!["x", "y"]]
    );
}

#[test]
fn test_quote_disabled_keeps_quote_bytes() {
    let rows = read_all(&source("\"a\",b\n", TWO_STRINGS, FormatConfig::new())).unwrap();
    assert_eq!(strings(&rows), vec![vec!["\"a\"", "b"]]);
}

#[test]
fn test_quoted_and_unquoted_empty_fields_match() {
    let rows = read_all(&source("\"\"\n\nx\n", ONE_STRING, FormatConfig::new().with_quote('"')))
        .unwrap();
    assert_eq!(strings(&rows), vec![vec![""], vec![""], vec!["x"]]);
}

#[test]
fn test_unterminated_quote_is_fatal_in_strict_mode() {
    let err = read_all(&source("a,b\n\"c,d\n", TWO_STRINGS, FormatConfig::new().with_quote('"')))
        .unwrap_err();
    assert_eq!(err.offset(), Some(4));
    assert!(matches!(
        err,
        ReaderError::Decode {
            cause: DecodeError::UnterminatedQuote,
            ..
        }
    ));
}

#[test]
fn test_quote_inside_unquoted_field() {
    let err = read_all(&source("ab\"c,d\n", TWO_STRINGS, FormatConfig::new().with_quote('"')))
        .unwrap_err();
    assert!(matches!(
        err,
        ReaderError::Decode {
            cause: DecodeError::MalformedQuote { .. },
            ..
        }
    ));
}

// =============================================================================
// Delimiters
// =============================================================================

#[test]
fn test_multi_byte_delimiters() {
    let format = FormatConfig::new()
        .with_field_delimiter("||")
        .with_row_delimiter("\r\n");
    let rows = read_all(&source("a|b||c\r\nd||e\r\n", TWO_STRINGS, format)).unwrap();
    assert_eq!(strings(&rows), vec![vec!["a|b", "c"], vec!["d", "e"]]);
}

#[test]
fn test_rfc4180_crlf() {
    let rows = read_all(&source(
        "x,\"1\r\n2\"\r\ny,z\r\n",
        TWO_STRINGS,
        FormatConfig::rfc4180(),
    ))
    .unwrap();
    assert_eq!(strings(&rows), vec![vec!["x", "1\r\n2"], vec!["y", "z"]]);
}

#[test]
fn test_last_record_without_row_delimiter() {
    let rows = read_all(&source("a,b\nc,d", TWO_STRINGS, FormatConfig::new())).unwrap();
    assert_eq!(strings(&rows), vec![vec!["a", "b"], vec!["c", "d"]]);
}

#[test]
fn test_small_chunks_split_records() {
    let data = "first,\"quoted, value\"\nsecond,plain\n";
    let source = source(data, TWO_STRINGS, FormatConfig::new().with_quote('"'))
        .with_options(ReadOptions::new().with_read_chunk_size(3))
        .unwrap();
    let rows = read_all(&source).unwrap();
    assert_eq!(
        strings(&rows),
        vec![vec!["first", "quoted, value"], vec!["second", "plain"]]
    );
}

// =============================================================================
// Comments, header and blank lines
// =============================================================================

#[test]
fn test_comment_not_counted_as_header() {
    let format = FormatConfig::new()
        .with_comment_prefix("#")
        .with_skip_first_line(true);
    let rows = read_all(&source("#comment\na,b\n1,2\n", TWO_STRINGS, format)).unwrap();
    assert_eq!(strings(&rows), vec![vec!["1", "2"]]);
}

#[test]
fn test_multi_byte_comment_prefix() {
    let format = FormatConfig::new().with_comment_prefix("--");
    let rows = read_all(&source("--x\n-y,z\n--\n", TWO_STRINGS, format)).unwrap();
    assert_eq!(strings(&rows), vec![vec!["-y", "z"]]);
}

#[test]
fn test_comment_line_ignores_quotes() {
    let format = FormatConfig::new().with_quote('"').with_comment_prefix("#");
    let rows = read_all(&source("# don't \" open\na,b\n", TWO_STRINGS, format)).unwrap();
    assert_eq!(strings(&rows), vec![vec!["a", "b"]]);
}

#[test]
fn test_header_only_file() {
    let format = FormatConfig::new().with_skip_first_line(true);
    assert!(read_all(&source("a,b\n", TWO_STRINGS, format.clone())).unwrap().is_empty());
    assert!(read_all(&source("", TWO_STRINGS, format)).unwrap().is_empty());
}

#[test]
fn test_blank_line_fails_wider_schema() {
    let err = read_all(&source("a,b\n\nc,d\n", TWO_STRINGS, FormatConfig::new())).unwrap_err();
    assert_eq!(err.offset(), Some(4));
    assert!(matches!(
        err,
        ReaderError::Decode {
            cause: DecodeError::FieldCount {
                expected: 2,
                found: 1
            },
            ..
        }
    ));

    let rows = read_all(&source(
        "a,b\n\nc,d\n",
        TWO_STRINGS,
        FormatConfig::new().lenient(),
    ))
    .unwrap();
    assert_eq!(strings(&rows), vec![vec!["a", "b"], vec!["c", "d"]]);
}

#[test]
fn test_blank_line_is_empty_row_for_one_column() {
    let rows = read_all(&source("a\n\nb\n", ONE_STRING, FormatConfig::new())).unwrap();
    assert_eq!(strings(&rows), vec![vec!["a"], vec![""], vec!["b"]]);
}

// =============================================================================
// Typed values
// =============================================================================

#[test]
fn test_all_scalar_types() {
    let schema = r#"{"fields": [
        {"name": "flag", "type": "bool"},
        {"name": "small", "type": "int8"},
        {"name": "big", "type": "uint64"},
        {"name": "ratio", "type": "double"},
        {"name": "day", "type": "date"},
        {"name": "at", "type": "time"},
        {"name": "ts", "type": "timestamp"},
        {"name": "tz", "type": "timestamptz"}
    ]}"#;
    let data = "TRUE,-128,18446744073709551615,1e-3,2024-02-29,23:59:59.5,2024-01-02T03:04:05,2024-01-02T03:04:05+02:00\n";
    let rows = read_all(&source(data, schema, FormatConfig::new())).unwrap();

    let row = &rows[0];
    assert_eq!(row[0], Value::Boolean(true));
    assert_eq!(row[1], Value::Int8(-128));
    assert_eq!(row[2], Value::UInt64(u64::MAX));
    assert_eq!(row[3].as_f64(), Some(0.001));
    assert_eq!(row[4].as_date(), NaiveDate::from_ymd_opt(2024, 2, 29));
    assert_eq!(
        row[5].as_time(),
        NaiveTime::from_hms_milli_opt(23, 59, 59, 500)
    );
    assert_eq!(row[6].to_string(), "2024-01-02T03:04:05");
    assert_eq!(
        row[7].as_timestamp_tz().map(|t| t.timestamp()),
        Some(1_704_157_445)
    );
}

#[test]
fn test_out_of_range_integer_fails() {
    let schema = r#"[{"name": "n", "type": "int8"}]"#;
    let err = read_all(&source("127\n128\n", schema, FormatConfig::new())).unwrap_err();
    assert_eq!(err.offset(), Some(4));
}

#[test]
fn test_empty_token_for_number_fails() {
    let schema = r#"[{"name": "n", "type": "int32"}, {"name": "s", "type": "string"}]"#;
    let err = read_all(&source(",x\n", schema, FormatConfig::new())).unwrap_err();
    assert!(matches!(
        err,
        ReaderError::Decode {
            cause: DecodeError::Coercion { .. },
            ..
        }
    ));

    // An empty string column is fine.
    let rows = read_all(&source("1,\n", schema, FormatConfig::new())).unwrap();
    assert_eq!(rows[0][1], Value::String(String::new()));
}
