//! Type coercion engine.
//!
//! Converts the decoded bytes of one field into a [`Value`] of its declared
//! type. Every type has a single textual grammar:
//!
//! | Type | Grammar |
//! |------|---------|
//! | `string` | any UTF-8, verbatim |
//! | `boolean` | `true` / `false`, case-insensitive |
//! | integers | optional sign, decimal digits, within the width's range |
//! | floats | decimal or exponent notation, `inf`, `infinity`, `nan` |
//! | `date` | `YYYY-MM-DD` |
//! | `time` | `HH:MM:SS` with an optional `.f` fraction of 1 to 9 digits |
//! | `timestamp` | `YYYY-MM-DDTHH:MM:SS[.f]` |
//! | `timestamptz` | RFC 3339, e.g. `2024-01-02T03:04:05+01:00` |
//!
//! An empty token is a failure for every type except `string`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::error::DecodeError;
use crate::reader::value::Value;
use crate::schema::{Field, FieldType};

/// Why a token could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("empty value")]
    Empty,
    #[error("invalid UTF-8")]
    InvalidUtf8,
    #[error("{0}")]
    Invalid(String),
}

impl CoercionError {
    /// Attach the column and token this failure happened on.
    pub fn into_decode(self, field: &Field, token: &[u8]) -> DecodeError {
        match self {
            CoercionError::InvalidUtf8 => DecodeError::InvalidUtf8 {
                column: field.name.to_string(),
            },
            other => DecodeError::Coercion {
                column: field.name.to_string(),
                field_type: field.field_type.name().to_string(),
                token: String::from_utf8_lossy(token).into_owned(),
                message: other.to_string(),
            },
        }
    }
}

/// Coerce one field's bytes to `field_type`.
///
/// # Example
/// ```
/// use csvliner::reader::{coerce, Value};
/// use csvliner::schema::FieldType;
///
/// assert_eq!(coerce(b"-42", FieldType::Int16).unwrap(), Value::Int16(-42));
/// assert!(coerce(b"12x", FieldType::Int64).is_err());
/// ```
pub fn coerce(bytes: &[u8], field_type: FieldType) -> Result<Value, CoercionError> {
    let text = std::str::from_utf8(bytes).map_err(|_| CoercionError::InvalidUtf8)?;
    if text.is_empty() && field_type != FieldType::String {
        return Err(CoercionError::Empty);
    }

    let value = match field_type {
        FieldType::String => Value::String(text.to_owned()),
        FieldType::Boolean => Value::Boolean(parse_bool(text)?),
        FieldType::Int8 => Value::Int8(parse_number(text)?),
        FieldType::Int16 => Value::Int16(parse_number(text)?),
        FieldType::Int32 => Value::Int32(parse_number(text)?),
        FieldType::Int64 => Value::Int64(parse_number(text)?),
        FieldType::UInt8 => Value::UInt8(parse_number(text)?),
        FieldType::UInt16 => Value::UInt16(parse_number(text)?),
        FieldType::UInt32 => Value::UInt32(parse_number(text)?),
        FieldType::UInt64 => Value::UInt64(parse_number(text)?),
        FieldType::Float32 => {
            let v: f32 = parse_number(text)?;
            check_finite(text, v.is_infinite())?;
            Value::Float32(v)
        }
        FieldType::Float64 => {
            let v: f64 = parse_number(text)?;
            check_finite(text, v.is_infinite())?;
            Value::Float64(v)
        }
        FieldType::Date => Value::Date(parse_date(text)?),
        FieldType::Time => Value::Time(parse_time(text)?),
        FieldType::Timestamp => Value::Timestamp(parse_timestamp(text)?),
        FieldType::TimestampTz => Value::TimestampTz(
            DateTime::parse_from_rfc3339(text)
                .map_err(|e| CoercionError::Invalid(e.to_string()))?,
        ),
    };
    Ok(value)
}

fn parse_bool(text: &str) -> Result<bool, CoercionError> {
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(CoercionError::Invalid("expected 'true' or 'false'".to_string()))
    }
}

fn parse_number<T>(text: &str) -> Result<T, CoercionError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    text.parse::<T>()
        .map_err(|e| CoercionError::Invalid(e.to_string()))
}

/// Reject values that only became infinite by overflowing the float width.
fn check_finite(text: &str, infinite: bool) -> Result<(), CoercionError> {
    if !infinite {
        return Ok(());
    }
    let unsigned = text.trim_start_matches(['+', '-']);
    if unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity") {
        Ok(())
    } else {
        Err(CoercionError::Invalid("number out of range".to_string()))
    }
}

/// Fixed-width run of ASCII digits.
fn digits(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(
        bytes
            .iter()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0')),
    )
}

fn invalid(expected: &str) -> CoercionError {
    CoercionError::Invalid(format!("expected {}", expected))
}

fn parse_date(text: &str) -> Result<NaiveDate, CoercionError> {
    const SHAPE: &str = "YYYY-MM-DD";
    let b = text.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return Err(invalid(SHAPE));
    }
    let (Some(year), Some(month), Some(day)) = (digits(&b[0..4]), digits(&b[5..7]), digits(&b[8..10]))
    else {
        return Err(invalid(SHAPE));
    };
    NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| CoercionError::Invalid("date out of range".to_string()))
}

fn parse_time(text: &str) -> Result<NaiveTime, CoercionError> {
    const SHAPE: &str = "HH:MM:SS[.fffffffff]";
    let b = text.as_bytes();
    if b.len() < 8 || b[2] != b':' || b[5] != b':' {
        return Err(invalid(SHAPE));
    }
    let (Some(hour), Some(min), Some(sec)) = (digits(&b[0..2]), digits(&b[3..5]), digits(&b[6..8]))
    else {
        return Err(invalid(SHAPE));
    };

    let nano = match &b[8..] {
        [] => 0,
        [b'.', frac @ ..] if (1..=9).contains(&frac.len()) => {
            let value = digits(frac).ok_or_else(|| invalid(SHAPE))?;
            value * 10u32.pow(9 - frac.len() as u32)
        }
        _ => return Err(invalid(SHAPE)),
    };

    NaiveTime::from_hms_nano_opt(hour, min, sec, nano)
        .ok_or_else(|| CoercionError::Invalid("time out of range".to_string()))
}

fn parse_timestamp(text: &str) -> Result<NaiveDateTime, CoercionError> {
    let b = text.as_bytes();
    if b.len() < 19 || b[10] != b'T' {
        return Err(invalid("YYYY-MM-DDTHH:MM:SS[.fffffffff]"));
    }
    let date = parse_date(&text[..10])?;
    let time = parse_time(&text[11..])?;
    Ok(NaiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_string_verbatim() {
        assert_eq!(
            coerce(b" a,b ", FieldType::String).unwrap(),
            Value::String(" a,b ".to_string())
        );
        assert_eq!(coerce(b"", FieldType::String).unwrap(), Value::String(String::new()));
        assert_eq!(
            coerce(&[0xff, 0xfe], FieldType::String),
            Err(CoercionError::InvalidUtf8)
        );
    }

    #[test]
    fn test_coerce_bool() {
        assert_eq!(coerce(b"TRUE", FieldType::Boolean).unwrap(), Value::Boolean(true));
        assert_eq!(coerce(b"False", FieldType::Boolean).unwrap(), Value::Boolean(false));
        assert!(coerce(b"1", FieldType::Boolean).is_err());
        assert!(coerce(b"yes", FieldType::Boolean).is_err());
    }

    #[test]
    fn test_coerce_integers() {
        assert_eq!(coerce(b"+7", FieldType::Int32).unwrap(), Value::Int32(7));
        assert_eq!(coerce(b"-128", FieldType::Int8).unwrap(), Value::Int8(-128));
        assert!(coerce(b"128", FieldType::Int8).is_err());
        assert!(coerce(b"-1", FieldType::UInt16).is_err());
        assert_eq!(
            coerce(b"18446744073709551615", FieldType::UInt64).unwrap(),
            Value::UInt64(u64::MAX)
        );
        assert!(coerce(b"12x", FieldType::Int64).is_err());
        assert!(coerce(b" 1", FieldType::Int64).is_err());
        assert!(coerce(b"1.0", FieldType::Int64).is_err());
    }

    #[test]
    fn test_coerce_empty_fails_for_non_string() {
        for ty in FieldType::ALL {
            if ty != FieldType::String {
                assert_eq!(coerce(b"", ty), Err(CoercionError::Empty), "{}", ty);
            }
        }
    }

    #[test]
    fn test_coerce_floats() {
        assert_eq!(coerce(b"-1.5e3", FieldType::Float64).unwrap(), Value::Float64(-1500.0));
        assert_eq!(coerce(b"0.25", FieldType::Float32).unwrap(), Value::Float32(0.25));
        assert_eq!(
            coerce(b"-inf", FieldType::Float64).unwrap(),
            Value::Float64(f64::NEG_INFINITY)
        );
        assert!(coerce(b"1e39", FieldType::Float32).is_err());
        assert!(coerce(b"1e400", FieldType::Float64).is_err());
        assert!(coerce(b"1,5", FieldType::Float64).is_err());
        assert!(matches!(
            coerce(b"NaN", FieldType::Float64).unwrap(),
            Value::Float64(v) if v.is_nan()
        ));
    }

    #[test]
    fn test_coerce_date() {
        assert_eq!(
            coerce(b"2024-02-29", FieldType::Date).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(coerce(b"2023-02-29", FieldType::Date).is_err());
        assert!(coerce(b"2024-2-09", FieldType::Date).is_err());
        assert!(coerce(b"2024/02/09", FieldType::Date).is_err());
        assert!(coerce(b"2024-02-09 ", FieldType::Date).is_err());
    }

    #[test]
    fn test_coerce_time() {
        assert_eq!(
            coerce(b"23:59:59", FieldType::Time).unwrap(),
            Value::Time(NaiveTime::from_hms_opt(23, 59, 59).unwrap())
        );
        assert_eq!(
            coerce(b"00:00:01.5", FieldType::Time).unwrap(),
            Value::Time(NaiveTime::from_hms_milli_opt(0, 0, 1, 500).unwrap())
        );
        assert!(coerce(b"24:00:00", FieldType::Time).is_err());
        assert!(coerce(b"12:00", FieldType::Time).is_err());
        assert!(coerce(b"12:00:00.", FieldType::Time).is_err());
        assert!(coerce(b"12:00:00.1234567890", FieldType::Time).is_err());
    }

    #[test]
    fn test_coerce_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_micro_opt(3, 4, 5, 123_456)
            .unwrap();
        assert_eq!(
            coerce(b"2024-01-02T03:04:05.123456", FieldType::Timestamp).unwrap(),
            Value::Timestamp(expected)
        );
        assert!(coerce(b"2024-01-02 03:04:05", FieldType::Timestamp).is_err());
        assert!(coerce(b"2024-01-02T03:04:05Z", FieldType::Timestamp).is_err());
    }

    #[test]
    fn test_coerce_timestamp_tz() {
        let value = coerce(b"2024-01-02T03:04:05+01:00", FieldType::TimestampTz).unwrap();
        let ts = value.as_timestamp_tz().unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 3600);
        assert_eq!(ts.timestamp(), 1_704_161_045);
        assert!(coerce(b"2024-01-02T03:04:05", FieldType::TimestampTz).is_err());
    }

    #[test]
    fn test_into_decode_error() {
        let field = Field::new("id", FieldType::Int64);
        let err = coerce(b"12x", FieldType::Int64).unwrap_err().into_decode(&field, b"12x");
        assert!(matches!(
            err,
            DecodeError::Coercion { ref column, ref token, .. } if column == "id" && token == "12x"
        ));

        let field = Field::new("name", FieldType::String);
        let err = CoercionError::InvalidUtf8.into_decode(&field, &[0xff]);
        assert_eq!(err, DecodeError::InvalidUtf8 { column: "name".to_string() });
    }
}
