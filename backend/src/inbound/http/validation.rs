//! Shared validation helpers for inbound HTTP adapters.
//!
//! Identifiers arrive as JSON numbers or numeric strings, and sale windows as
//! `YYYY-MM-DD HH:MM:SS` wall-clock times interpreted as UTC. Every failure
//! becomes an `invalid_request` error carrying the offending field.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::Error;

/// Largest identifier the relational store can hold.
pub const MAX_ID: u64 = i64::MAX as u64;

/// Format accepted for sale-window timestamps.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationCode {
    MissingField,
    InvalidId,
    InvalidTimestamp,
}

impl ValidationCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidId => "invalid_id",
            Self::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

fn field_error(field: &str, message: String, code: ValidationCode, value: Option<&str>) -> Error {
    let details = match value {
        Some(value) => json!({ "field": field, "value": value, "code": code.as_str() }),
        None => json!({ "field": field, "code": code.as_str() }),
    };
    Error::invalid_request(message).with_details(details)
}

pub(crate) fn missing_field_error(field: &str) -> Error {
    field_error(
        field,
        format!("{field} is required"),
        ValidationCode::MissingField,
        None,
    )
}

/// Identifier as supplied by clients: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum IdInput {
    Number(u64),
    Text(String),
}

impl IdInput {
    /// Resolve to an identifier no larger than `i64::MAX`, the range of the
    /// relational key columns, naming `field` in the error.
    pub(crate) fn parse(&self, field: &str) -> Result<u64, Error> {
        let (parsed, raw) = match self {
            Self::Number(value) => (Some(*value), value.to_string()),
            Self::Text(text) => (text.trim().parse::<u64>().ok(), text.clone()),
        };
        parsed.filter(|id| *id <= MAX_ID).ok_or_else(|| {
            field_error(
                field,
                format!("{field} must be an integer between 0 and {MAX_ID}"),
                ValidationCode::InvalidId,
                Some(&raw),
            )
        })
    }
}

/// Parse a required identifier field.
pub(crate) fn require_id(value: Option<&IdInput>, field: &str) -> Result<u64, Error> {
    value
        .ok_or_else(|| missing_field_error(field))?
        .parse(field)
}

/// Parse a path segment identifier.
pub(crate) fn parse_path_id(raw: &str, field: &str) -> Result<u64, Error> {
    IdInput::Text(raw.to_owned()).parse(field)
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp as UTC.
pub(crate) fn parse_date_time(value: &str, field: &str) -> Result<DateTime<Utc>, Error> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            field_error(
                field,
                format!("{field} must use the format YYYY-MM-DD HH:MM:SS"),
                ValidationCode::InvalidTimestamp,
                Some(value),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case(IdInput::Number(7), 7)]
    #[case(IdInput::Text("7".to_owned()), 7)]
    #[case(IdInput::Text(" 42 ".to_owned()), 42)]
    fn ids_accept_numbers_and_numeric_strings(#[case] input: IdInput, #[case] expected: u64) {
        assert_eq!(input.parse("voucherId").expect("valid id"), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("-1")]
    #[case("")]
    #[case("9223372036854775808")]
    fn non_numeric_ids_name_the_field(#[case] raw: &str) {
        let error = IdInput::Text(raw.to_owned())
            .parse("userId")
            .expect_err("invalid id");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        let details = error.details().expect("details");
        assert_eq!(details["field"], "userId");
        assert_eq!(details["code"], "invalid_id");
    }

    #[rstest]
    #[case(MAX_ID, true)]
    #[case(MAX_ID + 1, false)]
    #[case(u64::MAX, false)]
    fn numeric_ids_stay_within_the_key_range(#[case] raw: u64, #[case] accepted: bool) {
        let parsed = IdInput::Number(raw).parse("userId");
        assert_eq!(parsed.is_ok(), accepted);
        if let Err(error) = parsed {
            assert_eq!(error.details().expect("details")["code"], "invalid_id");
        }
    }

    #[rstest]
    fn untagged_input_deserialises_both_shapes() {
        let number: IdInput = serde_json::from_str("5").expect("number");
        let text: IdInput = serde_json::from_str("\"5\"").expect("string");
        assert_eq!(number, IdInput::Number(5));
        assert_eq!(text, IdInput::Text("5".to_owned()));
    }

    #[rstest]
    fn missing_ids_are_reported() {
        let error = require_id(None, "voucherId").expect_err("missing");
        assert_eq!(error.details().expect("details")["code"], "missing_field");
    }

    #[rstest]
    fn timestamps_are_read_as_utc() {
        let parsed = parse_date_time("2026-11-11 20:00:00", "beginTime").expect("valid");
        let expected = Utc
            .with_ymd_and_hms(2026, 11, 11, 20, 0, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(parsed, expected);
    }

    #[rstest]
    #[case("2026-11-11T20:00:00Z")]
    #[case("11/11/2026 20:00")]
    fn other_timestamp_formats_are_rejected(#[case] raw: &str) {
        let error = parse_date_time(raw, "endTime").expect_err("invalid");
        assert_eq!(
            error.details().expect("details")["code"],
            "invalid_timestamp"
        );
    }
}
