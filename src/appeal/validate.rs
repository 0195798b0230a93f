//! Field rules for appeals
//!
//! Rules are plain functions over the raw field text, applied in a fixed
//! order. Every rule runs; all violations are reported together.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use validator::ValidateEmail;

use super::types::{Appeal, AppealPayload};
use crate::error::FieldError;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 50;
const PHONE_MIN_CHARS: usize = 10;
const PHONE_MAX_CHARS: usize = 20;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[А-ЯЁ][а-яё]+$").expect("name pattern must compile"));

/// `%Y-%m-%d` alone also takes unpadded months and days
static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern must compile"));

/// Why a single field was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: &'static str,
    pub msg: String,
}

impl Violation {
    fn new(kind: &'static str, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
        }
    }
}

/// Validate a raw payload against `today`'s date.
///
/// Fields are checked in a fixed order and every violation is collected.
pub fn validate(payload: &AppealPayload, today: NaiveDate) -> Result<Appeal, Vec<FieldError>> {
    let mut errors = Vec::new();
    let last_name = check_field(payload, "last_name", &mut errors, |v| check_name(v).map(|()| v.to_string()));
    let first_name = check_field(payload, "first_name", &mut errors, |v| check_name(v).map(|()| v.to_string()));
    let birth_date = check_field(payload, "birth_date", &mut errors, |v| check_birth_date(v, today));
    let phone = check_field(payload, "phone", &mut errors, |v| check_phone(v).map(|()| v.to_string()));
    let email = check_field(payload, "email", &mut errors, |v| check_email(v).map(|()| v.to_string()));

    match (last_name, first_name, birth_date, phone, email) {
        (Some(last_name), Some(first_name), Some(birth_date), Some(phone), Some(email)) => Ok(Appeal {
            last_name,
            first_name,
            birth_date,
            phone,
            email,
        }),
        _ => Err(errors),
    }
}

/// Run `rule` on a string field; a missing or non-string field and a
/// failed rule each leave one error behind.
fn check_field<T>(
    payload: &AppealPayload,
    field: &str,
    errors: &mut Vec<FieldError>,
    rule: impl FnOnce(&str) -> Result<T, Violation>,
) -> Option<T> {
    let outcome = match payload.get(field) {
        Some(Value::String(value)) => rule(value),
        Some(_) => Err(Violation::new("string_type", "Input should be a valid string")),
        None => Err(Violation::new("missing", "Field required")),
    };
    match outcome {
        Ok(value) => Some(value),
        Err(v) => {
            errors.push(FieldError::body(field, v.kind, v.msg));
            None
        }
    }
}

/// One uppercase Cyrillic letter, then lowercase Cyrillic letters only.
pub fn check_name(value: &str) -> Result<(), Violation> {
    let len = value.chars().count();
    if len < NAME_MIN_CHARS {
        return Err(Violation::new(
            "string_too_short",
            format!("String should have at least {NAME_MIN_CHARS} characters"),
        ));
    }
    if len > NAME_MAX_CHARS {
        return Err(Violation::new(
            "string_too_long",
            format!("String should have at most {NAME_MAX_CHARS} characters"),
        ));
    }
    if !NAME_PATTERN.is_match(value) {
        return Err(Violation::new(
            "string_pattern_mismatch",
            "Must start with an uppercase Cyrillic letter followed by lowercase Cyrillic letters",
        ));
    }
    Ok(())
}

pub fn check_birth_date(value: &str, today: NaiveDate) -> Result<NaiveDate, Violation> {
    const BAD_FORMAT: &str = "Input should be a valid date in YYYY-MM-DD format";
    if !DATE_SHAPE.is_match(value) {
        return Err(Violation::new("date_parsing", BAD_FORMAT));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Violation::new("date_parsing", format!("{BAD_FORMAT}: {e}")))?;
    if date > today {
        return Err(Violation::new("value_error", "Birth date cannot be in the future"));
    }
    Ok(date)
}

/// Length is checked on the raw input; the digit check on the input with
/// whitespace, hyphens and parentheses removed.
pub fn check_phone(value: &str) -> Result<(), Violation> {
    let len = value.chars().count();
    if len < PHONE_MIN_CHARS {
        return Err(Violation::new(
            "string_too_short",
            format!("String should have at least {PHONE_MIN_CHARS} characters"),
        ));
    }
    if len > PHONE_MAX_CHARS {
        return Err(Violation::new(
            "string_too_long",
            format!("String should have at most {PHONE_MAX_CHARS} characters"),
        ));
    }
    let has_digit = value
        .chars()
        .filter(|c| !(c.is_whitespace() || matches!(c, '-' | '(' | ')')))
        .any(|c| c.is_ascii_digit());
    if !has_digit {
        return Err(Violation::new("value_error", "Phone number must contain digits"));
    }
    Ok(())
}

pub fn check_email(value: &str) -> Result<(), Violation> {
    if value.validate_email() {
        Ok(())
    } else {
        Err(Violation::new("value_error", "value is not a valid email address"))
    }
}
