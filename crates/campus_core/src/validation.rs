//! crates/campus_core/src/validation.rs
//!
//! Boundary checks applied before anything touches the store.

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

use crate::ports::{PortError, PortResult};

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").expect("valid time regex"));
static STUDENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{9}$").expect("valid student id regex"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

pub const STUDENT_PASSWORD_MIN: usize = 8;
pub const ADMIN_PASSWORD_MIN: usize = 6;

fn invalid(message: &str) -> PortError {
    PortError::Validation(message.to_string())
}

/// Parses an activity date in `YYYY-MM-DD` form.
pub fn parse_date(raw: &str) -> PortResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| invalid("Valid date is required"))
}

/// Parses a 24h wall-clock time, `H:MM` or `HH:MM`.
pub fn parse_time(raw: &str) -> PortResult<NaiveTime> {
    let raw = raw.trim();
    if !TIME_RE.is_match(raw) {
        return Err(invalid("Valid time is required"));
    }
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| invalid("Valid time is required"))
}

/// Returns the trimmed value, rejecting blanks.
pub fn require_non_empty(raw: &str, field: &str) -> PortResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PortError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub fn validate_student_id(raw: &str) -> PortResult<()> {
    if STUDENT_ID_RE.is_match(raw) {
        Ok(())
    } else {
        Err(invalid("Student ID must be exactly 9 digits"))
    }
}

pub fn validate_email(raw: &str) -> PortResult<()> {
    if EMAIL_RE.is_match(raw) {
        Ok(())
    } else {
        Err(invalid("Valid email is required"))
    }
}

pub fn validate_password(raw: &str, min_len: usize) -> PortResult<()> {
    if raw.chars().count() >= min_len {
        Ok(())
    } else {
        Err(PortError::Validation(format!(
            "Password must be at least {} characters",
            min_len
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_digit_hours() {
        assert_eq!(parse_time("9:05").unwrap(), NaiveTime::from_hms_opt(9, 5, 0).unwrap());
        assert_eq!(parse_time("23:59").unwrap(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
    }

    #[test]
    fn rejects_out_of_range_times() {
        assert!(parse_time("24:00").is_err());
        assert!(parse_time("12:60").is_err());
        assert!(parse_time("noon").is_err());
    }

    #[test]
    fn dates_must_be_iso() {
        assert!(parse_date("2025-02-30").is_err());
        assert!(parse_date("01/03/2025").is_err());
        assert_eq!(
            parse_date("2025-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }

    #[test]
    fn student_ids_are_nine_digits() {
        assert!(validate_student_id("202312345").is_ok());
        assert!(validate_student_id("20231234").is_err());
        assert!(validate_student_id("20231234x").is_err());
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(require_non_empty("   ", "Title").is_err());
        assert_eq!(require_non_empty(" Chess ", "Title").unwrap(), "Chess");
    }
}
