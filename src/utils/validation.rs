use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::utils::error::CustomError;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[6-9]\d{9}$").expect("valid phone regex"));

static PAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("valid PAN regex"));

static PINCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("valid pincode regex"));

pub fn validate_password(password: &str) -> Result<(), CustomError> {
    // Check password length
    if password.len() < 8 || password.len() > 64 {
        return Err(CustomError::ValidationError(
            "Password must be between 8 and 64 characters long.".into(),
        ));
    }

    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_lowercase || !has_uppercase || !has_digit {
        return Err(CustomError::ValidationError(
            "Password must include at least one uppercase letter, one lowercase letter, and one number.".into(),
        ));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), CustomError> {
    if email.is_empty() {
        return Err(CustomError::ValidationError("Email is required".into()));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(CustomError::ValidationError("Invalid email format".into()));
    }
    Ok(())
}

/// Ten digit Indian mobile number, without country code.
pub fn validate_phone(phone: &str) -> Result<(), CustomError> {
    if !PHONE_RE.is_match(phone) {
        return Err(CustomError::ValidationError(
            "Invalid phone number format. Must be 10 digits starting with 6-9.".into(),
        ));
    }
    Ok(())
}

pub fn validate_pan(pan: &str) -> Result<(), CustomError> {
    if !PAN_RE.is_match(pan) {
        return Err(CustomError::ValidationError(
            "Invalid PAN number format. Must be like ABCDE1234F.".into(),
        ));
    }
    Ok(())
}

pub fn validate_pincode(pincode: &str) -> Result<(), CustomError> {
    if !PINCODE_RE.is_match(pincode) {
        return Err(CustomError::ValidationError(
            "Invalid pincode format. Must be 6 digits.".into(),
        ));
    }
    Ok(())
}

pub fn parse_dob(dob: &str) -> Result<NaiveDate, CustomError> {
    NaiveDate::parse_from_str(dob.trim(), "%Y-%m-%d")
        .map_err(|_| CustomError::ValidationError("Invalid date format".into()))
}

/// Returns `Some(trimmed)` for non-blank input.
pub fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules() {
        assert!(validate_password("Secret123").is_ok());
        assert!(validate_password("short1A").is_err());
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
    }

    #[test]
    fn email_format() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("spaces in@x.com").is_err());
    }

    #[test]
    fn profile_field_formats() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("5876543210").is_err());
        assert!(validate_pan("ABCDE1234F").is_ok());
        assert!(validate_pan("abcde1234f").is_err());
        assert!(validate_pincode("560001").is_ok());
        assert!(validate_pincode("5600").is_err());
    }

    #[test]
    fn dob_must_be_iso_date() {
        assert!(parse_dob("1990-04-12").is_ok());
        assert!(parse_dob("12/04/1990").is_err());
    }

    #[test]
    fn blank_values_are_dropped() {
        assert_eq!(non_blank(&Some("  Pune ".into())), Some("Pune".into()));
        assert_eq!(non_blank(&Some("   ".into())), None);
        assert_eq!(non_blank(&None), None);
    }
}
