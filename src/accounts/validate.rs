//! Input validation for account endpoints.
//!
//! Usernames must be at least 3 characters, passwords at least 8. Markup
//! characters are rejected outright instead of being escaped into the row.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::AppError;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex compiles")
});

const MARKUP_CHARS: &[char] = &['<', '>', '&', '"', '\'', '/', '`'];

/// Trim and lowercase an email, then check its shape.
pub fn email(raw: &str) -> Result<String, AppError> {
    let normalized = raw.trim().to_lowercase();
    if normalized.len() > 255 || !EMAIL_RE.is_match(&normalized) {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    Ok(normalized)
}

pub fn username(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err(AppError::BadRequest(
            "Username must be at least 3 characters long".into(),
        ));
    }
    if len > MAX_USERNAME_LEN {
        return Err(AppError::BadRequest(
            "Username must be at most 50 characters long".into(),
        ));
    }
    if name.contains(MARKUP_CHARS) || name.chars().any(char::is_whitespace) {
        return Err(AppError::BadRequest(
            "Username contains invalid characters".into(),
        ));
    }
    Ok(name.to_string())
}

pub fn password(raw: &str) -> Result<(), AppError> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters long".into(),
        ));
    }
    Ok(())
}

pub fn birthdate(raw: &str) -> Result<chrono::NaiveDate, AppError> {
    chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Birthdate must be formatted YYYY-MM-DD".into()))
}

/// Reset codes are exactly six ASCII digits.
pub fn reset_code(raw: &str) -> Result<String, AppError> {
    let code = raw.trim();
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::BadRequest("Verification code incorrect".into()));
    }
    Ok(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_valid_emails() {
        assert_eq!(email("  Jane.Doe@Example.COM ").unwrap(), "jane.doe@example.com");
        assert!(email("a+tag@sub.domain.io").is_ok());
    }

    #[test]
    fn rejects_bad_emails() {
        for bad in ["", "plain", "no-at.example.com", "a@b", "a@@b.com", "a b@c.com"] {
            assert!(email(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn username_length_bounds() {
        assert!(username("ab").is_err());
        assert_eq!(username(" abc ").unwrap(), "abc");
        assert!(username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn username_rejects_markup() {
        assert!(username("<script>").is_err());
        assert!(username("bob smith").is_err());
    }

    #[test]
    fn password_minimum_length() {
        assert!(password("1234567").is_err());
        assert!(password("12345678").is_ok());
    }

    #[test]
    fn parses_birthdates() {
        assert_eq!(
            birthdate("1990-01-31").unwrap(),
            chrono::NaiveDate::from_ymd_opt(1990, 1, 31).unwrap()
        );
        assert!(birthdate("31/01/1990").is_err());
    }

    #[test]
    fn reset_codes_are_six_digits() {
        assert_eq!(reset_code("012345").unwrap(), "012345");
        assert!(reset_code("12345").is_err());
        assert!(reset_code("12a456").is_err());
    }
}
