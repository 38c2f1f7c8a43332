//! Password reset codes on the `password_reset` table.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::{PgPool, Row};

use crate::error::AppError;

/// How long an emailed code stays valid.
pub const CODE_TTL_MINUTES: i64 = 10;

/// Result of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Valid,
    Expired,
    Incorrect,
}

/// Six-digit numeric code, never starting with zero.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - created_at > Duration::minutes(CODE_TTL_MINUTES)
}

pub async fn store_code(db: &PgPool, email: &str, code: &str) -> Result<(), AppError> {
    sqlx::query("INSERT INTO password_reset (email, code) VALUES ($1, $2)")
        .bind(email)
        .bind(code)
        .execute(db)
        .await?;
    Ok(())
}

/// Check the newest matching code for `email`.
pub async fn check_code(db: &PgPool, email: &str, code: &str) -> Result<CodeCheck, AppError> {
    let row = sqlx::query(
        r#"
        SELECT created_at FROM password_reset
        WHERE email = $1 AND code = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(email)
    .bind(code)
    .fetch_optional(db)
    .await?;

    let created_at: DateTime<Utc> = match row {
        Some(r) => r.get(0),
        None => return Ok(CodeCheck::Incorrect),
    };

    if is_expired(created_at, Utc::now()) {
        Ok(CodeCheck::Expired)
    } else {
        Ok(CodeCheck::Valid)
    }
}

/// Drop every outstanding code for `email` once the password has changed.
pub async fn clear_codes(db: &PgPool, email: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM password_reset WHERE email = $1")
        .bind(email)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn expiry_boundary_is_inclusive_of_ten_minutes() {
        let created = Utc::now();
        assert!(!is_expired(created, created + Duration::minutes(10)));
        assert!(is_expired(created, created + Duration::minutes(10) + Duration::seconds(1)));
        assert!(!is_expired(created, created + Duration::minutes(3)));
    }
}
