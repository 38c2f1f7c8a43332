//! Per-user glucose alert thresholds (`user_settings`).

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};

use crate::error::AppError;
use crate::store::UserId;

pub const DEFAULT_HIGH_THRESHOLD: i32 = 300;
pub const DEFAULT_LOW_THRESHOLD: i32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: UserId,
    pub high_threshold: i32,
    pub low_threshold: i32,
}

/// Fetch settings, creating the default row on first access.
pub async fn get_or_create(db: &PgPool, user_id: UserId) -> Result<UserSettings, AppError> {
    // The no-op update makes RETURNING yield the existing row on conflict.
    let row = sqlx::query(
        r#"
        INSERT INTO user_settings (user_id, high_threshold, low_threshold)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING user_id, high_threshold, low_threshold
        "#,
    )
    .bind(user_id)
    .bind(DEFAULT_HIGH_THRESHOLD)
    .bind(DEFAULT_LOW_THRESHOLD)
    .fetch_one(db)
    .await?;

    Ok(from_row(&row))
}

pub async fn upsert(
    db: &PgPool,
    user_id: UserId,
    high_threshold: i32,
    low_threshold: i32,
) -> Result<UserSettings, AppError> {
    validate_thresholds(high_threshold, low_threshold)?;

    let row = sqlx::query(
        r#"
        INSERT INTO user_settings (user_id, high_threshold, low_threshold)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET
            high_threshold = EXCLUDED.high_threshold,
            low_threshold = EXCLUDED.low_threshold
        RETURNING user_id, high_threshold, low_threshold
        "#,
    )
    .bind(user_id)
    .bind(high_threshold)
    .bind(low_threshold)
    .fetch_one(db)
    .await?;

    Ok(from_row(&row))
}

pub fn validate_thresholds(high: i32, low: i32) -> Result<(), AppError> {
    if low <= 0 || high <= 0 {
        return Err(AppError::BadRequest("Thresholds must be positive".into()));
    }
    if low >= high {
        return Err(AppError::BadRequest(
            "Low threshold must be below high threshold".into(),
        ));
    }
    Ok(())
}

fn from_row(row: &sqlx::postgres::PgRow) -> UserSettings {
    UserSettings {
        user_id: row.get(0),
        high_threshold: row.get(1),
        low_threshold: row.get(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_thresholds(DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD).is_ok());
    }

    #[test]
    fn rejects_inverted_or_non_positive_thresholds() {
        assert!(validate_thresholds(60, 300).is_err());
        assert!(validate_thresholds(100, 100).is_err());
        assert!(validate_thresholds(200, 0).is_err());
    }
}
