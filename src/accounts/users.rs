//! User accounts: registration, lookup, and password updates on the `users` table.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::error::AppError;
use crate::store::UserId;

/// Public view of an account. The password hash never leaves this module.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub birthdate: NaiveDate,
}

pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub birthdate: NaiveDate,
}

pub async fn create_user(db: &PgPool, user: &NewUser) -> Result<User, AppError> {
    let row = sqlx::query(
        r#"
        INSERT INTO users (username, password, email, birthdate)
        VALUES ($1, $2, $3, $4)
        RETURNING id, username, email, birthdate
        "#,
    )
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.email)
    .bind(user.birthdate)
    .fetch_one(db)
    .await
    .map_err(|e| {
        let duplicate = e
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);
        if duplicate {
            AppError::Conflict("Username or email already registered".into())
        } else {
            AppError::from(e)
        }
    })?;

    Ok(User {
        id: row.get(0),
        username: row.get(1),
        email: row.get(2),
        birthdate: row.get(3),
    })
}

/// Look up the id and password hash for a username.
pub async fn credentials_for(
    db: &PgPool,
    username: &str,
) -> Result<Option<(UserId, String)>, AppError> {
    let row = sqlx::query("SELECT id, password FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(db)
        .await?;

    Ok(row.map(|r| (r.get(0), r.get(1))))
}

pub async fn username_exists(db: &PgPool, username: &str) -> Result<bool, AppError> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(db)
        .await?;
    Ok(row.get(0))
}

pub async fn email_exists(db: &PgPool, email: &str) -> Result<bool, AppError> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(db)
        .await?;
    Ok(row.get(0))
}

/// Returns whether an account with that email existed.
pub async fn update_password(
    db: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<bool, AppError> {
    let affected = sqlx::query("UPDATE users SET password = $1 WHERE email = $2")
        .bind(password_hash)
        .bind(email)
        .execute(db)
        .await?
        .rows_affected();

    Ok(affected > 0)
}
