//! PostgreSQL-backed vendor token store.
//!
//! Table `dexcom_tokens`: one row per user (`UNIQUE(user_id)`), both tokens
//! encrypted with `CryptoEngine`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::{UserId, VendorTokenRecord, VendorTokenStore};
use crate::crypto::CryptoEngine;
use crate::error::TokenError;

pub struct PgTokenStore {
    pool: PgPool,
    crypto: Arc<CryptoEngine>,
}

impl PgTokenStore {
    pub fn new(pool: PgPool, crypto: Arc<CryptoEngine>) -> Self {
        Self { pool, crypto }
    }

    fn seal(&self, plaintext: &str) -> Result<String, TokenError> {
        self.crypto
            .encrypt(plaintext)
            .map_err(|e| TokenError::Store(e.to_string()))
    }

    fn open(&self, sealed: &str) -> Result<String, TokenError> {
        self.crypto
            .decrypt(sealed)
            .map_err(|e| TokenError::Store(e.to_string()))
    }
}

#[async_trait]
impl VendorTokenStore for PgTokenStore {
    async fn get(&self, user_id: UserId) -> Result<Option<VendorTokenRecord>, TokenError> {
        let row = sqlx::query(
            "SELECT access_token, refresh_token FROM dexcom_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let enc_access: String = row.get(0);
        let enc_refresh: String = row.get(1);

        Ok(Some(VendorTokenRecord {
            user_id,
            access_token: self.open(&enc_access)?,
            refresh_token: self.open(&enc_refresh)?,
        }))
    }

    async fn upsert(&self, record: &VendorTokenRecord) -> Result<(), TokenError> {
        let enc_access = self.seal(&record.access_token)?;
        let enc_refresh = self.seal(&record.refresh_token)?;

        sqlx::query(
            r#"
            INSERT INTO dexcom_tokens (user_id, access_token, refresh_token)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                updated_at = NOW()
            "#,
        )
        .bind(record.user_id)
        .bind(&enc_access)
        .bind(&enc_refresh)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_access_token(
        &self,
        user_id: UserId,
        expected_refresh_token: &str,
        access_token: &str,
    ) -> Result<bool, TokenError> {
        // Ciphertexts are nonce-randomized, so the comparison happens on the
        // decrypted value under a row lock.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT refresh_token FROM dexcom_tokens WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let current = match row {
            Some(r) => self.open(&r.get::<String, _>(0))?,
            None => return Ok(false),
        };

        if current != expected_refresh_token {
            return Ok(false);
        }

        let enc_access = self.seal(access_token)?;
        sqlx::query(
            "UPDATE dexcom_tokens SET access_token = $1, updated_at = NOW() WHERE user_id = $2",
        )
        .bind(&enc_access)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, user_id: UserId) -> Result<bool, TokenError> {
        let affected = sqlx::query("DELETE FROM dexcom_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema;
    use base64::Engine;
    use sqlx::postgres::PgPoolOptions;

    /// Needs a scratch database: `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
    async fn store() -> (PgTokenStore, PgPool) {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let pool = PgPoolOptions::new().connect(&url).await.unwrap();
        schema::migrate(&pool).await.unwrap();

        let key = base64::engine::general_purpose::STANDARD.encode([7u8; 32]);
        let crypto = Arc::new(CryptoEngine::new(&key).unwrap());
        (PgTokenStore::new(pool.clone(), crypto), pool)
    }

    async fn insert_user(pool: &PgPool) -> UserId {
        let tag = rand::random::<u32>();
        sqlx::query(
            "INSERT INTO users (username, password, email, birthdate) \
             VALUES ($1, 'x', $2, '1990-01-01') RETURNING id",
        )
        .bind(format!("cas-{tag}"))
        .bind(format!("cas-{tag}@example.com"))
        .fetch_one(pool)
        .await
        .unwrap()
        .get(0)
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn compare_and_swap_checks_decrypted_refresh_token() {
        let (store, pool) = store().await;
        let user_id = insert_user(&pool).await;

        store
            .upsert(&VendorTokenRecord {
                user_id,
                access_token: "a1".into(),
                refresh_token: "r1".into(),
            })
            .await
            .unwrap();

        let raw: String = sqlx::query("SELECT refresh_token FROM dexcom_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap()
            .get(0);
        assert_ne!(raw, "r1");

        assert!(!store.update_access_token(user_id, "r-other", "a2").await.unwrap());
        assert!(store.update_access_token(user_id, "r1", "a2").await.unwrap());

        let record = store.get(user_id).await.unwrap().unwrap();
        assert_eq!(record.access_token, "a2");
        assert_eq!(record.refresh_token, "r1");

        assert!(store.delete(user_id).await.unwrap());
        assert!(!store.update_access_token(user_id, "r1", "a3").await.unwrap());

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap();
    }
}
