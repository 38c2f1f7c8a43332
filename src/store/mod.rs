//! Token store: per-user vendor credentials.
//!
//! `PgTokenStore` persists into the shared PostgreSQL database with tokens
//! encrypted at rest; `MemoryTokenStore` backs tests and local runs.

pub mod db;
pub mod memory;
pub mod schema;

pub use db::PgTokenStore;
pub use memory::MemoryTokenStore;

use async_trait::async_trait;

use crate::error::TokenError;

/// Primary key of the `users` table.
pub type UserId = i32;

/// The single active credential set a user holds with the vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorTokenRecord {
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: String,
}

#[async_trait]
pub trait VendorTokenStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<VendorTokenRecord>, TokenError>;

    /// Insert or replace the user's record. A user never holds two records.
    async fn upsert(&self, record: &VendorTokenRecord) -> Result<(), TokenError>;

    /// Replace the access token only if the stored refresh token still equals
    /// `expected_refresh_token`. Returns `false` when the record is gone or
    /// was replaced in the meantime.
    async fn update_access_token(
        &self,
        user_id: UserId,
        expected_refresh_token: &str,
        access_token: &str,
    ) -> Result<bool, TokenError>;

    /// Remove the user's record. Returns whether one existed.
    async fn delete(&self, user_id: UserId) -> Result<bool, TokenError>;
}
