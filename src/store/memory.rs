use async_trait::async_trait;
use dashmap::DashMap;

use super::{UserId, VendorTokenRecord, VendorTokenStore};
use crate::error::TokenError;

/// In-process token store.
#[derive(Default)]
pub struct MemoryTokenStore {
    records: DashMap<UserId, VendorTokenRecord>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl VendorTokenStore for MemoryTokenStore {
    async fn get(&self, user_id: UserId) -> Result<Option<VendorTokenRecord>, TokenError> {
        Ok(self.records.get(&user_id).map(|r| r.clone()))
    }

    async fn upsert(&self, record: &VendorTokenRecord) -> Result<(), TokenError> {
        self.records.insert(record.user_id, record.clone());
        Ok(())
    }

    async fn update_access_token(
        &self,
        user_id: UserId,
        expected_refresh_token: &str,
        access_token: &str,
    ) -> Result<bool, TokenError> {
        match self.records.get_mut(&user_id) {
            Some(mut record) if record.refresh_token == expected_refresh_token => {
                record.access_token = access_token.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, user_id: UserId) -> Result<bool, TokenError> {
        Ok(self.records.remove(&user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: UserId, access: &str, refresh: &str) -> VendorTokenRecord {
        VendorTokenRecord {
            user_id,
            access_token: access.into(),
            refresh_token: refresh.into(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_instead_of_accumulating() {
        let store = MemoryTokenStore::new();
        store.upsert(&record(7, "a1", "r1")).await.unwrap();
        store.upsert(&record(7, "a2", "r2")).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(7).await.unwrap(), Some(record(7, "a2", "r2")));
    }

    #[tokio::test]
    async fn update_access_token_checks_refresh_token() {
        let store = MemoryTokenStore::new();
        store.upsert(&record(1, "a1", "r1")).await.unwrap();

        assert!(!store.update_access_token(1, "other", "a2").await.unwrap());
        assert_eq!(store.get(1).await.unwrap().unwrap().access_token, "a1");

        assert!(store.update_access_token(1, "r1", "a2").await.unwrap());
        let stored = store.get(1).await.unwrap().unwrap();
        assert_eq!(stored.access_token, "a2");
        assert_eq!(stored.refresh_token, "r1");
    }

    #[tokio::test]
    async fn update_missing_record_is_false() {
        let store = MemoryTokenStore::new();
        assert!(!store.update_access_token(3, "r", "a").await.unwrap());
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryTokenStore::new();
        store.upsert(&record(2, "a", "r")).await.unwrap();
        assert!(store.delete(2).await.unwrap());
        assert!(!store.delete(2).await.unwrap());
        assert!(store.get(2).await.unwrap().is_none());
    }
}
