use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::TokenError;
use crate::providers::OAuthProvider;
use crate::store::{UserId, VendorTokenRecord, VendorTokenStore};

/// Mints new access tokens from stored refresh tokens.
///
/// Refreshes for one user run one at a time. A caller that waited on the lock
/// and finds the stored access token already replaced gets that token without
/// another vendor call.
pub struct TokenRefresher {
    provider: Arc<dyn OAuthProvider>,
    store: Arc<dyn VendorTokenStore>,
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl TokenRefresher {
    pub fn new(provider: Arc<dyn OAuthProvider>, store: Arc<dyn VendorTokenStore>) -> Self {
        Self {
            provider,
            store,
            locks: DashMap::new(),
        }
    }

    /// Refresh the access token that `stale` carried and return the new one.
    ///
    /// The refresh token itself is never rotated.
    pub async fn refresh(&self, stale: &VendorTokenRecord) -> Result<String, TokenError> {
        let user_id = stale.user_id;
        let lock = self.locks.entry(user_id).or_default().clone();

        let result = {
            let _guard = lock.lock().await;
            self.refresh_locked(stale).await
        };

        drop(lock);
        self.locks
            .remove_if(&user_id, |_, l| Arc::strong_count(l) == 1);

        result
    }

    async fn refresh_locked(&self, stale: &VendorTokenRecord) -> Result<String, TokenError> {
        let user_id = stale.user_id;
        let current = self
            .store
            .get(user_id)
            .await?
            .ok_or_else(|| TokenError::Refresh("token record no longer exists".into()))?;

        if current.access_token != stale.access_token {
            debug!(user_id, "Access token already refreshed by a concurrent request");
            return Ok(current.access_token);
        }

        let grant = self.provider.refresh_token(&current.refresh_token).await?;
        let rejection = grant.rejection();

        let access_token = match grant.access_token.filter(|t| !t.is_empty()) {
            Some(t) => t,
            None => {
                warn!(
                    user_id,
                    reason = rejection.as_deref().unwrap_or("no access_token in response"),
                    "{} refresh rejected",
                    self.provider.display_name()
                );
                return Err(TokenError::Refresh("No access token received".into()));
            }
        };

        let updated = self
            .store
            .update_access_token(user_id, &current.refresh_token, &access_token)
            .await?;

        if !updated {
            return Err(TokenError::Refresh(
                "token record changed during refresh".into(),
            ));
        }

        info!(user_id, "Refreshed {} access token", self.provider.display_name());
        Ok(access_token)
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DexcomConfig;
    use crate::http::testing::ScriptedTransport;
    use crate::providers::DexcomProvider;
    use crate::store::MemoryTokenStore;
    use serde_json::json;

    const TOKEN_URL: &str = "https://dexcom.test/v2/oauth2/token";

    fn record(access: &str) -> VendorTokenRecord {
        VendorTokenRecord {
            user_id: 1,
            access_token: access.into(),
            refresh_token: "r1".into(),
        }
    }

    async fn setup() -> (Arc<ScriptedTransport>, Arc<MemoryTokenStore>, TokenRefresher) {
        let http = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryTokenStore::new());
        store.upsert(&record("stale")).await.unwrap();
        let provider = Arc::new(DexcomProvider::new(
            &DexcomConfig::for_tests("https://dexcom.test"),
            http.clone(),
        ));
        let refresher = TokenRefresher::new(provider, store.clone());
        (http, store, refresher)
    }

    #[tokio::test]
    async fn updates_access_token_and_keeps_refresh_token() {
        let (http, store, refresher) = setup().await;
        http.reply(
            TOKEN_URL,
            200,
            json!({ "access_token": "fresh", "refresh_token": "rotated" }),
        );

        let token = refresher.refresh(&record("stale")).await.unwrap();

        assert_eq!(token, "fresh");
        let stored = store.get(1).await.unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh");
        assert_eq!(stored.refresh_token, "r1");
        assert_eq!(refresher.lock_count(), 0);
    }

    #[tokio::test]
    async fn missing_access_token_leaves_record_untouched() {
        let (http, store, refresher) = setup().await;
        http.reply(TOKEN_URL, 400, json!({ "error": "invalid_grant" }));

        let err = refresher.refresh(&record("stale")).await.unwrap_err();

        assert_eq!(err, TokenError::Refresh("No access token received".into()));
        assert_eq!(store.get(1).await.unwrap().unwrap().access_token, "stale");
    }

    #[tokio::test]
    async fn transport_failure_is_refresh_error() {
        let (http, _store, refresher) = setup().await;
        http.fail(TOKEN_URL, "timed out");

        assert!(matches!(
            refresher.refresh(&record("stale")).await,
            Err(TokenError::Refresh(_))
        ));
    }

    #[tokio::test]
    async fn deleted_record_is_refresh_error_without_vendor_call() {
        let (http, store, refresher) = setup().await;
        store.delete(1).await.unwrap();

        assert!(matches!(
            refresher.refresh(&record("stale")).await,
            Err(TokenError::Refresh(_))
        ));
        assert!(http.calls().is_empty());
    }

    #[tokio::test]
    async fn concurrent_refreshes_hit_the_vendor_once() {
        let (http, store, refresher) = setup().await;
        http.reply(TOKEN_URL, 200, json!({ "access_token": "fresh" }));

        let stale = record("stale");
        let (a, b) = tokio::join!(refresher.refresh(&stale), refresher.refresh(&stale));

        assert_eq!(a.unwrap(), "fresh");
        assert_eq!(b.unwrap(), "fresh");
        assert_eq!(http.posts().len(), 1);
        assert_eq!(store.get(1).await.unwrap().unwrap().access_token, "fresh");
        assert_eq!(refresher.lock_count(), 0);
    }
}
