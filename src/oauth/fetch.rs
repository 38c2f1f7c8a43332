use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{info, warn};

use super::refresh::TokenRefresher;
use crate::error::TokenError;
use crate::http::{HttpResponse, HttpTransport};
use crate::store::{UserId, VendorTokenStore};

/// Outcome of one bearer-authenticated GET.
enum Attempt {
    Done(HttpResponse),
    Unauthorized,
}

/// Issues bearer-authenticated vendor GETs on behalf of a user.
///
/// A 401 on the first attempt triggers one refresh and exactly one retry with
/// the new token. The retry's outcome is final. Any other failure ends the call
/// without touching the refresh path.
pub struct AuthenticatedFetcher {
    store: Arc<dyn VendorTokenStore>,
    http: Arc<dyn HttpTransport>,
    refresher: Arc<TokenRefresher>,
}

impl AuthenticatedFetcher {
    pub fn new(
        store: Arc<dyn VendorTokenStore>,
        http: Arc<dyn HttpTransport>,
        refresher: Arc<TokenRefresher>,
    ) -> Self {
        Self {
            store,
            http,
            refresher,
        }
    }

    /// GET `url` as `user_id` and decode the JSON body into `T`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        user_id: UserId,
        url: &str,
    ) -> Result<T, TokenError> {
        let record = self
            .store
            .get(user_id)
            .await?
            .ok_or(TokenError::NoCredentials)?;

        let resp = match self.attempt(url, &record.access_token).await? {
            Attempt::Done(resp) => resp,
            Attempt::Unauthorized => {
                info!(user_id, "Vendor rejected access token, refreshing");
                let fresh = self
                    .refresher
                    .refresh(&record)
                    .await
                    .map_err(|e| match e {
                        TokenError::Store(_) => e,
                        other => TokenError::RefreshFailed(other.to_string()),
                    })?;

                match self.attempt(url, &fresh).await? {
                    Attempt::Done(resp) => resp,
                    Attempt::Unauthorized => {
                        warn!(user_id, "Vendor rejected the refreshed access token");
                        return Err(TokenError::Fetch(
                            "access token rejected after refresh".into(),
                        ));
                    }
                }
            }
        };

        resp.json::<T>()
            .map_err(|e| TokenError::Fetch(format!("unexpected response body: {e}")))
    }

    async fn attempt(&self, url: &str, access_token: &str) -> Result<Attempt, TokenError> {
        let resp = self
            .http
            .get_bearer(url, access_token)
            .await
            .map_err(|e| TokenError::Fetch(e.to_string()))?;

        if resp.is_unauthorized() {
            return Ok(Attempt::Unauthorized);
        }

        if !resp.is_success() {
            return Err(TokenError::Fetch(format!(
                "vendor responded with status {}",
                resp.status
            )));
        }

        Ok(Attempt::Done(resp))
    }
}
