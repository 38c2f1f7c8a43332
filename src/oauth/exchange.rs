use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::TokenError;
use crate::providers::OAuthProvider;
use crate::store::{UserId, VendorTokenRecord, VendorTokenStore};

/// Body of `POST /exchangeCode`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRequest {
    pub code: String,
    pub user_id: UserId,
}

/// Turns a one-time authorization code into a stored token pair.
pub struct TokenExchanger {
    provider: Arc<dyn OAuthProvider>,
    store: Arc<dyn VendorTokenStore>,
}

impl TokenExchanger {
    pub fn new(provider: Arc<dyn OAuthProvider>, store: Arc<dyn VendorTokenStore>) -> Self {
        Self { provider, store }
    }

    /// Exchange the code and persist the resulting pair, replacing any
    /// previous record for the user. Tokens are never handed back.
    pub async fn exchange(&self, req: &ExchangeRequest) -> Result<(), TokenError> {
        let grant = self.provider.exchange_code(&req.code).await?;

        let rejection = grant.rejection();
        let (access_token, refresh_token) = match (grant.access_token, grant.refresh_token) {
            (Some(a), Some(r)) if !a.is_empty() && !r.is_empty() => (a, r),
            _ => {
                warn!(
                    user_id = req.user_id,
                    provider = self.provider.id(),
                    reason = rejection.as_deref().unwrap_or("incomplete token payload"),
                    "Code exchange returned no credentials"
                );
                return Err(TokenError::Exchange(
                    "No access or refresh token received".into(),
                ));
            }
        };

        self.store
            .upsert(&VendorTokenRecord {
                user_id: req.user_id,
                access_token,
                refresh_token,
            })
            .await?;

        info!(
            user_id = req.user_id,
            "Stored {} tokens",
            self.provider.display_name()
        );
        Ok(())
    }
}
