use async_trait::async_trait;
use serde::Deserialize;

use crate::error::TokenError;

/// Raw token endpoint response after a code exchange or refresh.
///
/// Every field is optional: the vendor answers errors with the same endpoint,
/// and callers decide which fields a successful grant must carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenGrant {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    /// OAuth error code (e.g. `invalid_grant`) when the vendor rejected the request.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl TokenGrant {
    /// Vendor-supplied reason for a rejected grant, if any.
    pub fn rejection(&self) -> Option<String> {
        match (&self.error, &self.error_description) {
            (Some(code), Some(desc)) => Some(format!("{code}: {desc}")),
            (Some(code), None) => Some(code.clone()),
            (None, Some(desc)) => Some(desc.clone()),
            (None, None) => None,
        }
    }
}

/// The vendor's OAuth token endpoint.
///
/// Implementations own the client credentials and the fixed redirect URI; they
/// only translate wire formats. Validation of the returned grant and
/// persistence happen in `crate::oauth`.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Unique provider identifier (e.g., "dexcom").
    fn id(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Exchange an authorization code (grant type `authorization_code`).
    ///
    /// Network failures are `TokenError::Transport`; an unparseable body is
    /// `TokenError::Exchange`.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, TokenError>;

    /// Mint a new access token from a refresh token (grant type `refresh_token`).
    ///
    /// Every failure is `TokenError::Refresh`.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, TokenError>;
}
