use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{OAuthProvider, TokenGrant};
use crate::config::DexcomConfig;
use crate::error::TokenError;
use crate::http::HttpTransport;

/// Dexcom OAuth 2.0 provider.
///
/// Quirks:
/// - The token endpoint takes a form body and always wants `redirect_uri`,
///   even on refresh.
/// - Errors come back on the same endpoint as a JSON body without tokens.
pub struct DexcomProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    http: Arc<dyn HttpTransport>,
}

impl DexcomProvider {
    pub fn new(config: &DexcomConfig, http: Arc<dyn HttpTransport>) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            token_url: config.token_url(),
            http,
        }
    }
}

#[async_trait]
impl OAuthProvider for DexcomProvider {
    fn id(&self) -> &str {
        "dexcom"
    }

    fn display_name(&self) -> &str {
        "Dexcom"
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, TokenError> {
        let resp = self
            .http
            .post_form(
                &self.token_url,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("code", code),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", self.redirect_uri.as_str()),
                ],
            )
            .await
            .map_err(|e| TokenError::Transport(e.to_string()))?;

        resp.json::<TokenGrant>()
            .map_err(|e| TokenError::Exchange(format!("invalid token response ({}): {e}", resp.status)))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, TokenError> {
        let resp = self
            .http
            .post_form(
                &self.token_url,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                    ("redirect_uri", self.redirect_uri.as_str()),
                ],
            )
            .await
            .map_err(|e| TokenError::Refresh(e.to_string()))?;

        resp.json::<TokenGrant>()
            .map_err(|e| TokenError::Refresh(format!("invalid token response ({}): {e}", resp.status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedTransport;
    use serde_json::json;

    fn test_config() -> DexcomConfig {
        DexcomConfig::for_tests("https://dexcom.test")
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn exchange_posts_authorization_code_grant() {
        let http = Arc::new(ScriptedTransport::new());
        http.reply(
            "https://dexcom.test/v2/oauth2/token",
            200,
            json!({ "access_token": "a1", "refresh_token": "r1", "expires_in": 7200 }),
        );
        let provider = DexcomProvider::new(&test_config(), http.clone());

        let grant = provider.exchange_code("code-xyz").await.unwrap();
        assert_eq!(grant.access_token.as_deref(), Some("a1"));
        assert_eq!(grant.refresh_token.as_deref(), Some("r1"));

        let posts = http.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(field(&posts[0], "grant_type"), Some("authorization_code"));
        assert_eq!(field(&posts[0], "code"), Some("code-xyz"));
        assert_eq!(field(&posts[0], "client_id"), Some("client-1"));
        assert_eq!(field(&posts[0], "client_secret"), Some("secret-1"));
        assert_eq!(
            field(&posts[0], "redirect_uri"),
            Some("https://app.test/dexcomRedirect")
        );
    }

    #[tokio::test]
    async fn exchange_network_failure_is_transport_error() {
        let http = Arc::new(ScriptedTransport::new());
        http.fail("https://dexcom.test/v2/oauth2/token", "connection refused");
        let provider = DexcomProvider::new(&test_config(), http);

        let err = provider.exchange_code("code").await.unwrap_err();
        assert!(matches!(err, TokenError::Transport(_)));
    }

    #[tokio::test]
    async fn vendor_rejection_is_parsed_not_thrown() {
        let http = Arc::new(ScriptedTransport::new());
        http.reply(
            "https://dexcom.test/v2/oauth2/token",
            400,
            json!({ "error": "invalid_grant", "error_description": "code expired" }),
        );
        let provider = DexcomProvider::new(&test_config(), http);

        let grant = provider.exchange_code("stale").await.unwrap();
        assert!(grant.access_token.is_none());
        assert_eq!(grant.rejection().as_deref(), Some("invalid_grant: code expired"));
    }

    #[tokio::test]
    async fn refresh_posts_refresh_token_grant() {
        let http = Arc::new(ScriptedTransport::new());
        http.reply(
            "https://dexcom.test/v2/oauth2/token",
            200,
            json!({ "access_token": "a2" }),
        );
        let provider = DexcomProvider::new(&test_config(), http.clone());

        let grant = provider.refresh_token("r1").await.unwrap();
        assert_eq!(grant.access_token.as_deref(), Some("a2"));

        let posts = http.posts();
        assert_eq!(field(&posts[0], "grant_type"), Some("refresh_token"));
        assert_eq!(field(&posts[0], "refresh_token"), Some("r1"));
        assert_eq!(field(&posts[0], "code"), None);
    }

    #[tokio::test]
    async fn refresh_garbage_body_is_refresh_error() {
        let http = Arc::new(ScriptedTransport::new());
        http.reply_raw("https://dexcom.test/v2/oauth2/token", 502, "<html>bad gateway</html>");
        let provider = DexcomProvider::new(&test_config(), http);

        let err = provider.refresh_token("r1").await.unwrap_err();
        assert!(matches!(err, TokenError::Refresh(_)));
    }
}
