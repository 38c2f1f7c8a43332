//! Outbound HTTP seam used by the vendor provider and the authenticated fetcher.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Network-level failure talking to a vendor (DNS, connect, timeout, body read).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Status and raw body of a completed vendor call.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST an `application/x-www-form-urlencoded` body.
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError>;

    /// GET with an `Authorization: Bearer <token>` header.
    async fn get_bearer(&self, url: &str, token: &str) -> Result<HttpResponse, TransportError>;
}

/// `HttpTransport` backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn read(resp: reqwest::Response) -> Result<HttpResponse, TransportError> {
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError(format!("failed to read response body: {e}")))?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let resp = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| TransportError(format!("POST {url} failed: {e}")))?;
        Self::read(resp).await
    }

    async fn get_bearer(&self, url: &str, token: &str) -> Result<HttpResponse, TransportError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| TransportError(format!("GET {url} failed: {e}")))?;
        Self::read(resp).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        let ok = HttpResponse { status: 200, body: "{}".into() };
        let expired = HttpResponse { status: 401, body: String::new() };
        assert!(ok.is_success());
        assert!(!ok.is_unauthorized());
        assert!(expired.is_unauthorized());
        assert!(!expired.is_success());
    }

    #[test]
    fn decodes_json_body() {
        let resp = HttpResponse {
            status: 200,
            body: r#"{"access_token":"abc"}"#.into(),
        };
        let v: serde_json::Value = resp.json().unwrap();
        assert_eq!(v["access_token"], "abc");
    }
}
