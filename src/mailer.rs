//! Delivery of password reset codes.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::config::EmailJsConfig;

const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Transport(String),

    #[error("mail service rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_reset_code(&self, email: &str, code: &str) -> Result<(), MailError>;
}

/// Sends through an EmailJS template with `user_email`, `user_name`, and
/// `user_code` parameters.
pub struct EmailJsMailer {
    config: EmailJsConfig,
    endpoint: String,
    http: reqwest::Client,
}

impl EmailJsMailer {
    pub fn new(config: EmailJsConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            endpoint: EMAILJS_SEND_URL.to_string(),
            http,
        }
    }

    /// Point at a different send endpoint (self-hosted relay or tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Mailer for EmailJsMailer {
    async fn send_reset_code(&self, email: &str, code: &str) -> Result<(), MailError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&json!({
                "service_id": self.config.service_id,
                "template_id": self.config.template_id,
                "user_id": self.config.public_key,
                "accessToken": self.config.private_key,
                "template_params": {
                    "user_email": email,
                    "user_name": email,
                    "user_code": code,
                },
            }))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status, body });
        }

        Ok(())
    }
}

/// Fallback when no mail service is configured: writes the code to the log so
/// an operator can relay it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_reset_code(&self, email: &str, code: &str) -> Result<(), MailError> {
        warn!("No mail service configured; reset code for {email} was not mailed");
        info!(email, code, "Password reset code issued");
        Ok(())
    }
}
