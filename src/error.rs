use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failures of the vendor token lifecycle (exchange, refresh, authenticated fetch).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("No Dexcom tokens found for this user")]
    NoCredentials,

    #[error("Failed to exchange code: {0}")]
    Exchange(String),

    #[error("Failed to refresh Dexcom token: {0}")]
    Refresh(String),

    /// The fetch hit a 401 and the follow-up refresh failed.
    #[error("{0}")]
    RefreshFailed(String),

    #[error("Vendor request failed: {0}")]
    Transport(String),

    #[error("Failed to fetch Dexcom data: {0}")]
    Fetch(String),

    #[error("Token store error: {0}")]
    Store(String),
}

/// Unified error type for the HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Request Errors ──────────────────────────────────────────────────
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    // ── Vendor Errors ───────────────────────────────────────────────────
    /// Code exchange failures render as `{ "error": ... }`.
    #[error("{0}")]
    Exchange(TokenError),

    /// Authenticated vendor calls render as `{ "message": ..., "error": ... }`.
    #[error("{message}: {source}")]
    Vendor {
        message: String,
        #[source]
        source: TokenError,
    },

    #[error("Hue bridge error: {0}")]
    Bridge(String),

    // ── Internal ────────────────────────────────────────────────────────
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn vendor(message: impl Into<String>, source: TokenError) -> Self {
        AppError::Vendor {
            message: message.into(),
            source,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("Database error: {e}");
        AppError::Database(e.to_string())
    }
}

impl From<crate::hue::BridgeError> for AppError {
    fn from(e: crate::hue::BridgeError) -> Self {
        tracing::warn!("Hue bridge call failed: {e}");
        AppError::Bridge(e.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<sqlx::Error> for TokenError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!("Token store error: {e}");
        TokenError::Store(e.to_string())
    }
}

/// Client-facing text for a token error. Store failures carry database and
/// decryption details, which stay in the logs.
fn public_detail(e: &TokenError) -> String {
    match e {
        TokenError::Store(detail) => {
            tracing::error!("Token store failure: {detail}");
            "Server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "message": msg })),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": self.to_string() }),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "message": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "message": msg })),
            AppError::Exchange(e @ TokenError::Exchange(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.to_string() }),
            ),
            AppError::Exchange(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("Failed to exchange code: {}", public_detail(e)) }),
            ),
            AppError::Vendor {
                source: TokenError::NoCredentials,
                ..
            } => (
                StatusCode::NOT_FOUND,
                json!({ "message": TokenError::NoCredentials.to_string() }),
            ),
            AppError::Vendor { message, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": message, "error": public_detail(source) }),
            ),
            AppError::Bridge(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": self.to_string() }),
            ),
            AppError::Database(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Server error" }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_render_as_not_found() {
        let resp = AppError::vendor("Error fetching Dexcom data", TokenError::NoCredentials)
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn refresh_failure_renders_as_server_error() {
        let resp = AppError::vendor(
            "Error fetching Dexcom data",
            TokenError::RefreshFailed("Failed to refresh Dexcom token: no access token".into()),
        )
        .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn exchange_transport_failure_is_prefixed() {
        let resp = AppError::Exchange(TokenError::Transport("connection refused".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_details_are_not_leaked() {
        let leak = "violates foreign key constraint \"dexcom_tokens_user_id_fkey\"";
        let exchange = AppError::Exchange(TokenError::Store(leak.into()));
        let vendor = AppError::vendor("Error fetching Dexcom data", TokenError::Store(leak.into()));

        assert_eq!(
            exchange.to_string(),
            format!("Token store error: {leak}"),
            "the detail stays available for logging"
        );
        assert_eq!(
            public_detail(&TokenError::Store(leak.into())),
            "Server error"
        );
        assert_eq!(
            vendor.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn database_details_are_not_leaked() {
        let err = AppError::Database("relation users does not exist".into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
