use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error as ThisError;
use tracing::error;

use super::IsRetryable;

/// Why a bearer token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token is invalid")]
    Invalid,
    #[error("session has been revoked")]
    Revoked,
}

impl TokenError {
    fn code(&self) -> &'static str {
        match self {
            TokenError::Expired => "TOKEN_EXPIRED",
            TokenError::Malformed => "TOKEN_MALFORMED",
            TokenError::Invalid => "TOKEN_INVALID",
            TokenError::Revoked => "SESSION_REVOKED",
        }
    }
}

#[derive(Debug, ThisError)]
pub enum PanelError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Access token is missing")]
    MissingToken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("Too many failed login attempts; retry in {retry_after_secs}s")]
    TooManyAttempts { retry_after_secs: u64 },

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Webhook returned status {0}")]
    WebhookStatus(StatusCode),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Password hashing error: {0}")]
    HashError(#[from] bcrypt::BcryptError),

    #[error("Token signing error: {0}")]
    SigningError(#[from] jsonwebtoken::errors::Error),

    #[error("Metrics collection error: {0}")]
    MetricsError(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl PanelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PanelError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        PanelError::NotFound(what.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        PanelError::Forbidden(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PanelError::Validation(_) | PanelError::MissingCredentials => StatusCode::BAD_REQUEST,
            PanelError::MissingToken | PanelError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            PanelError::Token(_) | PanelError::Forbidden(_) => StatusCode::FORBIDDEN,
            PanelError::NotFound(_) => StatusCode::NOT_FOUND,
            PanelError::Conflict(_) => StatusCode::CONFLICT,
            PanelError::AccountLocked { .. } => StatusCode::LOCKED,
            PanelError::TooManyAttempts { .. } => StatusCode::TOO_MANY_REQUESTS,
            PanelError::Plugin(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ApiErrorObject {
        let (code, details) = match self {
            PanelError::Validation(_) => ("VALIDATION_ERROR", None),
            PanelError::MissingCredentials => ("MISSING_CREDENTIALS", None),
            PanelError::MissingToken => ("TOKEN_MISSING", None),
            PanelError::InvalidCredentials => ("INVALID_CREDENTIALS", None),
            PanelError::Token(kind) => (kind.code(), None),
            PanelError::Forbidden(_) => ("FORBIDDEN", None),
            PanelError::NotFound(_) => ("NOT_FOUND", None),
            PanelError::Conflict(_) => ("CONFLICT", None),
            PanelError::AccountLocked { until } => {
                ("ACCOUNT_LOCKED", Some(json!({ "locked_until": until })))
            }
            PanelError::TooManyAttempts { retry_after_secs } => (
                "TOO_MANY_ATTEMPTS",
                Some(json!({ "retry_after_secs": retry_after_secs })),
            ),
            PanelError::Plugin(_) => ("PLUGIN_ERROR", None),
            _ => {
                return ApiErrorObject {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                    details: None,
                };
            }
        };
        ApiErrorObject {
            code: code.to_string(),
            message: self.to_string(),
            details,
        }
    }
}

impl IntoResponse for PanelError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(ApiErrorBody { inner: self.body() })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

impl IsRetryable for PanelError {
    fn is_retryable(&self) -> bool {
        match self {
            PanelError::ReqwestError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            PanelError::WebhookStatus(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: PanelError) -> (StatusCode, Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn client_errors_carry_their_code() {
        let (status, body) = body_of(PanelError::Token(TokenError::Expired)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "TOKEN_EXPIRED");

        let (status, body) = body_of(PanelError::TooManyAttempts {
            retry_after_secs: 42,
        })
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["details"]["retry_after_secs"], 42);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) =
            body_of(PanelError::RactorError("mailbox closed at 0xdead".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("0xdead"));
    }
}
