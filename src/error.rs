//! Crate-level error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::Level;

use crate::config::ConfigError;
use crate::observability::LoggingError;
use crate::routing::RouteLoadError;
use crate::rpc::MethodTableError;

/// Errors answered directly over HTTP, outside the RPC envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HttpError::Forbidden(_) => StatusCode::FORBIDDEN,
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Severity the error is logged at.
    pub fn log_level(&self) -> Level {
        match self {
            HttpError::BadRequest(_) | HttpError::Unauthorized(_) | HttpError::NotFound(_) => Level::INFO,
            HttpError::Forbidden(_) | HttpError::PayloadTooLarge(_) => Level::WARN,
            HttpError::Internal(_) => Level::ERROR,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            HttpError::BadRequest(_) => "Bad Request",
            HttpError::Unauthorized(_) => "Authentication Required",
            HttpError::Forbidden(_) => "Forbidden",
            HttpError::NotFound(_) => "Not Found",
            HttpError::PayloadTooLarge(_) => "Payload Too Large",
            HttpError::Internal(_) => "Internal Server Error",
        }
    }

    /// Client-facing message; internal detail is replaced.
    pub fn public_message(&self) -> &str {
        match self {
            HttpError::BadRequest(m)
            | HttpError::Unauthorized(m)
            | HttpError::Forbidden(m)
            | HttpError::NotFound(m)
            | HttpError::PayloadTooLarge(m) => m,
            HttpError::Internal(_) => "An internal error occurred",
        }
    }

    /// Emit this error at its own severity.
    pub fn log(&self) {
        match self.log_level() {
            Level::ERROR => tracing::error!(status = self.status().as_u16(), error = %self, "Request failed"),
            Level::WARN => tracing::warn!(status = self.status().as_u16(), error = %self, "Request failed"),
            _ => tracing::info!(status = self.status().as_u16(), error = %self, "Request failed"),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.title(),
            "message": self.public_message(),
        });
        if let HttpError::Unauthorized(_) = self {
            body["timestamp"] = json!(chrono::Utc::now().to_rfc3339());
        }
        (self.status(), Json(body)).into_response()
    }
}

/// Anything that stops the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Routes(#[from] RouteLoadError),

    #[error(transparent)]
    Methods(#[from] MethodTableError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("no handler registered for: {}", .0.join(", "))]
    MissingHandlers(Vec<String>),

    #[error("invalid route options:\n  {}", .0.join("\n  "))]
    InvalidRoutes(Vec<String>),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS setup failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error("metrics exporter failed: {0}")]
    Metrics(String),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_statuses_and_levels() {
        let cases = [
            (HttpError::BadRequest("x".into()), 400, Level::INFO),
            (HttpError::Unauthorized("x".into()), 401, Level::INFO),
            (HttpError::Forbidden("x".into()), 403, Level::WARN),
            (HttpError::NotFound("x".into()), 404, Level::INFO),
            (HttpError::PayloadTooLarge("x".into()), 413, Level::WARN),
            (HttpError::Internal("x".into()), 500, Level::ERROR),
        ];
        for (err, status, level) in cases {
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.log_level(), level);
        }
    }

    #[tokio::test]
    async fn test_internal_body_hides_detail() {
        let response = HttpError::Internal("stack trace here".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("stack trace"));
        assert!(text.contains("Internal Server Error"));
    }

    #[tokio::test]
    async fn test_unauthorized_body_is_timestamped() {
        let response = HttpError::Unauthorized("Session required".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Authentication Required");
        assert_eq!(body["message"], "Session required");
        assert!(body["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
    }
}
