//! Error handling middleware - RFC 7807 compliant responses.

use std::fmt;
use std::time::Duration;

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use vaultcord_core::DiscordError;
use vaultcord_shared::ErrorResponse;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    /// Upstream quota exhausted; the caller should retry after the window.
    RateLimited(Duration),
    /// Discord answered, but not with something usable.
    BadGateway(String),
    /// No bot token configured.
    Unavailable(String),
    Internal(String),
}

impl AppError {
    /// `Retry-After` in whole seconds, never zero.
    fn retry_after_secs(wait: &Duration) -> u64 {
        wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {msg}"),
            AppError::RateLimited(wait) => write!(f, "Rate limited for {wait:?}"),
            AppError::BadGateway(msg) => write!(f, "Bad gateway: {msg}"),
            AppError::Unavailable(msg) => write!(f, "Unavailable: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());

        let error = match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::RateLimited(wait) => {
                let secs = Self::retry_after_secs(wait);
                builder.insert_header((header::RETRY_AFTER, secs.to_string()));
                ErrorResponse::too_many_requests(secs)
            }
            AppError::BadGateway(detail) => ErrorResponse::bad_gateway(detail),
            AppError::Unavailable(detail) => ErrorResponse::service_unavailable(detail),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
        };

        builder.json(error)
    }
}

impl From<DiscordError> for AppError {
    fn from(err: DiscordError) -> Self {
        match err {
            DiscordError::MissingToken => AppError::Unavailable(err.to_string()),
            DiscordError::RateLimited { retry_after } => AppError::RateLimited(retry_after),
            DiscordError::NotFound(resource) => {
                AppError::NotFound(format!("Discord resource {resource} not found"))
            }
            DiscordError::Unauthorized => {
                tracing::error!("Discord rejected the configured bot token");
                AppError::BadGateway(err.to_string())
            }
            DiscordError::Http(_) | DiscordError::Status { .. } | DiscordError::Decode(_) => {
                tracing::warn!(error = %err, "Discord request failed");
                AppError::BadGateway(err.to_string())
            }
            DiscordError::Queue(_) => AppError::Internal(err.to_string()),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
