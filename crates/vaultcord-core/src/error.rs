//! Domain-level error types.

use std::time::Duration;

use thiserror::Error;

use crate::ports::RateLimitError;

/// Errors returned when reading data from the Discord REST API.
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("Discord bot token is not configured")]
    MissingToken,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Discord rejected the bot token")]
    Unauthorized,

    #[error("Discord resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited by Discord, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Discord returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode Discord response: {0}")]
    Decode(String),

    #[error(transparent)]
    Queue(#[from] RateLimitError),
}

impl From<serde_json::Error> for DiscordError {
    fn from(err: serde_json::Error) -> Self {
        DiscordError::Decode(err.to_string())
    }
}
