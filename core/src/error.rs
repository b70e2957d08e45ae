//! Error types for the tracker API client.
//!
//! # Design
//! Every failure the client can report is a variant of one flat `Error` enum,
//! so callers branch on the variant rather than on message text.
//! `Authentication` and `RateLimit` get dedicated variants because callers
//! react to them differently (fix the key, or sleep for `retry_after`).
//! Everything else the upstream returns lands in `Api` with whatever context
//! was available: status code, decoded error body, or raw text.

use serde_json::Value;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the request pipeline and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The upstream call failed: a non-success status, a timeout, an
    /// unreachable host, or an undecodable body.
    #[error("{message}")]
    Api {
        message: String,
        status: Option<u16>,
        body: Option<Value>,
    },

    /// The server returned 401.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server returned 429 on the final attempt.
    #[error("rate limit exceeded, retry after {retry_after} seconds")]
    RateLimit { retry_after: u64 },

    /// An argument was rejected before any network access.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested operation is not in the registry.
    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),

    /// Settings could not be resolved, loaded, or saved.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn api(message: impl Into<String>) -> Self {
        Error::Api {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// HTTP status carried by an `Api` error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => *status,
            Error::Authentication(_) => Some(401),
            Error::RateLimit { .. } => Some(429),
            _ => None,
        }
    }

    /// Seconds the server asked us to wait, for `RateLimit` errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::RateLimit { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
