//! Error types for the data layer.

use thiserror::Error;

/// Backend API error.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("no API key configured")]
    MissingCredentials,

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

/// Failure to persist one span record.
///
/// Spans are best-effort: callers log this and move on, they never retry or
/// roll back session state.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("span not persisted: {0}")]
    Backend(#[from] BackendError),
}
