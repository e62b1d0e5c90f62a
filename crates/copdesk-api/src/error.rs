use serde::Deserialize;
use thiserror::Error;

/// Error returned by [`crate::ApiClient`] calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with its error envelope.
    #[error("{message}")]
    Api {
        /// Short human-readable summary.
        message: String,
        /// Longer diagnostic text.
        details: String,
    },
    /// The request never produced a backend answer.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered with a body the envelope could not be read from.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Discriminated result envelope used by every backend endpoint.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope<T> {
    Success { response: T },
    Error { message: String, details: String },
}

impl<T> Envelope<T> {
    /// Unwraps the envelope into a typed result.
    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            Envelope::Success { response } => Ok(response),
            Envelope::Error { message, details } => Err(ApiError::Api { message, details }),
        }
    }
}
