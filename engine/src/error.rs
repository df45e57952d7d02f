//! Engine error types

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Terminal errors surfaced to the engine caller
///
/// Every Display string is self-contained: fallback errors name each model
/// that was tried, so the transport layer can show the message as-is.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Provider response could not be used: {message}")]
    MalformedResponse { message: String },

    #[error("Provider rejected the request: {message}")]
    ProviderRejected { message: String },

    #[error("Provider throttled the request: {message}")]
    ProviderThrottled { message: String },

    #[error("No provider model was reachable: {message}")]
    ProviderUnavailable { message: String },

    #[error("No usable image was produced: {message}")]
    NoImageProduced { message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] shared::SharedError),
}

impl EngineError {
    pub fn malformed(message: impl Into<String>) -> Self {
        EngineError::MalformedResponse {
            message: message.into(),
        }
    }
}
