use std::time::Duration;

/// Completion request failures
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("No API key configured for the completion endpoint")]
    MissingApiKey,

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Cannot reach the completion endpoint: {0}")]
    Connection(String),

    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CompletionError::Timeout(_))
    }

    /// Classify a transport error from reqwest
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout(timeout)
        } else if err.is_decode() {
            CompletionError::InvalidResponse(err.to_string())
        } else {
            CompletionError::Connection(err.to_string())
        }
    }
}
