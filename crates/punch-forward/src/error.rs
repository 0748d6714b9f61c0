//! Error types for outbound HR API calls

use thiserror::Error;

/// Result type for forwarding operations
pub type ForwardResult<T> = Result<T, ForwardError>;

#[derive(Error, Debug)]
pub enum ForwardError {
    /// Request could not be sent or the response not read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HR API answered with a non-success status
    #[error("HR API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not what we expected
    #[error("Invalid response from HR API: {0}")]
    InvalidResponse(String),
}

impl ForwardError {
    /// Whether the remote end was reached at all
    pub fn is_transport(&self) -> bool {
        matches!(self, ForwardError::Http(_))
    }
}
