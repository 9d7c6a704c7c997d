use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Failed to fetch metadata: {0}")]
    FetchError(String),

    #[error("Request timeout: {0}")]
    TimeoutError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Response body exceeds {limit} bytes (read {size})")]
    ContentTooLarge { size: usize, limit: usize },

    #[error("Failed to parse metadata response: {0}")]
    ParseError(String),

    #[error("Failed to extract metadata: {0}")]
    ExtractError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PreviewError {
    pub fn log(&self) {
        match self {
            PreviewError::InvalidLink(e) => {
                warn!(error = %e, "Link rejected");
            }
            PreviewError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            PreviewError::FetchError(e) => {
                error!(error = %e, "Metadata fetch failed");
            }
            PreviewError::TimeoutError(e) => {
                warn!(error = %e, "Request timed out");
            }
            PreviewError::ConnectionError(e) => {
                error!(error = %e, "Connection to metadata service failed");
            }
            PreviewError::NotFound(e) => {
                warn!(error = %e, "Metadata service returned not found");
            }
            PreviewError::ServerError { status, message } => {
                error!(
                    status = %status,
                    error = %message,
                    "Metadata service returned an error status"
                );
            }
            PreviewError::ContentTooLarge { size, limit } => {
                warn!(size = %size, limit = %limit, "Response body too large");
            }
            PreviewError::ParseError(e) => {
                warn!(error = %e, "Metadata response could not be decoded");
            }
            PreviewError::ExtractError(e) => {
                warn!(error = %e, "Metadata extraction failed");
            }
            PreviewError::ConfigError(e) => {
                error!(error = %e, "Invalid configuration");
            }
        }
    }

    /// Transport-level failures: the request never produced a usable body.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PreviewError::FetchError(_)
                | PreviewError::TimeoutError(_)
                | PreviewError::ConnectionError(_)
                | PreviewError::NotFound(_)
                | PreviewError::ServerError { .. }
                | PreviewError::ContentTooLarge { .. }
                | PreviewError::ParseError(_)
        )
    }
}

impl From<reqwest::Error> for PreviewError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PreviewError::TimeoutError(err.to_string())
        } else if err.is_connect() {
            PreviewError::ConnectionError(err.to_string())
        } else if err.is_decode() {
            PreviewError::ParseError(err.to_string())
        } else if let Some(status) = err.status() {
            PreviewError::from_status(status.as_u16(), err.to_string())
        } else {
            PreviewError::FetchError(err.to_string())
        }
    }
}

impl PreviewError {
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => PreviewError::NotFound(message),
            _ => PreviewError::ServerError { status, message },
        }
    }
}
