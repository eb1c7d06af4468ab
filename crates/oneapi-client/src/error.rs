//! Error types for One API client operations

use thiserror::Error;

/// Result type alias for One API client operations
pub type Result<T> = std::result::Result<T, OneApiError>;

/// Errors that can occur during One API client operations
#[derive(Error, Debug)]
pub enum OneApiError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Too many requests (HTTP 429)
    #[error("Too many requests, please try again later")]
    RateLimited,

    /// Demo deployment without a backend (HTTP 405)
    #[error("This site is for demonstration only, there is no server")]
    DemoMode,

    /// Missing or rejected credentials (HTTP 401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Server returned a non-success HTTP status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Server answered with `success: false`
    #[error("{0}")]
    ApiError(String),

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request rejected client-side before sending
    #[error("Invalid input: {0}")]
    ValidationError(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl OneApiError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status associated with this failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited => Some(429),
            Self::DemoMode => Some(405),
            Self::ServerError { status, .. } => Some(*status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the server itself rejected the request (`success: false`)
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::ApiError(_))
    }
}

impl From<validator::ValidationErrors> for OneApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        Self::ValidationError(messages.join("; "))
    }
}
