//! Client error types.

use thiserror::Error;

/// Message shown for transport failures and unexpected responses.
pub const GENERIC_FAILURE: &str = "Something went wrong, please try again";

#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered `success: false` or a non-2xx status
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Viewer may not see this lead
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Input blocked before any request was made
    #[error("{0}")]
    Validation(&'static str),

    /// Socket channel failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Text suitable for a user-facing notification.
    ///
    /// Server-provided messages are shown verbatim; transport and decoding
    /// failures collapse to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected { message, .. } | ClientError::AccessDenied(message) => {
                message.clone()
            }
            ClientError::Validation(message) => message.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, ClientError::AccessDenied(_))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
