//! Error types for the Turnstile API client

use thiserror::Error;

/// Errors that can occur when talking to the ticketing API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured base URL cannot be used
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Unauthorized - missing or expired token
    #[error("Unauthorized - sign in again")]
    Unauthorized,

    /// API returned an error
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },
}

impl ApiError {
    /// Message suitable for showing to a person at the door
    ///
    /// Server-reported errors show the server's own text; everything else
    /// falls back to the error's display form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status, when the server answered
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let error = ApiError::Api {
            status: 404,
            message: "Ticket not found".to_string(),
        };
        assert_eq!(error.user_message(), "Ticket not found");
        assert_eq!(error.status(), Some(404));
    }

    #[test]
    fn test_user_message_falls_back_to_display() {
        let error = ApiError::RequestFailed("connection refused".to_string());
        assert_eq!(error.user_message(), "Request failed: connection refused");
        assert_eq!(error.status(), None);
    }
}
