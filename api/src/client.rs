//! HTTP client for the ticketing API

use crate::error::ApiError;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Ticketing API client
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl HttpApiClient {
    /// Create a client for `base_url` (e.g. `https://tickets.example.com/api/v1`)
    ///
    /// Every request carries `Authorization: Bearer <token>` when a token is
    /// given, and is abandoned after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if `base_url` is not an http(s) URL,
    /// or [`ApiError::RequestFailed`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let parsed = reqwest::Url::parse(&base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl(base_url));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// The base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests carry a bearer token
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) async fn send(builder: RequestBuilder) -> Result<Response, ApiError> {
        builder
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))
    }

    /// Decode a 2xx body as `T`, or turn the response into an error
    pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        match response.status() {
            status if status.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| ApiError::ResponseParseFailed(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(error_from_body(status, &body, None))
            },
        }
    }

    /// Like [`Self::decode`] for endpoints whose success body is irrelevant
    pub(crate) async fn expect_success(response: Response) -> Result<(), ApiError> {
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(error_from_body(status, &body, None))
            },
        }
    }
}

/// Build an [`ApiError::Api`] from an error response body
///
/// Uses the body's `message` or `error` field, then `fallback`, then the
/// status line.
pub(crate) fn error_from_body(status: StatusCode, body: &str, fallback: Option<&str>) -> ApiError {
    let from_body = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"].iter().find_map(|key| {
                value
                    .get(key)
                    .and_then(serde_json::Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        });

    let message = from_body
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_else(|| status.to_string());

    ApiError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpApiClient::new(
            "https://tickets.example.com/api/v1/",
            Some("s3cret".to_string()),
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://tickets.example.com/api/v1");
        assert!(client.is_authenticated());
        assert!(!format!("{client:?}").contains("s3cret"));
    }

    #[test]
    fn test_empty_token_is_no_token() {
        let client = HttpApiClient::new(DEFAULT_BASE_URL, Some(String::new()), DEFAULT_TIMEOUT).unwrap();
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        assert!(matches!(
            HttpApiClient::new("ftp://example.com", None, DEFAULT_TIMEOUT),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            HttpApiClient::new("not a url", None, DEFAULT_TIMEOUT),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_error_from_body_prefers_message_then_error() {
        let error = error_from_body(StatusCode::BAD_REQUEST, r#"{"message":"Ticket already used"}"#, None);
        assert_eq!(error.user_message(), "Ticket already used");

        let error = error_from_body(StatusCode::BAD_REQUEST, r#"{"error":"Email not found"}"#, Some("x"));
        assert_eq!(error.user_message(), "Email not found");

        let error = error_from_body(StatusCode::BAD_GATEWAY, "<html>", Some("Failed to send reset email"));
        assert_eq!(error.user_message(), "Failed to send reset email");

        let error = error_from_body(StatusCode::BAD_GATEWAY, "", None);
        assert_eq!(error.user_message(), "502 Bad Gateway");
    }
}
