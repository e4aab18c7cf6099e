//! Account and reachability endpoints

use crate::client::{HttpApiClient, error_from_body};
use crate::error::ApiError;
use crate::types::{ForgotPasswordRequest, Health};
use reqwest::Method;
use serde::Deserialize;

/// Shown when the server rejects a reset request without saying why
const RESET_FAILED: &str = "Failed to send reset email";

/// Shown when the server accepts a reset request without a message
const RESET_SENT: &str = "Password reset link sent to your email";

#[derive(Debug, Default, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

impl HttpApiClient {
    /// `POST /auth/forgot-password`
    ///
    /// Returns the server's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Api`] carrying the server's `error` text (or
    /// "Failed to send reset email") when the request is rejected
    #[tracing::instrument(skip(self, email))]
    pub async fn forgot_password(&self, email: &str) -> Result<String, ApiError> {
        let response = Self::send(
            self.request(Method::POST, "/auth/forgot-password")
                .json(&ForgotPasswordRequest { email }),
        )
        .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(error_from_body(status, &body, Some(RESET_FAILED)));
        }

        let parsed: MessageBody = serde_json::from_str(&body).unwrap_or_default();
        Ok(parsed
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| RESET_SENT.to_string()))
    }

    /// `GET /health`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] if the server cannot be reached
    #[tracing::instrument(skip(self))]
    pub async fn health(&self) -> Result<Health, ApiError> {
        let response = Self::send(self.request(Method::GET, "/health")).await?;
        let status = response.status();
        if status.is_success() {
            Ok(Health::Reachable)
        } else {
            Ok(Health::Unhealthy(status.as_u16()))
        }
    }
}
