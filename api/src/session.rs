//! Signed-in session and role gates

use crate::client::HttpApiClient;
use crate::error::ApiError;
use crate::types::Role;
use std::time::Duration;
use thiserror::Error;

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Account id
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Role, which decides the areas the account may use
    pub role: Role,
}

impl CurrentUser {
    /// Hosts, superhosts and admins may run check-in
    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self.role, Role::Host | Role::Superhost | Role::Admin)
    }

    /// Only admins may use the admin area
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// Reasons an area is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Nobody is signed in
    #[error("Sign in required")]
    SignInRequired,
    /// Guests are refused host mode
    #[error("Guests cannot use host mode")]
    GuestNotAllowed,
    /// Signed in, but not as a host
    #[error("Host access required")]
    HostRequired,
    /// Signed in, but not as an admin
    #[error("Admin access required")]
    AdminRequired,
}

/// Everything needed to talk to the API on someone's behalf
#[derive(Debug, Clone)]
pub struct Session {
    /// API base URL
    pub api_url: String,
    /// Bearer token
    pub token: Option<String>,
    /// The signed-in account, if any
    pub user: Option<CurrentUser>,
}

impl Session {
    /// Gate for the host area (check-in, event stats)
    ///
    /// # Errors
    ///
    /// Returns the [`AccessError`] explaining the refusal
    pub fn require_host(&self) -> Result<&CurrentUser, AccessError> {
        let user = self.user.as_ref().ok_or(AccessError::SignInRequired)?;
        match user.role {
            Role::Guest => Err(AccessError::GuestNotAllowed),
            _ if user.is_host() => Ok(user),
            _ => Err(AccessError::HostRequired),
        }
    }

    /// Gate for the admin area
    ///
    /// # Errors
    ///
    /// Returns the [`AccessError`] explaining the refusal
    pub fn require_admin(&self) -> Result<&CurrentUser, AccessError> {
        let user = self.user.as_ref().ok_or(AccessError::SignInRequired)?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(AccessError::AdminRequired)
        }
    }

    /// Build an API client carrying this session's token
    ///
    /// # Errors
    ///
    /// See [`HttpApiClient::new`]
    pub fn client(&self, timeout: Duration) -> Result<HttpApiClient, ApiError> {
        HttpApiClient::new(self.api_url.clone(), self.token.clone(), timeout)
    }
}
