//! Configuration for the `turnstile` binary.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file is read first when present.

use crate::workflow::Timings;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use turnstile_api::client::DEFAULT_BASE_URL;
use turnstile_api::{CurrentUser, Role, Session};

/// Configuration values that parse but cannot be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `TURNSTILE_USER_ROLE` is not a known role
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// `TURNSTILE_METRICS_ADDR` is not a socket address
    #[error("Invalid metrics address {value}: {reason}")]
    InvalidAddress {
        /// Configured value
        value: String,
        /// Parser message
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ticketing API connection
    pub api: ApiConfig,
    /// Signed-in account
    pub user: UserConfig,
    /// Scanner behaviour
    pub scanner: ScannerConfig,
    /// Metrics and shutdown
    pub observability: ObservabilityConfig,
}

/// Ticketing API connection
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL including the version prefix
    pub url: String,
    /// Bearer token
    pub token: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// The account the token belongs to
#[derive(Debug, Clone, Default)]
pub struct UserConfig {
    /// Account id
    pub id: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Role name; no role means nobody is signed in
    pub role: Option<String>,
}

/// Scanner behaviour
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// File or FIFO the decoded payloads are read from
    pub camera_feed: Option<PathBuf>,
    /// Same-payload suppression window in milliseconds (default: 3000)
    pub duplicate_window_ms: u64,
    /// Re-arm delay after an admission in milliseconds (default: 2000)
    pub rearm_delay_ms: u64,
    /// Success modal lifetime in milliseconds (default: 3000)
    pub success_modal_ms: u64,
    /// Results kept in the history (default: 10)
    pub history_limit: usize,
}

/// Metrics and shutdown
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Prometheus listener address; unset disables the exporter
    pub metrics_addr: Option<String>,
    /// Graceful shutdown timeout in seconds (default: 5)
    pub shutdown_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let number = |key: &str, default: u64| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            api: ApiConfig {
                url: text("TURNSTILE_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                token: text("TURNSTILE_API_TOKEN"),
                timeout_secs: number("TURNSTILE_API_TIMEOUT_SECS", 30),
            },
            user: UserConfig {
                id: text("TURNSTILE_USER_ID"),
                name: text("TURNSTILE_USER_NAME"),
                email: text("TURNSTILE_USER_EMAIL"),
                role: text("TURNSTILE_USER_ROLE"),
            },
            scanner: ScannerConfig {
                camera_feed: text("TURNSTILE_CAMERA_FEED").map(PathBuf::from),
                duplicate_window_ms: number("TURNSTILE_DUPLICATE_WINDOW_MS", 3_000),
                rearm_delay_ms: number("TURNSTILE_REARM_DELAY_MS", 2_000),
                success_modal_ms: number("TURNSTILE_SUCCESS_MODAL_MS", 3_000),
                history_limit: lookup("TURNSTILE_HISTORY_LIMIT")
                    .and_then(|s| s.trim().parse().ok())
                    .filter(|limit| *limit > 0)
                    .unwrap_or(crate::state::DEFAULT_HISTORY_LIMIT),
            },
            observability: ObservabilityConfig {
                metrics_addr: text("TURNSTILE_METRICS_ADDR"),
                shutdown_timeout_secs: number("TURNSTILE_SHUTDOWN_TIMEOUT_SECS", 5),
            },
        }
    }

    /// Session described by the API and user settings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRole`] for an unknown role name
    pub fn session(&self) -> Result<Session, ConfigError> {
        let user = match &self.user.role {
            Some(role) => {
                let role: Role = role
                    .parse()
                    .map_err(|_| ConfigError::InvalidRole(role.clone()))?;
                Some(CurrentUser {
                    id: self.user.id.clone().unwrap_or_default(),
                    name: self.user.name.clone().unwrap_or_default(),
                    email: self.user.email.clone().unwrap_or_default(),
                    role,
                })
            },
            None => None,
        };

        Ok(Session {
            api_url: self.api.url.clone(),
            token: self.api.token.clone(),
            user,
        })
    }

    /// Workflow durations and limits
    #[must_use]
    pub const fn timings(&self) -> Timings {
        Timings {
            duplicate_window: Duration::from_millis(self.scanner.duplicate_window_ms),
            rearm_delay: Duration::from_millis(self.scanner.rearm_delay_ms),
            success_modal: Duration::from_millis(self.scanner.success_modal_ms),
            history_limit: self.scanner.history_limit,
        }
    }

    /// HTTP request timeout
    #[must_use]
    pub const fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Graceful shutdown timeout
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.observability.shutdown_timeout_secs)
    }

    /// Parsed metrics listener address
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if the address does not parse
    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.observability
            .metrics_addr
            .as_deref()
            .map(|value| {
                value.parse().map_err(|e: std::net::AddrParseError| {
                    ConfigError::InvalidAddress {
                        value: value.to_string(),
                        reason: e.to_string(),
                    }
                })
            })
            .transpose()
    }
}
