//! # Turnstile API
//!
//! Typed client for the ticketing REST API.
//!
//! - [`HostApi`]: the host-side calls the check-in workflow depends on,
//!   implemented by [`HttpApiClient`]
//! - Admin, account and health calls as inherent methods on [`HttpApiClient`]
//! - [`Session`]: explicit session context and role gates
//!
//! ## Example
//!
//! ```no_run
//! use turnstile_api::{HttpApiClient, client::DEFAULT_TIMEOUT};
//!
//! # async fn example() -> Result<(), turnstile_api::ApiError> {
//! let client = HttpApiClient::new(
//!     "https://tickets.example.com/api/v1",
//!     Some("token".to_string()),
//!     DEFAULT_TIMEOUT,
//! )?;
//! let result = client
//!     .post_checkin(turnstile_api::types::CheckinRequest {
//!         qr_code: "ABC123".to_string(),
//!         event_id: "evt-1".to_string(),
//!     })
//!     .await?;
//! println!("{}", result.message);
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod admin;
pub mod client;
pub mod error;
pub mod host;
pub mod session;
pub mod types;

pub use client::HttpApiClient;
pub use error::ApiError;
pub use host::{ApiResult, HostApi};
pub use session::{AccessError, CurrentUser, Session};
pub use types::{
    AttendeeStats, AttendeeSummary, CheckinResponse, EventSummary, Health, Page, PlatformStats,
    Role, Transaction, UserDetails, UserRecord,
};
