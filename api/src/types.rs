//! Wire types for the ticketing API
//!
//! One schema per payload. Check-in payloads use camelCase names; event,
//! stats and admin payloads use the snake_case names the server sends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ===== Host: events and check-in =====

/// An event owned by the signed-in host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event id
    pub id: String,
    /// Event title
    pub title: String,
    /// Start date as sent by the server
    pub start_date: String,
    /// Venue
    pub location: String,
}

/// Attendee details returned with a check-in result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeSummary {
    /// Ticket holder id
    pub id: String,
    /// Ticket holder name
    pub name: String,
    /// Ticket holder email
    pub email: String,
    /// Event title
    pub event: String,
    /// Ticket tier (e.g. "VIP")
    pub ticket_type: String,
    /// The payload that was scanned
    pub qr_code: String,
    /// Ticket status after the check-in
    pub status: String,
    /// When the ticket was checked in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_in_at: Option<DateTime<Utc>>,
}

/// Body of `POST /hosts/me/attendees/checkin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    /// Decoded ticket payload
    pub qr_code: String,
    /// Event the host is checking in for
    pub event_id: String,
}

/// Outcome of a check-in as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinResponse {
    /// Whether the ticket was accepted
    pub success: bool,
    /// Present on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee: Option<AttendeeSummary>,
    /// Human-readable outcome
    pub message: String,
    /// Server time of the check-in attempt, when the server reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Aggregate attendance counters for one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeStats {
    /// Tickets issued
    pub total: u64,
    /// Tickets already checked in
    pub checked_in: u64,
    /// Tickets still valid and not yet used
    pub active: u64,
    /// Cancelled tickets
    pub cancelled: u64,
}

impl AttendeeStats {
    /// Checked-in share of all tickets, rounded to a whole percent
    #[must_use]
    pub fn check_in_rate(&self) -> u64 {
        percent(self.checked_in, self.total)
    }
}

/// Body of `GET /hosts/me/events/{id}/attendees`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EventAttendees {
    pub(crate) stats: AttendeeStats,
}

// ===== Accounts and roles =====

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Ticket buyer without host access
    Guest,
    /// Registered user
    User,
    /// Event host
    Host,
    /// Host with extended privileges
    Superhost,
    /// Platform administrator
    Admin,
}

impl Role {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Host => "host",
            Self::Superhost => "superhost",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "user" => Ok(Self::User),
            "host" => Ok(Self::Host),
            "superhost" => Ok(Self::Superhost),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

// ===== Admin =====

/// Platform-wide counters for the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    /// All accounts
    pub total_users: u64,
    /// Accounts with the guest role
    pub guest_users: u64,
    /// Accounts with the host role
    pub host_users: u64,
    /// Accounts with the admin role
    pub admin_users: u64,
    /// Published events
    pub total_events: u64,
    /// Tickets sold
    pub total_tickets: u64,
    /// Accounts subscribed to the newsletter
    pub newsletter_subscribers: u64,
}

impl PlatformStats {
    /// Guest share of users (%)
    #[must_use]
    pub fn guest_share(&self) -> u64 {
        percent(self.guest_users, self.total_users)
    }

    /// Host share of users (%)
    #[must_use]
    pub fn host_share(&self) -> u64 {
        percent(self.host_users, self.total_users)
    }

    /// Admin share of users (%)
    #[must_use]
    pub fn admin_share(&self) -> u64 {
        percent(self.admin_users, self.total_users)
    }

    /// Newsletter share of users (%)
    #[must_use]
    pub fn newsletter_share(&self) -> u64 {
        percent(self.newsletter_subscribers, self.total_users)
    }

    /// Events per host, one decimal
    #[must_use]
    pub fn events_per_host(&self) -> f64 {
        ratio(self.total_events, self.host_users)
    }

    /// Tickets per event, one decimal
    #[must_use]
    pub fn tickets_per_event(&self) -> f64 {
        ratio(self.total_tickets, self.total_events)
    }

    /// Tickets per user, one decimal
    #[must_use]
    pub fn tickets_per_user(&self) -> f64 {
        ratio(self.total_tickets, self.total_users)
    }
}

/// A row of the admin user list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User id
    pub id: String,
    /// Display name
    pub name: String,
    /// Login handle
    pub username: String,
    /// Email address
    pub email: String,
    /// Current role
    pub role: Role,
    /// Newsletter opt-in
    #[serde(default)]
    pub newsletter_subscribed: bool,
    /// Account creation time as sent by the server
    pub created_at: String,
}

/// A user together with their tickets and hosted events
#[derive(Debug, Clone, PartialEq)]
pub struct UserDetails {
    /// The user
    pub user: UserRecord,
    /// Tickets, passed through as sent
    pub tickets: Vec<serde_json::Value>,
    /// Hosted events, passed through as sent
    pub events: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserDetailsResponse {
    pub(crate) user: UserRecord,
    #[serde(default)]
    pub(crate) tickets: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub(crate) events: Option<Vec<serde_json::Value>>,
}

impl From<UserDetailsResponse> for UserDetails {
    fn from(response: UserDetailsResponse) -> Self {
        Self {
            user: response.user,
            tickets: response.tickets.unwrap_or_default(),
            events: response.events.unwrap_or_default(),
        }
    }
}

/// Event reference embedded in a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Event id
    pub id: String,
    /// Event title
    pub title: String,
}

/// Payer reference embedded in a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionUser {
    /// User id
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
}

/// A payment transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id
    pub id: String,
    /// Payment provider reference
    pub reference: String,
    /// Amount in major currency units
    pub amount: f64,
    /// ISO currency code
    pub currency: String,
    /// `pending`, `completed`, `failed`, ...
    pub status: String,
    /// Payment method
    pub method: String,
    /// Creation time as sent by the server
    pub created_at: String,
    /// Settlement time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
    /// Provider failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Event paid for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<TransactionEvent>,
    /// Payer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<TransactionUser>,
}

impl Transaction {
    /// Whether the payment settled
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// One page of a paginated admin listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows on this page
    pub data: Vec<T>,
    /// Rows across all pages
    pub total: u64,
    /// Whether a later page exists
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

impl Page<Transaction> {
    /// Sum of completed amounts on this page
    #[must_use]
    pub fn completed_amount(&self) -> f64 {
        self.data
            .iter()
            .filter(|t| t.is_completed())
            .map(|t| t.amount)
            .sum()
    }
}

/// Default page size for admin listings
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Filter value meaning "no filter"
const ALL: &str = "all";

/// Query for `GET /admin/users`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Free-text search
    pub search: Option<String>,
    /// Role filter; `"all"` means no filter
    pub role: Option<String>,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            search: None,
            role: None,
        }
    }
}

impl UserQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.max(1).to_string()), ("limit", self.limit.to_string())];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(role) = self.role.as_deref().filter(|r| !r.is_empty() && *r != ALL) {
            pairs.push(("role", role.to_string()));
        }
        pairs
    }
}

/// Query for `GET /admin/transactions`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Status filter; `"all"` means no filter
    pub status: Option<String>,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            status: None,
        }
    }
}

impl TransactionQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.max(1).to_string()), ("limit", self.limit.to_string())];
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty() && *s != ALL) {
            pairs.push(("status", status.to_string()));
        }
        pairs
    }
}

// ===== Auth and health =====

/// Body of `PUT /admin/users/{id}/role`
#[derive(Debug, Serialize)]
pub(crate) struct RoleUpdate {
    pub(crate) role: Role,
}

/// Body of `POST /auth/forgot-password`
#[derive(Debug, Serialize)]
pub(crate) struct ForgotPasswordRequest<'a> {
    pub(crate) email: &'a str,
}

/// Result of `GET /health`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// The API answered with a 2xx status
    Reachable,
    /// The API answered with another status
    Unhealthy(u16),
}

// ===== Derived figures =====

/// `round(part / whole * 100)`, 0 when `whole` is 0
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn percent(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u64
}

/// `part / whole` rounded to one decimal, 0 when `whole` is 0
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 10.0).round() / 10.0
}
