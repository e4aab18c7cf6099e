//! Check-in workflow state.

use crate::debouncer::ScanDebouncer;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use turnstile_api::types::percent;
use turnstile_api::{AttendeeStats, AttendeeSummary, CheckinResponse, EventSummary};

/// Default number of results kept in the history
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Outcome of one check-in attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Whether the ticket was checked in
    pub success: bool,
    /// Attendee details on success
    pub attendee: Option<AttendeeSummary>,
    /// Text shown to the operator
    pub message: String,
    /// When the result was produced
    pub timestamp: DateTime<Utc>,
}

impl ScanResult {
    /// Result reported by the server; `received_at` stands in for a missing
    /// server timestamp
    #[must_use]
    pub fn from_response(response: CheckinResponse, received_at: DateTime<Utc>) -> Self {
        Self {
            success: response.success,
            attendee: response.attendee,
            message: response.message,
            timestamp: response.timestamp.unwrap_or(received_at),
        }
    }

    /// Failed attempt with `message`
    pub fn failure(message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            attendee: None,
            message: message.into(),
            timestamp,
        }
    }
}

/// Recent results, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanHistory {
    entries: VecDeque<ScanResult>,
}

impl ScanHistory {
    /// Prepend `result`, dropping the oldest entries beyond `limit`
    pub fn push(&mut self, result: ScanResult, limit: usize) {
        self.entries.push_front(result);
        self.entries.truncate(limit);
    }

    /// Entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &ScanResult> {
        self.entries.iter()
    }

    /// Most recent entry
    #[must_use]
    pub fn latest(&self) -> Option<&ScanResult> {
        self.entries.front()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing has been scanned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Share of successful entries, rounded percent
    #[must_use]
    pub fn success_rate(&self) -> u64 {
        let successes = self.entries.iter().filter(|r| r.success).count();
        percent(successes as u64, self.entries.len() as u64)
    }
}

/// Where the camera is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CameraStatus {
    /// Availability not probed yet
    #[default]
    Unknown,
    /// No camera on this device
    Unavailable,
    /// Camera present and switched off
    Off,
    /// Start requested, waiting for the feed
    Starting,
    /// Feed open, scans are being decoded
    Active,
    /// The camera failed; manual entry only until retried
    Failed {
        /// Operator-facing message
        message: String,
    },
}

/// Dialog on top of the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    /// Ticket checked in
    Success {
        /// The successful result
        result: ScanResult,
        /// Identifies the auto-dismiss timer allowed to close it
        seq: u64,
    },
    /// Something went wrong
    Error {
        /// Operator-facing message
        message: String,
    },
}

/// Coarse phase of the workflow, derived from state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No event selected
    Idle,
    /// Event selected, camera off
    EventSelected,
    /// Camera starting or active
    Scanning,
    /// Camera unavailable or failed; only manual entry works
    ManualEntry,
}

/// Everything the check-in screen shows
#[derive(Debug, Clone, Default)]
pub struct CheckinState {
    /// Events owned by the host
    pub events: Vec<EventSummary>,
    /// Event list request in flight
    pub events_loading: bool,
    /// Event check-ins are recorded against
    pub selected_event: Option<String>,
    /// Camera lifecycle
    pub camera: CameraStatus,
    /// Incremented per camera start; feeds from older sessions are ignored
    pub camera_session: u64,
    /// Gate for decoded payloads
    pub debouncer: ScanDebouncer,
    /// Recent results
    pub history: ScanHistory,
    /// Result of the latest attempt, including local rejections
    pub last_result: Option<ScanResult>,
    /// Attendance counters of the selected event
    pub stats: AttendeeStats,
    /// Open dialog
    pub modal: Option<Modal>,
    /// Last success-modal sequence number handed out
    pub modal_seq: u64,
    /// Check-in requests awaiting an answer
    pub in_flight: usize,
    /// Workflow torn down; further input is ignored
    pub disposed: bool,
}

impl CheckinState {
    /// Derived workflow phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        if self.selected_event.is_none() {
            return Phase::Idle;
        }
        match self.camera {
            CameraStatus::Starting | CameraStatus::Active => Phase::Scanning,
            CameraStatus::Unavailable | CameraStatus::Failed { .. } => Phase::ManualEntry,
            CameraStatus::Unknown | CameraStatus::Off => Phase::EventSelected,
        }
    }

    /// Whether the camera toggle is on
    #[must_use]
    pub const fn is_camera_on(&self) -> bool {
        matches!(self.camera, CameraStatus::Starting | CameraStatus::Active)
    }

    /// The selected event's summary, if loaded
    #[must_use]
    pub fn selected(&self) -> Option<&EventSummary> {
        let id = self.selected_event.as_deref()?;
        self.events.iter().find(|event| event.id == id)
    }

    /// Whether `event_id` is the selected event
    #[must_use]
    pub fn is_selected(&self, event_id: &str) -> bool {
        self.selected_event.as_deref() == Some(event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{accepted, fixed_timestamp};

    fn failed(message: &str) -> ScanResult {
        ScanResult::failure(message, fixed_timestamp())
    }

    #[test]
    fn test_history_is_newest_first_and_capped() {
        let mut history = ScanHistory::default();
        for n in 0..12 {
            history.push(failed(&format!("scan {n}")), DEFAULT_HISTORY_LIMIT);
        }

        assert_eq!(history.len(), 10);
        assert_eq!(history.latest().map(|r| r.message.as_str()), Some("scan 11"));
        assert_eq!(history.iter().last().map(|r| r.message.as_str()), Some("scan 2"));
    }

    #[test]
    fn test_success_rate() {
        let mut history = ScanHistory::default();
        assert_eq!(history.success_rate(), 0);

        history.push(
            ScanResult::from_response(accepted("Jane Doe", "A"), fixed_timestamp()),
            10,
        );
        history.push(failed("Ticket already used"), 10);
        history.push(failed("Ticket not found"), 10);
        assert_eq!(history.success_rate(), 33);
    }

    #[test]
    fn test_phase_follows_event_and_camera() {
        let mut state = CheckinState::default();
        assert_eq!(state.phase(), Phase::Idle);

        state.camera = CameraStatus::Active;
        assert_eq!(state.phase(), Phase::Idle);

        state.selected_event = Some("E1".to_string());
        assert_eq!(state.phase(), Phase::Scanning);

        state.camera = CameraStatus::Off;
        assert_eq!(state.phase(), Phase::EventSelected);

        state.camera = CameraStatus::Failed {
            message: "Camera error: Permission denied".to_string(),
        };
        assert_eq!(state.phase(), Phase::ManualEntry);
    }
}
