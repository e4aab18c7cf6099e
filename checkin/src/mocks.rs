//! Scriptable stand-ins for the workflow's environment.
//!
//! Used by the unit and integration tests, and by anyone embedding the
//! workflow who wants to drive it without a server or a camera.

use crate::camera::{CameraError, FrameDecoder, PayloadStream};
use crate::notifier::{Notifier, Toast};
use chrono::{DateTime, Utc};
use futures::channel::mpsc;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use turnstile_api::{
    ApiError, ApiResult, AttendeeStats, AttendeeSummary, CheckinResponse, EventSummary, HostApi,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fixed timestamp used by the response builders
#[must_use]
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default()
}

/// An event owned by the signed-in host
pub fn event(id: &str, title: &str) -> EventSummary {
    EventSummary {
        id: id.to_string(),
        title: title.to_string(),
        start_date: "2025-01-01".to_string(),
        location: "Main Hall".to_string(),
    }
}

/// A checked-in attendee
pub fn attendee(name: &str, qr_code: &str) -> AttendeeSummary {
    AttendeeSummary {
        id: format!("att-{qr_code}"),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        event: "Launch Party".to_string(),
        ticket_type: "General".to_string(),
        qr_code: qr_code.to_string(),
        status: "checked_in".to_string(),
        checked_in_at: Some(fixed_timestamp()),
    }
}

/// Server accepted the ticket
pub fn accepted(name: &str, qr_code: &str) -> CheckinResponse {
    CheckinResponse {
        success: true,
        attendee: Some(attendee(name, qr_code)),
        message: "Check-in successful".to_string(),
        timestamp: Some(fixed_timestamp()),
    }
}

/// Server rejected the ticket with `message`
pub fn rejected(message: &str) -> CheckinResponse {
    CheckinResponse {
        success: false,
        attendee: None,
        message: message.to_string(),
        timestamp: Some(fixed_timestamp()),
    }
}

// ============================================================================
// Host API
// ============================================================================

/// Scripted answer to one check-in call
#[derive(Debug, Clone)]
pub enum MockCheckin {
    /// The server answers with this body
    Respond(CheckinResponse),
    /// The server answers with an error status carrying this message
    Fail(String),
    /// No response arrives
    Unreachable,
}

#[derive(Debug, Default)]
struct HostApiScript {
    events: Vec<EventSummary>,
    events_fail: bool,
    checkins: VecDeque<MockCheckin>,
    stats: HashMap<String, AttendeeStats>,
    checkin_calls: Vec<(String, String)>,
    stats_calls: Vec<String>,
    latency: Option<Duration>,
}

/// In-memory [`HostApi`]
///
/// Check-in answers are consumed in order; once the script is empty every
/// call fails with a 500. Clones share the script and the call log.
#[derive(Debug, Clone, Default)]
pub struct MockHostApi {
    script: Arc<Mutex<HostApiScript>>,
}

impl MockHostApi {
    /// Empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events returned by `list_events`
    #[must_use]
    pub fn with_events(self, events: Vec<EventSummary>) -> Self {
        lock(&self.script).events = events;
        self
    }

    /// Make `list_events` fail
    #[must_use]
    pub fn failing_events(self) -> Self {
        lock(&self.script).events_fail = true;
        self
    }

    /// Stats returned for `event_id`; other events fail with a 404
    #[must_use]
    pub fn with_stats(self, event_id: &str, stats: AttendeeStats) -> Self {
        lock(&self.script).stats.insert(event_id.to_string(), stats);
        self
    }

    /// Delay every call by `latency`
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        lock(&self.script).latency = Some(latency);
        self
    }

    /// Queue the answer to the next unanswered check-in
    pub fn push_checkin(&self, answer: MockCheckin) {
        lock(&self.script).checkins.push_back(answer);
    }

    /// `(qr_code, event_id)` of every check-in call so far
    #[must_use]
    pub fn checkin_calls(&self) -> Vec<(String, String)> {
        lock(&self.script).checkin_calls.clone()
    }

    /// Event ids of every stats call so far
    #[must_use]
    pub fn stats_calls(&self) -> Vec<String> {
        lock(&self.script).stats_calls.clone()
    }

    fn latency(&self) -> Option<Duration> {
        lock(&self.script).latency
    }
}

async fn wait(latency: Option<Duration>) {
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
}

impl HostApi for MockHostApi {
    fn list_events(&self) -> Pin<Box<dyn Future<Output = ApiResult<Vec<EventSummary>>> + Send>> {
        let script = lock(&self.script);
        let result = if script.events_fail {
            Err(ApiError::Api {
                status: 500,
                message: "Internal server error".to_string(),
            })
        } else {
            Ok(script.events.clone())
        };
        let latency = script.latency;
        drop(script);

        Box::pin(async move {
            wait(latency).await;
            result
        })
    }

    fn checkin(
        &self,
        qr_code: String,
        event_id: String,
    ) -> Pin<Box<dyn Future<Output = ApiResult<CheckinResponse>> + Send>> {
        let latency = self.latency();
        let answer = {
            let mut script = lock(&self.script);
            script.checkin_calls.push((qr_code, event_id));
            script.checkins.pop_front()
        };

        Box::pin(async move {
            wait(latency).await;
            match answer {
                Some(MockCheckin::Respond(response)) => Ok(response),
                Some(MockCheckin::Fail(message)) => Err(ApiError::Api {
                    status: 500,
                    message,
                }),
                Some(MockCheckin::Unreachable) => {
                    Err(ApiError::RequestFailed("connection refused".to_string()))
                },
                None => Err(ApiError::Api {
                    status: 500,
                    message: "No scripted check-in response".to_string(),
                }),
            }
        })
    }

    fn event_stats(
        &self,
        event_id: String,
    ) -> Pin<Box<dyn Future<Output = ApiResult<AttendeeStats>> + Send>> {
        let latency = self.latency();
        let stats = {
            let mut script = lock(&self.script);
            script.stats_calls.push(event_id.clone());
            script.stats.get(&event_id).copied()
        };

        Box::pin(async move {
            wait(latency).await;
            stats.ok_or_else(|| ApiError::Api {
                status: 404,
                message: format!("Event {event_id} not found"),
            })
        })
    }
}

// ============================================================================
// Frame decoder
// ============================================================================

/// Camera whose payloads are pushed by the test
///
/// [`MockDecoder::emit`] plays the part of a decoded frame. Payloads emitted
/// while paused are dropped, as a real decoder would.
#[derive(Debug)]
pub struct MockDecoder {
    available: bool,
    failure: Option<CameraError>,
    /// Open feed and the session that opened it
    feed: Mutex<Option<(u64, mpsc::UnboundedSender<String>)>>,
    paused: AtomicBool,
    starts: AtomicUsize,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
    stops: AtomicUsize,
    destroys: AtomicUsize,
}

impl Default for MockDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDecoder {
    /// A working camera
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: true,
            failure: None,
            feed: Mutex::new(None),
            paused: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
        }
    }

    /// A camera whose start fails with `error`
    #[must_use]
    pub fn failing(error: CameraError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new()
        }
    }

    /// No camera attached
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            failure: Some(CameraError::NotFound),
            ..Self::new()
        }
    }

    /// Report a decoded payload; returns `false` if it was dropped
    pub fn emit(&self, payload: &str) -> bool {
        if self.paused.load(Ordering::SeqCst) {
            return false;
        }
        lock(&self.feed)
            .as_ref()
            .is_some_and(|(_, feed)| feed.unbounded_send(payload.to_string()).is_ok())
    }

    /// Whether a feed is open
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        lock(&self.feed).is_some()
    }

    /// Whether the feed is paused
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Number of `start` calls
    #[must_use]
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of `pause` calls
    #[must_use]
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    /// Number of `resume` calls
    #[must_use]
    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls
    #[must_use]
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Number of `destroy` calls
    #[must_use]
    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    fn close_feed(&self, session: u64) {
        let mut feed = lock(&self.feed);
        if feed.as_ref().is_some_and(|(open, _)| *open == session) {
            feed.take();
        }
    }
}

impl FrameDecoder for MockDecoder {
    fn has_camera(&self) -> Pin<Box<dyn Future<Output = bool> + Send>> {
        let available = self.available;
        Box::pin(async move { available })
    }

    fn start(
        &self,
        session: u64,
    ) -> Pin<Box<dyn Future<Output = Result<PayloadStream, CameraError>> + Send>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);

        let result = match &self.failure {
            Some(error) => Err(error.clone()),
            None => {
                let (tx, rx) = mpsc::unbounded();
                *lock(&self.feed) = Some((session, tx));
                let payloads: PayloadStream = Box::pin(rx);
                Ok(payloads)
            },
        };
        Box::pin(async move { result })
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&self, session: u64) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.close_feed(session);
    }

    fn destroy(&self, session: u64) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        self.close_feed(session);
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Keeps every toast for later inspection
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl RecordingNotifier {
    /// Nothing recorded yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toasts in the order they were shown
    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        lock(&self.toasts).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        lock(&self.toasts).push(toast);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_decoder_drops_payloads_while_paused() {
        let decoder = MockDecoder::new();
        let mut payloads = decoder.start(1).await.unwrap();

        assert!(decoder.emit("A"));
        decoder.pause();
        assert!(!decoder.emit("B"));
        decoder.resume();
        assert!(decoder.emit("C"));
        decoder.stop(1);
        assert!(!decoder.emit("D"));

        assert_eq!(payloads.next().await.as_deref(), Some("A"));
        assert_eq!(payloads.next().await.as_deref(), Some("C"));
        assert_eq!(payloads.next().await, None);
    }

    #[tokio::test]
    async fn test_host_api_consumes_script_in_order() {
        let api = MockHostApi::new();
        api.push_checkin(MockCheckin::Respond(accepted("Jane Doe", "ABC123")));
        api.push_checkin(MockCheckin::Fail("Ticket not found".to_string()));

        let first = api.checkin("ABC123".into(), "E1".into()).await.unwrap();
        assert!(first.success);
        let second = api.checkin("NOPE".into(), "E1".into()).await.unwrap_err();
        assert_eq!(second.user_message(), "Ticket not found");
        assert!(api.checkin("X".into(), "E1".into()).await.is_err());

        assert_eq!(api.checkin_calls().len(), 3);
        assert_eq!(api.checkin_calls()[0], ("ABC123".to_string(), "E1".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_event_stats_fail() {
        let api = MockHostApi::new().with_stats("E1", AttendeeStats::default());
        assert!(api.event_stats("E1".into()).await.is_ok());
        assert!(api.event_stats("E2".into()).await.is_err());
        assert_eq!(api.stats_calls(), vec!["E1".to_string(), "E2".to_string()]);
    }
}
