//! Check-in workflow.
//!
//! One reducer drives the whole door session:
//!
//! 1. Load the host's events; selecting one loads its attendee stats
//! 2. Toggle the camera; the feed runs as a stream effect holding a
//!    [`CameraLease`], so the device is released however the feed ends
//! 3. Decoded payloads pass the [`ScanDebouncer`](crate::debouncer::ScanDebouncer);
//!    an admission pauses the feed, schedules the re-arm timer and submits
//!    the check-in
//! 4. Manual entries skip the debouncer and submit directly
//! 5. Results land in the history and open a modal plus a toast; successes
//!    reload the stats once and auto-dismiss their modal
//!
//! Re-arming is a fixed timer, independent of when the check-in answer
//! arrives.

use crate::camera::{CameraLease, FrameDecoder};
use crate::debouncer::Admission;
use crate::metrics::{record_camera_failure, record_request, record_scan, record_stats_refresh};
use crate::notifier::{Notifier, Toast};
use crate::state::{CameraStatus, CheckinState, DEFAULT_HISTORY_LIMIT, Modal, ScanResult};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use turnstile_api::{ApiError, AttendeeStats, CheckinResponse, EventSummary, HostApi};
use turnstile_core::{
    SmallVec, effect::Effect, environment::Clock, reducer::Reducer, smallvec,
};

/// Shown when a scan arrives before an event is chosen
pub const NO_EVENT_MESSAGE: &str = "Please select an event first";
/// Shown when a check-in fails without a usable server message
pub const CHECKIN_FAILED_MESSAGE: &str = "Failed to check in attendee";
/// Toast for a successful check-in
pub const CHECKIN_SUCCESS_TOAST: &str = "Attendee checked in successfully!";
/// Toast when the event list cannot be loaded
pub const EVENTS_FAILED_MESSAGE: &str = "Failed to load your events";

// ============================================================================
// Actions
// ============================================================================

/// Every input the check-in workflow reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckinAction {
    // Events
    /// Fetch the host's events
    LoadEvents,
    /// Event list arrived
    EventsLoaded {
        /// Host events
        events: Vec<EventSummary>,
    },
    /// Event list request failed
    EventsLoadFailed {
        /// Error description
        error: String,
    },
    /// Choose the event check-ins are recorded against
    SelectEvent {
        /// Event id
        event_id: String,
    },

    // Stats
    /// Reload stats for the selected event
    RefreshStats,
    /// Stats arrived
    StatsLoaded {
        /// Event the stats belong to
        event_id: String,
        /// Counters
        stats: AttendeeStats,
    },
    /// Stats request failed
    StatsLoadFailed {
        /// Event the request was for
        event_id: String,
        /// Error description
        error: String,
    },

    // Camera
    /// Probe for a camera
    CheckCamera,
    /// Probe result
    CameraAvailability {
        /// Whether a camera exists
        available: bool,
    },
    /// Switch scanning on or off
    ToggleCamera,
    /// The feed of camera session `session` is open
    CameraStarted {
        /// Camera session number
        session: u64,
    },
    /// The feed of camera session `session` ended
    CameraStopped {
        /// Camera session number
        session: u64,
    },
    /// The camera reported an error
    CameraFailed {
        /// What went wrong
        detail: String,
    },

    // Scans
    /// The decoder reported a payload
    FrameDecoded {
        /// Decoded text
        payload: String,
    },
    /// Re-arm timer for the admission numbered `admission` fired
    Rearm {
        /// Debouncer sequence number of the admission
        admission: u64,
    },
    /// The operator typed a code
    ManualEntrySubmitted {
        /// Raw input
        input: String,
    },
    /// The server answered a check-in
    CheckinCompleted {
        /// Event the check-in was for
        event_id: String,
        /// Server answer
        response: CheckinResponse,
    },
    /// The check-in request failed
    CheckinFailed {
        /// Event the check-in was for
        event_id: String,
        /// Operator-facing message
        message: String,
    },

    // Presentation
    /// Close whichever modal is open
    DismissModal,
    /// Auto-dismiss timer of success modal `seq` fired
    AutoDismissSuccess {
        /// Modal sequence number
        seq: u64,
    },

    // Lifecycle
    /// Tear the workflow down
    Dispose,
}

// ============================================================================
// Environment
// ============================================================================

/// Durations and limits of the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Minimum time between two admissions of the same payload
    pub duplicate_window: Duration,
    /// Time from admission until the scanner re-arms
    pub rearm_delay: Duration,
    /// Time a success modal stays open
    pub success_modal: Duration,
    /// Results kept in the history
    pub history_limit: usize,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            duplicate_window: Duration::from_millis(3_000),
            rearm_delay: Duration::from_millis(2_000),
            success_modal: Duration::from_millis(3_000),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Injected dependencies of the check-in workflow
#[derive(Clone)]
pub struct CheckinEnvironment {
    /// Time source for scan timestamps
    pub clock: Arc<dyn Clock>,
    /// Host API
    pub api: Arc<dyn HostApi>,
    /// Camera
    pub decoder: Arc<dyn FrameDecoder>,
    /// Toast delivery
    pub notifier: Arc<dyn Notifier>,
    /// Durations and limits
    pub timings: Timings,
}

impl CheckinEnvironment {
    /// Creates a new `CheckinEnvironment` with default timings
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        api: Arc<dyn HostApi>,
        decoder: Arc<dyn FrameDecoder>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            api,
            decoder,
            notifier,
            timings: Timings::default(),
        }
    }

    /// Override the timings
    #[must_use]
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }
}

impl std::fmt::Debug for CheckinEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckinEnvironment")
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the check-in workflow
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckinReducer;

impl CheckinReducer {
    /// Creates a new `CheckinReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn toast(env: &CheckinEnvironment, toast: Toast) -> Effect<CheckinAction> {
        let notifier = Arc::clone(&env.notifier);
        Effect::fire_and_forget(async move { notifier.notify(toast) })
    }

    fn decoder_call(
        env: &CheckinEnvironment,
        call: fn(&dyn FrameDecoder),
    ) -> Effect<CheckinAction> {
        let decoder = Arc::clone(&env.decoder);
        Effect::fire_and_forget(async move { call(decoder.as_ref()) })
    }

    fn stop_camera(env: &CheckinEnvironment, session: u64) -> Effect<CheckinAction> {
        let decoder = Arc::clone(&env.decoder);
        Effect::fire_and_forget(async move { decoder.stop(session) })
    }

    /// Runs one camera session: acquire, forward payloads, release
    fn camera_feed(env: &CheckinEnvironment, session: u64) -> Effect<CheckinAction> {
        let decoder = Arc::clone(&env.decoder);
        Effect::Stream(Box::pin(async_stream::stream! {
            match CameraLease::acquire(decoder, session).await {
                Ok((lease, mut payloads)) => {
                    yield CheckinAction::CameraStarted { session };
                    while let Some(payload) = payloads.next().await {
                        yield CheckinAction::FrameDecoded { payload };
                    }
                    drop(lease);
                    yield CheckinAction::CameraStopped { session };
                },
                Err(error) => {
                    yield CheckinAction::CameraFailed { detail: error.to_string() };
                },
            }
        }))
    }

    fn load_events(env: &CheckinEnvironment) -> Effect<CheckinAction> {
        let api = Arc::clone(&env.api);
        Effect::future(async move {
            match api.list_events().await {
                Ok(events) => Some(CheckinAction::EventsLoaded { events }),
                Err(error) => Some(CheckinAction::EventsLoadFailed {
                    error: error.to_string(),
                }),
            }
        })
    }

    fn load_stats(env: &CheckinEnvironment, event_id: String) -> Effect<CheckinAction> {
        let api = Arc::clone(&env.api);
        Effect::future(async move {
            match api.event_stats(event_id.clone()).await {
                Ok(stats) => Some(CheckinAction::StatsLoaded { event_id, stats }),
                Err(error) => Some(CheckinAction::StatsLoadFailed {
                    event_id,
                    error: error.to_string(),
                }),
            }
        })
    }

    fn check_camera(env: &CheckinEnvironment) -> Effect<CheckinAction> {
        let decoder = Arc::clone(&env.decoder);
        Effect::future(async move {
            let available = decoder.has_camera().await;
            Some(CheckinAction::CameraAvailability { available })
        })
    }

    /// Message for a check-in request that produced no result
    fn failure_message(error: &ApiError) -> String {
        match error {
            ApiError::Api { message, .. } if message.trim().is_empty() => {
                CHECKIN_FAILED_MESSAGE.to_string()
            },
            other => other.user_message(),
        }
    }

    /// Send one check-in attempt for `qr_code`
    fn submit(
        state: &mut CheckinState,
        env: &CheckinEnvironment,
        qr_code: String,
    ) -> Option<Effect<CheckinAction>> {
        let Some(event_id) = state.selected_event.clone() else {
            tracing::debug!("Scan without a selected event");
            record_request("no_event");
            state.last_result = Some(ScanResult::failure(NO_EVENT_MESSAGE, env.clock.now()));
            return None;
        };

        state.in_flight += 1;
        tracing::debug!(event_id = %event_id, qr_code = %qr_code, "Submitting check-in");

        let api = Arc::clone(&env.api);
        Some(Effect::future(async move {
            match api.checkin(qr_code, event_id.clone()).await {
                Ok(response) => Some(CheckinAction::CheckinCompleted { event_id, response }),
                Err(error) => {
                    tracing::warn!(event_id = %event_id, error = %error, "Check-in request failed");
                    Some(CheckinAction::CheckinFailed {
                        event_id,
                        message: Self::failure_message(&error),
                    })
                },
            }
        }))
    }

    /// Record a failed attempt and present it
    fn present_failure(
        state: &mut CheckinState,
        env: &CheckinEnvironment,
        result: ScanResult,
    ) -> SmallVec<[Effect<CheckinAction>; 4]> {
        let message = result.message.clone();
        state.last_result = Some(result.clone());
        state.history.push(result, env.timings.history_limit);
        state.modal = Some(Modal::Error {
            message: message.clone(),
        });
        smallvec![Self::toast(env, Toast::error(message))]
    }

    /// Camera off: the feed ends and the debouncer forgets everything
    fn camera_off(state: &mut CheckinState, env: &CheckinEnvironment) -> Effect<CheckinAction> {
        state.camera = CameraStatus::Off;
        state.debouncer.reset();
        Self::stop_camera(env, state.camera_session)
    }
}

impl Reducer for CheckinReducer {
    type State = CheckinState;
    type Action = CheckinAction;
    type Environment = CheckinEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if state.disposed {
            tracing::trace!(?action, "Workflow disposed, ignoring action");
            return SmallVec::new();
        }

        match action {
            // ========== Events ==========
            CheckinAction::LoadEvents => {
                state.events_loading = true;
                smallvec![Self::load_events(env)]
            },

            CheckinAction::EventsLoaded { events } => {
                tracing::info!(count = events.len(), "Host events loaded");
                state.events_loading = false;
                state.events = events;
                SmallVec::new()
            },

            CheckinAction::EventsLoadFailed { error } => {
                tracing::warn!(error = %error, "Failed to load events");
                state.events_loading = false;
                state.events.clear();
                smallvec![Self::toast(env, Toast::error(EVENTS_FAILED_MESSAGE))]
            },

            CheckinAction::SelectEvent { event_id } => {
                if state.is_selected(&event_id) {
                    return SmallVec::new();
                }
                tracing::info!(event_id = %event_id, "Event selected");
                state.selected_event = Some(event_id.clone());
                state.stats = AttendeeStats::default();
                smallvec![Self::load_stats(env, event_id)]
            },

            // ========== Stats ==========
            CheckinAction::RefreshStats => match state.selected_event.clone() {
                Some(event_id) => smallvec![Self::load_stats(env, event_id)],
                None => SmallVec::new(),
            },

            CheckinAction::StatsLoaded { event_id, stats } => {
                if state.is_selected(&event_id) {
                    record_stats_refresh("ok");
                    state.stats = stats;
                } else {
                    record_stats_refresh("stale");
                    tracing::debug!(event_id = %event_id, "Discarding stats for unselected event");
                }
                SmallVec::new()
            },

            CheckinAction::StatsLoadFailed { event_id, error } => {
                record_stats_refresh("failed");
                tracing::warn!(event_id = %event_id, error = %error, "Failed to load event stats");
                SmallVec::new()
            },

            // ========== Camera ==========
            CheckinAction::CheckCamera => smallvec![Self::check_camera(env)],

            CheckinAction::CameraAvailability { available } => {
                let next = match (&state.camera, available) {
                    (CameraStatus::Unknown | CameraStatus::Unavailable, true) => {
                        Some(CameraStatus::Off)
                    },
                    (CameraStatus::Unknown | CameraStatus::Off, false) => {
                        tracing::info!("No camera available, manual entry only");
                        Some(CameraStatus::Unavailable)
                    },
                    _ => None,
                };
                if let Some(next) = next {
                    state.camera = next;
                }
                SmallVec::new()
            },

            CheckinAction::ToggleCamera => {
                if state.is_camera_on() {
                    tracing::info!(session = state.camera_session, "Camera switched off");
                    return smallvec![Self::camera_off(state, env)];
                }
                if state.selected_event.is_none() {
                    tracing::debug!("Camera toggle ignored, no event selected");
                    return SmallVec::new();
                }

                state.camera_session += 1;
                state.camera = CameraStatus::Starting;
                tracing::info!(session = state.camera_session, "Starting camera");
                smallvec![Self::camera_feed(env, state.camera_session)]
            },

            CheckinAction::CameraStarted { session } => {
                if session == state.camera_session && state.camera == CameraStatus::Starting {
                    state.camera = CameraStatus::Active;
                    tracing::info!(session, "Camera active");
                    SmallVec::new()
                } else if state.is_camera_on() {
                    SmallVec::new()
                } else {
                    // Switched off while starting
                    tracing::debug!(session, "Stopping camera that started late");
                    smallvec![Self::stop_camera(env, session)]
                }
            },

            CheckinAction::CameraStopped { session } => {
                if session == state.camera_session && state.is_camera_on() {
                    tracing::info!(session, "Camera feed ended");
                    state.camera = CameraStatus::Off;
                    state.debouncer.reset();
                }
                SmallVec::new()
            },

            CheckinAction::CameraFailed { detail } => {
                let message = format!("Camera error: {detail}");
                tracing::warn!(error = %detail, "Camera failed");
                record_camera_failure();

                state.camera = CameraStatus::Failed {
                    message: message.clone(),
                };
                state.debouncer.reset();
                state.modal = Some(Modal::Error {
                    message: message.clone(),
                });
                smallvec![
                    Self::toast(env, Toast::error(message)),
                    Self::stop_camera(env, state.camera_session)
                ]
            },

            // ========== Scans ==========
            CheckinAction::FrameDecoded { payload } => {
                if state.camera != CameraStatus::Active {
                    tracing::trace!("Payload while camera inactive");
                    return SmallVec::new();
                }

                let admission = state.debouncer.offer(
                    &payload,
                    env.clock.now(),
                    env.timings.duplicate_window,
                );
                match admission {
                    Admission::Rejected(reason) => {
                        record_scan(reason.as_str());
                        tracing::trace!(reason = reason.as_str(), "Scan suppressed");
                        SmallVec::new()
                    },
                    Admission::Admitted { seq } => {
                        record_scan("admitted");
                        let mut effects: SmallVec<[Effect<CheckinAction>; 4]> = smallvec![
                            Self::decoder_call(env, |decoder| decoder.pause()),
                            Effect::delay(
                                env.timings.rearm_delay,
                                CheckinAction::Rearm { admission: seq }
                            ),
                        ];
                        effects.extend(Self::submit(state, env, payload));
                        effects
                    },
                }
            },

            CheckinAction::Rearm { admission } => {
                if state.debouncer.rearm(admission) && state.camera == CameraStatus::Active {
                    tracing::trace!(admission, "Scanner re-armed");
                    smallvec![Self::decoder_call(env, |decoder| decoder.resume())]
                } else {
                    SmallVec::new()
                }
            },

            CheckinAction::ManualEntrySubmitted { input } => {
                let code = input.trim();
                if code.is_empty() {
                    return SmallVec::new();
                }
                record_scan("manual");
                Self::submit(state, env, code.to_string()).into_iter().collect()
            },

            CheckinAction::CheckinCompleted { event_id, response } => {
                state.in_flight = state.in_flight.saturating_sub(1);
                let result = ScanResult::from_response(response, env.clock.now());

                if !result.success {
                    record_request("rejected");
                    tracing::info!(event_id = %event_id, message = %result.message, "Check-in rejected");
                    return Self::present_failure(state, env, result);
                }

                record_request("success");
                tracing::info!(
                    event_id = %event_id,
                    attendee = result.attendee.as_ref().map_or("", |a| a.name.as_str()),
                    "Attendee checked in"
                );

                state.last_result = Some(result.clone());
                state.history.push(result.clone(), env.timings.history_limit);
                state.modal_seq += 1;
                let seq = state.modal_seq;
                state.modal = Some(Modal::Success { result, seq });

                let mut effects: SmallVec<[Effect<CheckinAction>; 4]> = smallvec![
                    Self::toast(env, Toast::success(CHECKIN_SUCCESS_TOAST)),
                    Effect::delay(
                        env.timings.success_modal,
                        CheckinAction::AutoDismissSuccess { seq }
                    ),
                ];
                if let Some(selected) = state.selected_event.clone() {
                    effects.push(Self::load_stats(env, selected));
                }
                effects
            },

            CheckinAction::CheckinFailed { event_id, message } => {
                state.in_flight = state.in_flight.saturating_sub(1);
                record_request("error");
                tracing::debug!(event_id = %event_id, "Presenting check-in failure");
                let result = ScanResult::failure(message, env.clock.now());
                Self::present_failure(state, env, result)
            },

            // ========== Presentation ==========
            CheckinAction::DismissModal => {
                state.modal = None;
                SmallVec::new()
            },

            CheckinAction::AutoDismissSuccess { seq } => {
                if matches!(state.modal, Some(Modal::Success { seq: open, .. }) if open == seq) {
                    state.modal = None;
                }
                SmallVec::new()
            },

            // ========== Lifecycle ==========
            CheckinAction::Dispose => {
                tracing::info!("Disposing check-in workflow");
                state.disposed = true;
                if state.is_camera_on() {
                    smallvec![Self::camera_off(state, env)]
                } else {
                    SmallVec::new()
                }
            },
        }
    }
}
