//! Handle the surrounding UI holds on the check-in workflow.
//!
//! Wraps the [`Store`] running [`CheckinReducer`] and exposes the workflow's
//! inputs as methods: `on_scan` and `on_error` for a camera component that
//! decodes frames itself, `toggle_camera` / `is_active` for the scanning
//! switch, plus event selection, manual entry and modal dismissal.

use crate::state::CheckinState;
use crate::workflow::{CheckinAction, CheckinEnvironment, CheckinReducer};
use std::time::Duration;
use tokio::sync::broadcast;
use turnstile_runtime::{EffectHandle, Store, StoreError};

/// Store type running the check-in workflow
pub type CheckinStore = Store<CheckinState, CheckinAction, CheckinEnvironment, CheckinReducer>;

/// The check-in workflow, ready to take input
#[derive(Clone)]
pub struct CheckinController {
    store: CheckinStore,
}

impl CheckinController {
    /// Controller with empty state
    #[must_use]
    pub fn new(env: CheckinEnvironment) -> Self {
        Self::with_state(CheckinState::default(), env)
    }

    /// Controller resuming from `state`
    #[must_use]
    pub fn with_state(state: CheckinState, env: CheckinEnvironment) -> Self {
        Self {
            store: Store::new(state, CheckinReducer::new(), env),
        }
    }

    /// Load the host's events and probe for a camera
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown
    pub async fn start(&self) -> Result<(), StoreError> {
        self.store.send(CheckinAction::LoadEvents).await?;
        self.store.send(CheckinAction::CheckCamera).await?;
        Ok(())
    }

    /// Choose the event to check attendees into
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown
    pub async fn select_event(&self, event_id: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.store
            .send(CheckinAction::SelectEvent {
                event_id: event_id.into(),
            })
            .await
    }

    /// Flip scanning on or off
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown
    pub async fn toggle_camera(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(CheckinAction::ToggleCamera).await
    }

    /// A frame was decoded into `payload`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown
    pub async fn on_scan(&self, payload: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.store
            .send(CheckinAction::FrameDecoded {
                payload: payload.into(),
            })
            .await
    }

    /// The camera failed with `message`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown
    pub async fn on_error(&self, message: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.store
            .send(CheckinAction::CameraFailed {
                detail: message.into(),
            })
            .await
    }

    /// Whether scanning is switched on
    pub async fn is_active(&self) -> bool {
        self.store.state(CheckinState::is_camera_on).await
    }

    /// Check in a typed code
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown
    pub async fn submit_manual(&self, input: impl Into<String>) -> Result<EffectHandle, StoreError> {
        self.store
            .send(CheckinAction::ManualEntrySubmitted {
                input: input.into(),
            })
            .await
    }

    /// Close the open modal
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown
    pub async fn dismiss_modal(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(CheckinAction::DismissModal).await
    }

    /// Reload stats for the selected event
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown
    pub async fn refresh_stats(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(CheckinAction::RefreshStats).await
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> CheckinState {
        self.store.state(CheckinState::clone).await
    }

    /// Read part of the state
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&CheckinState) -> T,
    {
        self.store.state(f).await
    }

    /// Actions produced by the workflow's effects (API answers, timers,
    /// camera events)
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CheckinAction> {
        self.store.subscribe_actions()
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &CheckinStore {
        &self.store
    }

    /// Stop the camera, then wait up to `timeout` for running effects
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the timeout expires
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        match self.store.send(CheckinAction::Dispose).await {
            Ok(_) | Err(StoreError::ShutdownInProgress) => {},
            Err(error) => return Err(error),
        }
        self.store.shutdown(timeout).await
    }
}

impl std::fmt::Debug for CheckinController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckinController")
            .field("pending_effects", &self.store.pending_effects())
            .finish_non_exhaustive()
    }
}
