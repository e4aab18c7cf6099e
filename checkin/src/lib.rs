//! # Turnstile Check-in
//!
//! QR check-in at the door for event hosts.
//!
//! The workflow is a reducer ([`workflow::CheckinReducer`]) run by the
//! runtime store behind a [`CheckinController`]:
//!
//! ```text
//! camera ─▶ FrameDecoder ─▶ ScanDebouncer ─▶ HostApi::checkin ─▶ history / modal / toast
//!                                                   │
//!                                                   └─▶ HostApi::event_stats (on success)
//! ```
//!
//! - [`debouncer`]: one admission per physical ticket presentation
//! - [`camera`]: decoder capability and the lease that guarantees release
//! - [`line_decoder`]: decoder reading payloads from a file or FIFO
//! - [`workflow`]: actions, environment and reducer
//! - [`controller`]: the handle a UI drives
//! - [`presenter`]: terminal rendering
//! - [`config`]: environment configuration for the binary
//! - [`mocks`]: scripted API, camera and notifier
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use turnstile_checkin::{CheckinController, CheckinEnvironment, ConsoleNotifier, LineDecoder};
//! use turnstile_core::environment::SystemClock;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = turnstile_api::HttpApiClient::new(
//!     "https://tickets.example.com/api/v1",
//!     Some("token".to_string()),
//!     turnstile_api::client::DEFAULT_TIMEOUT,
//! )?;
//! let env = CheckinEnvironment::new(
//!     Arc::new(SystemClock),
//!     Arc::new(api),
//!     Arc::new(LineDecoder::new(Some("/tmp/scans".into()))),
//!     Arc::new(ConsoleNotifier),
//! );
//!
//! let controller = CheckinController::new(env);
//! controller.start().await?;
//! controller.select_event("evt-1").await?;
//! controller.toggle_camera().await?;
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod config;
pub mod controller;
pub mod debouncer;
pub mod line_decoder;
pub mod metrics;
pub mod mocks;
pub mod notifier;
pub mod presenter;
pub mod state;
pub mod workflow;

pub use camera::{CameraError, CameraLease, FrameDecoder, PayloadStream};
pub use config::{Config, ConfigError};
pub use controller::{CheckinController, CheckinStore};
pub use debouncer::{Admission, Rejection, ScanDebouncer};
pub use line_decoder::LineDecoder;
pub use notifier::{ConsoleNotifier, Notifier, Toast, ToastLevel};
pub use state::{CameraStatus, CheckinState, Modal, Phase, ScanHistory, ScanResult};
pub use workflow::{CheckinAction, CheckinEnvironment, CheckinReducer, Timings};
