//! Scan debouncer.
//!
//! A decoder reports the same QR code many times per second while a ticket
//! is held in front of the camera. The debouncer turns that stream into at
//! most one admitted scan per physical presentation:
//!
//! - nothing is admitted while a previous admission is still processing
//! - the same payload is admitted again only once the duplicate window has
//!   passed since it was last admitted
//! - empty payloads are never admitted
//!
//! Each admission carries a sequence number. The re-arm timer scheduled for
//! an admission only clears the processing flag if no reset or newer
//! admission happened in between.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Why a payload was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The payload was empty
    Empty,
    /// A previous admission has not re-armed yet
    Processing,
    /// Same payload as the last admission, inside the duplicate window
    Duplicate,
}

impl Rejection {
    /// Metric label for the rejection
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Processing => "processing",
            Self::Duplicate => "duplicate",
        }
    }
}

/// Outcome of offering a payload to the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Forward the payload; re-arm later with this sequence number
    Admitted {
        /// Sequence number of this admission
        seq: u64,
    },
    /// Drop the payload
    Rejected(Rejection),
}

/// Gate between the decoder's payload stream and check-in requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanDebouncer {
    last_payload: String,
    last_scan_at: Option<DateTime<Utc>>,
    processing: bool,
    seq: u64,
}

impl ScanDebouncer {
    /// Create an armed debouncer with no scan history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a decoded payload observed at `now`
    ///
    /// `window` is the minimum time between two admissions of the same
    /// payload.
    pub fn offer(&mut self, payload: &str, now: DateTime<Utc>, window: Duration) -> Admission {
        if payload.is_empty() {
            return Admission::Rejected(Rejection::Empty);
        }
        if self.processing {
            return Admission::Rejected(Rejection::Processing);
        }
        if payload == self.last_payload && !self.window_elapsed(now, window) {
            return Admission::Rejected(Rejection::Duplicate);
        }

        self.processing = true;
        self.last_payload = payload.to_string();
        self.last_scan_at = Some(now);
        self.seq += 1;

        Admission::Admitted { seq: self.seq }
    }

    /// Re-arm after the admission numbered `seq`
    ///
    /// Returns `true` if the timer was current and the debouncer re-armed.
    /// Timers from before a reset or an earlier admission return `false`.
    pub fn rearm(&mut self, seq: u64) -> bool {
        if seq != self.seq || !self.processing {
            return false;
        }
        self.processing = false;
        true
    }

    /// Forget everything, e.g. when the camera is switched off
    ///
    /// Pending re-arm timers become stale.
    pub fn reset(&mut self) {
        self.processing = false;
        self.last_payload.clear();
        self.last_scan_at = None;
        self.seq += 1;
    }

    /// Whether an admission is still processing
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        self.processing
    }

    /// Last admitted payload, empty after a reset
    #[must_use]
    pub fn last_payload(&self) -> &str {
        &self.last_payload
    }

    /// When the last payload was admitted
    #[must_use]
    pub const fn last_scan_at(&self) -> Option<DateTime<Utc>> {
        self.last_scan_at
    }

    /// Sequence number of the latest admission or reset
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.seq
    }

    fn window_elapsed(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let Some(last) = self.last_scan_at else {
            return true;
        };
        // A clock that went backwards counts as no time elapsed
        (now - last)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= window)
    }
}
