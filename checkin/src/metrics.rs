//! Check-in metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `checkin_scans_total{outcome}` - Decoded payloads by gate outcome
//!   (admitted, duplicate, processing, empty, manual)
//! - `checkin_requests_total{result}` - Check-in attempts by result
//!   (success, rejected, error, no_event)
//! - `checkin_stats_refresh_total{result}` - Stats loads (ok, failed, stale)
//! - `checkin_camera_failures_total` - Camera errors reported to the operator

use metrics::describe_counter;

/// Scan gate counter
pub const SCANS_TOTAL: &str = "checkin_scans_total";
/// Check-in attempt counter
pub const REQUESTS_TOTAL: &str = "checkin_requests_total";
/// Stats reload counter
pub const STATS_REFRESH_TOTAL: &str = "checkin_stats_refresh_total";
/// Camera failure counter
pub const CAMERA_FAILURES_TOTAL: &str = "checkin_camera_failures_total";

/// Register descriptions for all check-in metrics.
///
/// Call once at startup, after the recorder is installed.
pub fn register_checkin_metrics() {
    describe_counter!(
        SCANS_TOTAL,
        "Decoded payloads by outcome at the scan gate (admitted, duplicate, processing, empty, manual)"
    );
    describe_counter!(
        REQUESTS_TOTAL,
        "Check-in attempts by result (success, rejected, error, no_event)"
    );
    describe_counter!(
        STATS_REFRESH_TOTAL,
        "Attendee stats reloads by result (ok, failed, stale)"
    );
    describe_counter!(
        CAMERA_FAILURES_TOTAL,
        "Camera errors reported to the operator"
    );

    tracing::info!("Check-in metrics registered");
}

pub(crate) fn record_scan(outcome: &'static str) {
    metrics::counter!(SCANS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_request(result: &'static str) {
    metrics::counter!(REQUESTS_TOTAL, "result" => result).increment(1);
}

pub(crate) fn record_stats_refresh(result: &'static str) {
    metrics::counter!(STATS_REFRESH_TOTAL, "result" => result).increment(1);
}

pub(crate) fn record_camera_failure() {
    metrics::counter!(CAMERA_FAILURES_TOTAL).increment(1);
}
