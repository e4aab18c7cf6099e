//! Camera access: the frame decoder capability and its lease.
//!
//! Decoding a frame into a payload string is not done here. A
//! [`FrameDecoder`] wraps whatever does it (a webcam pipeline, an external
//! `zbarcam` process, a keyboard-wedge scanner) and reports decoded payloads
//! as a stream.

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Decoded payloads, in the order the decoder saw them
pub type PayloadStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Errors from camera devices
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// No camera is attached or configured
    #[error("No camera found")]
    NotFound,

    /// The host refused access to the camera
    #[error("Permission denied")]
    PermissionDenied,

    /// The camera exists but could not be started
    #[error("{0}")]
    StartFailed(String),
}

/// A camera feed that decodes QR codes
///
/// `start` opens the feed for one camera session and returns its payload
/// stream. `stop` ends that stream; `destroy` releases the device and is
/// called exactly once per start, by [`CameraLease`]. Both only touch the
/// feed opened with the same session number, so a late release of an old
/// session never ends a newer one. While paused, decoded payloads are
/// dropped.
pub trait FrameDecoder: Send + Sync {
    /// Whether a camera is available at all
    fn has_camera(&self) -> Pin<Box<dyn Future<Output = bool> + Send>>;

    /// Open the feed
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] if there is no camera, access is refused, or
    /// the device fails to start
    fn start(
        &self,
        session: u64,
    ) -> Pin<Box<dyn Future<Output = Result<PayloadStream, CameraError>> + Send>>;

    /// Stop reporting payloads until [`FrameDecoder::resume`]
    fn pause(&self);

    /// Report payloads again
    fn resume(&self);

    /// End the payload stream of `session`
    fn stop(&self, session: u64);

    /// Release the device held by `session`
    fn destroy(&self, session: u64);
}

/// Exclusive use of the camera for one scanning session
///
/// Acquiring starts the decoder. Dropping the lease destroys it, on every
/// exit path, including a failed start.
pub struct CameraLease {
    decoder: Arc<dyn FrameDecoder>,
    session: u64,
}

impl CameraLease {
    /// Start the decoder for `session` and take the lease
    ///
    /// # Errors
    ///
    /// Returns the decoder's [`CameraError`]; the decoder has already been
    /// destroyed when this returns.
    pub async fn acquire(
        decoder: Arc<dyn FrameDecoder>,
        session: u64,
    ) -> Result<(Self, PayloadStream), CameraError> {
        let lease = Self {
            decoder: Arc::clone(&decoder),
            session,
        };
        let payloads = decoder.start(session).await?;
        tracing::debug!(session, "Camera lease acquired");
        Ok((lease, payloads))
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        tracing::debug!(session = self.session, "Camera lease released");
        self.decoder.destroy(self.session);
    }
}

impl std::fmt::Debug for CameraLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraLease")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

    use super::*;
    use crate::mocks::MockDecoder;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_lease_destroys_on_drop() {
        let decoder = Arc::new(MockDecoder::new());
        let (lease, _payloads) = CameraLease::acquire(decoder.clone(), 1).await.unwrap();
        assert_eq!(decoder.starts(), 1);
        assert_eq!(decoder.destroys(), 0);

        drop(lease);
        assert_eq!(decoder.destroys(), 1);
    }

    #[tokio::test]
    async fn test_failed_start_still_destroys() {
        let decoder = Arc::new(MockDecoder::failing(CameraError::PermissionDenied));
        let error = CameraLease::acquire(decoder.clone(), 1)
            .await
            .err()
            .expect("start should fail");

        assert_eq!(error, CameraError::PermissionDenied);
        assert_eq!(decoder.destroys(), 1);
    }

    #[tokio::test]
    async fn test_late_release_leaves_newer_session_running() {
        let decoder = Arc::new(MockDecoder::new());
        let (first, _old) = CameraLease::acquire(decoder.clone(), 1).await.unwrap();
        decoder.stop(1);
        let (_second, mut payloads) = CameraLease::acquire(decoder.clone(), 2).await.unwrap();

        drop(first);
        assert_eq!(decoder.destroys(), 1);
        assert!(decoder.is_streaming());
        assert!(decoder.emit("LATE-SCAN"));
        assert_eq!(payloads.next().await.as_deref(), Some("LATE-SCAN"));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(CameraError::NotFound.to_string(), "No camera found");
        assert_eq!(
            CameraError::StartFailed("device busy".to_string()).to_string(),
            "device busy"
        );
    }
}
