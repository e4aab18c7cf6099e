//! Line-oriented frame decoder.
//!
//! Reads already-decoded payloads, one per line, from a file or FIFO. Pair it
//! with an external decoder writing to a named pipe, e.g.
//!
//! ```text
//! mkfifo /tmp/scans
//! zbarcam --raw --nodisplay > /tmp/scans &
//! TURNSTILE_CAMERA_FEED=/tmp/scans turnstile scan
//! ```

use crate::camera::{CameraError, FrameDecoder, PayloadStream};
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

/// Decoder fed by lines of text
#[derive(Debug)]
pub struct LineDecoder {
    source: Option<PathBuf>,
    paused: Arc<AtomicBool>,
    /// Stop signal of every open feed, by camera session
    stops: Mutex<HashMap<u64, watch::Sender<()>>>,
}

impl LineDecoder {
    /// Decoder reading from `source`; `None` means no camera
    #[must_use]
    pub fn new(source: Option<PathBuf>) -> Self {
        Self {
            source,
            paused: Arc::new(AtomicBool::new(false)),
            stops: Mutex::new(HashMap::new()),
        }
    }

    /// Whether payloads are currently dropped
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn end_stream(&self, session: u64) {
        // Dropping the sender wakes the reader loop
        let stop = self
            .stops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session);
        drop(stop);
    }
}

fn camera_error(error: &std::io::Error) -> CameraError {
    match error.kind() {
        ErrorKind::NotFound => CameraError::NotFound,
        ErrorKind::PermissionDenied => CameraError::PermissionDenied,
        _ => CameraError::StartFailed(error.to_string()),
    }
}

impl FrameDecoder for LineDecoder {
    fn has_camera(&self) -> Pin<Box<dyn Future<Output = bool> + Send>> {
        let source = self.source.clone();
        Box::pin(async move {
            match source {
                Some(path) => tokio::fs::metadata(path).await.is_ok(),
                None => false,
            }
        })
    }

    fn start(
        &self,
        session: u64,
    ) -> Pin<Box<dyn Future<Output = Result<PayloadStream, CameraError>> + Send>> {
        let source = self.source.clone();
        let paused = Arc::clone(&self.paused);
        let (stop_tx, mut stop_rx) = watch::channel(());
        self.stops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session, stop_tx);
        paused.store(false, Ordering::SeqCst);

        Box::pin(async move {
            let path = source.ok_or(CameraError::NotFound)?;
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|e| camera_error(&e))?;
            tracing::info!(feed = %path.display(), session, "Camera feed opened");

            let mut lines = BufReader::new(file).lines();

            let payloads: PayloadStream = Box::pin(async_stream::stream! {
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = stop_rx.changed() => None,
                        line = lines.next_line() => Some(line),
                    };
                    let Some(line) = next else {
                        break;
                    };
                    match line {
                        Ok(Some(line)) => {
                            let payload = line.trim();
                            if payload.is_empty() || paused.load(Ordering::SeqCst) {
                                continue;
                            }
                            yield payload.to_string();
                        },
                        Ok(None) => break,
                        Err(error) => {
                            tracing::warn!(error = %error, "Camera feed read failed");
                            break;
                        },
                    }
                }
            });

            Ok(payloads)
        })
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&self, session: u64) {
        self.end_stream(session);
    }

    fn destroy(&self, session: u64) {
        self.end_stream(session);
        tracing::debug!(session, "Camera feed closed");
    }
}
