use std::{fmt, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use crate::errors::CaptureError;

pub const INITIALIZING_TEXT: &str = "Initializing camera...";

const SCAN_FPS: u32 = 15;
const SCAN_BOX_SIZE: u32 = 250;

/// Frame errors that only mean "nothing decodable in view".
const MISS_MARKERS: [&str; 2] = ["No QR code found", "NotFoundException"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountElement {
    Video,
    Canvas,
}

/// The container the camera preview is rendered into.
pub trait MountPoint: Send + Sync {
    fn id(&self) -> &str;

    /// Returns whether an element was actually removed.
    fn remove_element(&self, element: MountElement) -> bool;

    fn has_element(&self, element: MountElement) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    Environment,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub fps: u32,
    /// Side of the square scan region, in pixels.
    pub qrbox: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            fps: SCAN_FPS,
            qrbox: SCAN_BOX_SIZE,
        }
    }
}

/// Camera-backed code reader. `start` renders its preview into the mount
/// point named by `mount_id`.
#[async_trait]
pub trait CameraScanner: Send + Sync {
    async fn start(&self, mount_id: &str, facing: FacingMode, config: ScanConfig) -> Result<(), CaptureError>;

    async fn stop(&self) -> Result<(), CaptureError>;
}

/// Outcome of scanning one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameResult {
    Decoded(String),
    Miss,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Uninitialized,
    Starting,
    Scanning,
    Success,
    Stopped,
    Error,
}

type SuccessCallback = Box<dyn FnOnce(String) + Send>;

struct Inner {
    state: CaptureState,
    /// Bumped by every `start`; only the latest attempt may go live.
    attempt: u64,
    mount: Option<Arc<dyn MountPoint>>,
    error: Option<String>,
    on_success: Option<SuccessCallback>,
}

/// One QR scanning session against a camera.
///
/// Dropping the session tears it down: the preview elements leave the mount
/// point before `drop` returns, while stopping the stream finishes in the
/// background.
pub struct QrCapture {
    scanner: Arc<dyn CameraScanner>,
    inner: Mutex<Inner>,
}

impl QrCapture {
    pub fn new(scanner: Arc<dyn CameraScanner>, on_success: impl FnOnce(String) + Send + 'static) -> Self {
        QrCapture {
            scanner,
            inner: Mutex::new(Inner {
                state: CaptureState::Uninitialized,
                attempt: 0,
                mount: None,
                error: None,
                on_success: Some(Box::new(on_success)),
            }),
        }
    }

    pub fn attach(&self, mount: Arc<dyn MountPoint>) {
        self.inner.lock().mount = Some(mount);
    }

    pub fn state(&self) -> CaptureState {
        self.inner.lock().state
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    /// Text shown in place of the preview, if any.
    pub fn status_text(&self) -> Option<String> {
        let inner = self.inner.lock();
        match (&inner.error, inner.state) {
            (Some(error), _) => Some(error.clone()),
            (None, CaptureState::Scanning) => None,
            (None, _) => Some(INITIALIZING_TEXT.to_string()),
        }
    }

    pub async fn start(&self) -> Result<(), CaptureError> {
        let (mount_id, attempt) = {
            let mut inner = self.inner.lock();
            if matches!(inner.state, CaptureState::Starting | CaptureState::Scanning) {
                return Ok(());
            }
            let mount_id = match &inner.mount {
                Some(mount) => mount.id().to_string(),
                None => return Err(CaptureError::NotMounted),
            };
            inner.attempt += 1;
            inner.state = CaptureState::Starting;
            inner.error = None;
            (mount_id, inner.attempt)
        };

        let started = self
            .scanner
            .start(&mount_id, FacingMode::Environment, ScanConfig::default())
            .await;

        let mut inner = self.inner.lock();
        let current = inner.attempt == attempt;
        let live = matches!(inner.state, CaptureState::Starting | CaptureState::Scanning);

        match started {
            Err(e) => {
                let error = match e {
                    CaptureError::CameraStart(_) => e,
                    other => CaptureError::CameraStart(other.to_string()),
                };
                tracing::error!(mount = %mount_id, attempt, "Camera start error: {}", error);
                if current && inner.state == CaptureState::Starting {
                    inner.state = CaptureState::Error;
                    inner.error = Some(error.to_string());
                }
                Err(error)
            }
            Ok(()) if current && inner.state == CaptureState::Starting => {
                inner.state = CaptureState::Scanning;
                tracing::debug!(mount = %mount_id, attempt, "QR scanner running");
                Ok(())
            }
            Ok(()) if !current && live => {
                // A newer start owns the camera now.
                tracing::debug!(mount = %mount_id, attempt, "Ignoring superseded camera start");
                Ok(())
            }
            Ok(()) => {
                // Torn down while the camera was coming up. The preview was
                // rendered after teardown cleared the mount point.
                let mount = inner.mount.clone();
                drop(inner);
                remove_preview(mount.as_deref());
                stop_detached(Arc::clone(&self.scanner));
                Ok(())
            }
        }
    }

    pub async fn handle_frame(&self, frame: FrameResult) {
        match frame {
            FrameResult::Miss => {}
            FrameResult::Error(message) => {
                if MISS_MARKERS.iter().any(|marker| message.contains(marker)) {
                    return;
                }
                let mut inner = self.inner.lock();
                if inner.state == CaptureState::Scanning {
                    inner.error = Some(CaptureError::Scanner(message).to_string());
                }
            }
            FrameResult::Decoded(code) => {
                let callback = {
                    let mut inner = self.inner.lock();
                    if inner.state != CaptureState::Scanning {
                        return;
                    }
                    inner.state = CaptureState::Success;
                    inner.on_success.take()
                };

                if let Err(e) = self.scanner.stop().await {
                    tracing::error!("Error stopping scanner after success: {}", e);
                }

                if let Some(callback) = callback {
                    callback(code);
                }
            }
        }
    }

    pub fn close(&self) {
        self.teardown();
    }

    fn teardown(&self) {
        let (was_scanning, mount) = {
            let mut inner = self.inner.lock();
            let was_scanning = inner.state == CaptureState::Scanning;
            if matches!(inner.state, CaptureState::Starting | CaptureState::Scanning) {
                inner.state = CaptureState::Stopped;
            }
            (was_scanning, inner.mount.clone())
        };

        remove_preview(mount.as_deref());

        if was_scanning {
            stop_detached(Arc::clone(&self.scanner));
        }
    }
}

impl Drop for QrCapture {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for QrCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("QrCapture")
            .field("state", &inner.state)
            .field("error", &inner.error)
            .finish()
    }
}

fn remove_preview(mount: Option<&dyn MountPoint>) {
    if let Some(mount) = mount {
        mount.remove_element(MountElement::Video);
        mount.remove_element(MountElement::Canvas);
    }
}

fn stop_detached(scanner: Arc<dyn CameraScanner>) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!("No runtime available to stop the camera stream");
        return;
    };

    handle.spawn(async move {
        match scanner.stop().await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => tracing::warn!("Suppressing NotFoundError during scanner stop."),
            Err(e) => tracing::error!("Error during stop: {}", e),
        }
    });
}
