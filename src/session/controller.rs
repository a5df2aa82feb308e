// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! Owns the camera for one session and walks it through
//!
//! ```text
//! Closed ──open──▶ Requesting ──grant──▶ Live ──capture──▶ Frozen
//!   ▲                  │                                      │
//!   │               denial                                 retake
//!   │                  ▼                                      │
//!   └──── close ─── Closed            Requesting ◀────────────┘
//! ```
//!
//! The device handle never leaves this type. State sits behind a plain
//! mutex that is never held across an `.await`; every pending operation
//! remembers the generation it started in, and `close` bumps the
//! generation so late results are released and dropped.

use crate::backends::camera::{CameraBackend, CaptureRequest, DeviceHandle, Resolution};
use crate::errors::CameraError;
use crate::pipelines::photo::{CapturedFrame, PhotoEncoder};
use chrono::Local;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Controller state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ControllerState {
    #[default]
    Closed,
    Requesting,
    Live,
    Frozen,
}

impl ControllerState {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerState::Closed => "closed",
            ControllerState::Requesting => "requesting",
            ControllerState::Live => "live",
            ControllerState::Frozen => "frozen",
        }
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the status projection needs to know about the controller
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerSnapshot {
    pub state: ControllerState,
    /// Denial or missing device from the last acquisition, kept until the
    /// next open or close
    pub access_failure: Option<CameraError>,
}

#[derive(Default)]
struct ControllerInner {
    state: ControllerState,
    handle: Option<DeviceHandle>,
    request: Option<CaptureRequest>,
    frame: Option<Arc<CapturedFrame>>,
    access_failure: Option<CameraError>,
    generation: u64,
    encoding: bool,
}

impl ControllerInner {
    fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state,
            access_failure: self.access_failure.clone(),
        }
    }
}

/// Callback invoked with a snapshot after every state transition
pub type SnapshotListener = Arc<dyn Fn(&ControllerSnapshot) + Send + Sync>;

/// Camera lifecycle for one capture session
pub struct CaptureController {
    backend: Arc<dyn CameraBackend>,
    encoder: PhotoEncoder,
    file_prefix: String,
    listener: Option<SnapshotListener>,
    inner: Mutex<ControllerInner>,
}

impl CaptureController {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        encoder: PhotoEncoder,
        file_prefix: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            encoder,
            file_prefix: file_prefix.into(),
            listener: None,
            inner: Mutex::new(ControllerInner::default()),
        }
    }

    /// Report every state transition to `listener`
    pub fn with_listener(mut self, listener: SnapshotListener) -> Self {
        self.listener = Some(listener);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, inner: &ControllerInner) {
        if let Some(listener) = &self.listener {
            listener(&inner.snapshot());
        }
    }

    fn not_ready(operation: &'static str, state: ControllerState) -> CameraError {
        warn!(operation, %state, "Operation invoked out of order");
        CameraError::NotReady {
            operation,
            state: state.name(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.lock().state
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.lock().snapshot()
    }

    /// Generation of the current acquisition; changes on open, retake and close
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Parameters of the last open
    pub fn request(&self) -> Option<CaptureRequest> {
        self.lock().request
    }

    /// The frozen frame, if any
    pub fn frame(&self) -> Option<Arc<CapturedFrame>> {
        self.lock().frame.clone()
    }

    /// True while a device handle is held
    pub fn holds_device(&self) -> bool {
        self.lock().handle.is_some()
    }

    /// Resolution the live device streams at
    pub fn native_resolution(&self) -> Option<Resolution> {
        self.lock()
            .handle
            .as_ref()
            .and_then(|handle| handle.native_resolution())
    }

    /// Acquire the camera and go live
    ///
    /// No-op when already live.
    pub async fn open(&self, request: CaptureRequest) -> Result<(), CameraError> {
        let generation = {
            let mut inner = self.lock();
            match inner.state {
                ControllerState::Live => {
                    debug!("Camera already live, open ignored");
                    return Ok(());
                }
                ControllerState::Requesting => return Err(CameraError::InProgress),
                ControllerState::Frozen => return Err(Self::not_ready("open", inner.state)),
                ControllerState::Closed => {}
            }

            inner.request = Some(request);
            inner.frame = None;

            if !self.backend.is_available() {
                let err = CameraError::DeviceUnavailable(format!(
                    "{} backend reports no camera support",
                    self.backend.backend_type()
                ));
                warn!(error = %err, "Camera capability probe failed");
                inner.access_failure = Some(err.clone());
                self.notify(&inner);
                return Err(err);
            }

            inner.access_failure = None;
            inner.generation += 1;
            inner.state = ControllerState::Requesting;
            self.notify(&inner);
            inner.generation
        };

        self.acquire(request, generation).await
    }

    async fn acquire(&self, request: CaptureRequest, generation: u64) -> Result<(), CameraError> {
        info!(
            facing = %request.facing,
            resolution = %request.resolution,
            backend = %self.backend.backend_type(),
            "Requesting camera"
        );

        let result = self.backend.acquire(&request).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            drop(inner);
            if let Ok(handle) = result {
                info!("Session closed during acquisition, releasing camera");
                handle.release();
            }
            return Err(CameraError::SessionClosed);
        }

        match result {
            Ok(handle) => {
                info!(
                    device = %handle.device_name(),
                    native = ?handle.native_resolution(),
                    "Camera live"
                );
                inner.handle = Some(handle);
                inner.state = ControllerState::Live;
                self.notify(&inner);
                Ok(())
            }
            Err(e) => {
                let err = CameraError::from(e);
                warn!(error = %err, "Camera acquisition failed");
                inner.state = ControllerState::Closed;
                inner.access_failure = Some(err.clone());
                self.notify(&inner);
                Err(err)
            }
        }
    }

    /// Freeze the current preview frame into an encoded still
    ///
    /// Releases the camera once the still exists.
    pub async fn capture(&self) -> Result<Arc<CapturedFrame>, CameraError> {
        let (raw, generation) = {
            let mut inner = self.lock();
            if inner.state != ControllerState::Live {
                return Err(Self::not_ready("capture", inner.state));
            }
            if inner.encoding {
                return Err(CameraError::InProgress);
            }

            let raw = match inner.handle.as_mut() {
                Some(handle) => handle.latest_frame()?,
                None => return Err(Self::not_ready("capture", inner.state)),
            };
            let Some(raw) = raw else {
                debug!("Camera live but no frame delivered yet");
                return Err(CameraError::NoFrameYet);
            };

            inner.encoding = true;
            (raw, inner.generation)
        };

        let captured_at = Local::now();
        let encoded = self.encoder.encode(raw).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!("Session closed during encoding, frame dropped");
            return Err(CameraError::SessionClosed);
        }
        inner.encoding = false;

        let encoded = encoded.map_err(|e| {
            error!(error = %e, "Failed to encode frame");
            CameraError::EncodingFailed(e)
        })?;

        let frame = Arc::new(CapturedFrame::new(encoded, captured_at, &self.file_prefix));
        let handle = inner.handle.take();
        inner.frame = Some(Arc::clone(&frame));
        inner.state = ControllerState::Frozen;
        self.notify(&inner);
        drop(inner);

        if let Some(handle) = handle {
            handle.release();
        }

        info!(
            file = %frame.file_name(),
            width = frame.width(),
            height = frame.height(),
            size = frame.bytes().len(),
            "Frame captured"
        );
        Ok(frame)
    }

    /// Drop the frozen frame and acquire the camera again with the
    /// parameters of the original open
    pub async fn retake(&self) -> Result<(), CameraError> {
        let (request, generation) = {
            let mut inner = self.lock();
            if inner.state != ControllerState::Frozen {
                return Err(Self::not_ready("retake", inner.state));
            }
            let Some(request) = inner.request else {
                return Err(Self::not_ready("retake", inner.state));
            };

            inner.frame = None;
            inner.generation += 1;
            inner.state = ControllerState::Requesting;
            self.notify(&inner);
            (request, inner.generation)
        };

        info!("Retaking photo");
        self.acquire(request, generation).await
    }

    /// Release everything and return to `Closed`
    ///
    /// Idempotent. Pending acquisitions and encodes finish in the
    /// background and are discarded.
    pub fn close(&self) {
        let handle = {
            let mut inner = self.lock();
            let previous = inner.state;
            inner.generation += 1;
            inner.state = ControllerState::Closed;
            inner.frame = None;
            inner.access_failure = None;
            inner.encoding = false;
            let handle = inner.handle.take();
            self.notify(&inner);
            debug!(%previous, "Capture session closed");
            handle
        };

        if let Some(handle) = handle {
            handle.release();
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CaptureController")
            .field("backend", &self.backend.backend_type())
            .field("state", &inner.state)
            .field("holds_device", &inner.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{
        Facing, SyntheticBackend, SyntheticBehavior, SyntheticStats,
    };

    fn controller(backend: SyntheticBackend) -> (CaptureController, Arc<SyntheticStats>) {
        let stats = backend.stats();
        (
            CaptureController::new(Arc::new(backend), PhotoEncoder::default(), "event-photo"),
            stats,
        )
    }

    #[tokio::test]
    async fn test_open_reaches_live() {
        let (ctrl, stats) = controller(SyntheticBackend::new());
        ctrl.open(CaptureRequest::default()).await.unwrap();
        assert_eq!(ctrl.state(), ControllerState::Live);
        assert!(ctrl.holds_device());
        assert_eq!(stats.live_devices(), 1);
    }

    #[tokio::test]
    async fn test_open_twice_is_noop() {
        let (ctrl, stats) = controller(SyntheticBackend::new());
        ctrl.open(CaptureRequest::default()).await.unwrap();
        ctrl.open(CaptureRequest::default()).await.unwrap();
        assert_eq!(stats.acquisitions(), 1);
    }

    #[tokio::test]
    async fn test_denial_closes_session() {
        let (ctrl, stats) = controller(SyntheticBackend::with_behavior(SyntheticBehavior::Deny));
        let err = ctrl.open(CaptureRequest::default()).await.unwrap_err();
        assert_eq!(err, CameraError::PermissionDenied);
        assert_eq!(ctrl.state(), ControllerState::Closed);
        assert_eq!(
            ctrl.snapshot().access_failure,
            Some(CameraError::PermissionDenied)
        );
        assert_eq!(stats.live_devices(), 0);
    }

    #[tokio::test]
    async fn test_missing_device_is_unavailable() {
        let (ctrl, _) = controller(SyntheticBackend::with_behavior(SyntheticBehavior::Unavailable));
        let err = ctrl.open(CaptureRequest::default()).await.unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
        assert_eq!(ctrl.state(), ControllerState::Closed);
    }

    #[tokio::test]
    async fn test_failed_probe_skips_backend() {
        let (ctrl, stats) = controller(SyntheticBackend::new().unavailable());
        let err = ctrl.open(CaptureRequest::default()).await.unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
        assert!(stats.requests().is_empty());
    }

    #[tokio::test]
    async fn test_capture_outside_live_is_not_ready() {
        let (ctrl, _) = controller(SyntheticBackend::new());
        let err = ctrl.capture().await.unwrap_err();
        assert!(matches!(err, CameraError::NotReady { operation: "capture", .. }));
        assert!(ctrl.frame().is_none());
    }

    #[tokio::test]
    async fn test_capture_freezes_and_releases() {
        let (ctrl, stats) = controller(
            SyntheticBackend::new().with_native_resolution(Resolution::new(320, 240)),
        );
        ctrl.open(CaptureRequest::new(Facing::User, Resolution::new(1920, 1080)))
            .await
            .unwrap();

        let frame = ctrl.capture().await.unwrap();
        assert_eq!((frame.width(), frame.height()), (320, 240));
        assert_eq!(ctrl.state(), ControllerState::Frozen);
        assert!(!ctrl.holds_device());
        assert_eq!(stats.releases(), 1);

        // Capturing again from Frozen is out of order
        assert!(matches!(
            ctrl.capture().await,
            Err(CameraError::NotReady { .. })
        ));
    }

    #[tokio::test]
    async fn test_capture_without_frames_stays_live() {
        let (ctrl, stats) = controller(SyntheticBackend::with_behavior(SyntheticBehavior::NoFrames));
        ctrl.open(CaptureRequest::default()).await.unwrap();

        assert_eq!(ctrl.capture().await.unwrap_err(), CameraError::NoFrameYet);
        assert_eq!(ctrl.state(), ControllerState::Live);
        assert_eq!(stats.live_devices(), 1);
    }

    #[tokio::test]
    async fn test_retake_outside_frozen_is_not_ready() {
        let (ctrl, _) = controller(SyntheticBackend::new());
        ctrl.open(CaptureRequest::default()).await.unwrap();
        assert!(matches!(
            ctrl.retake().await,
            Err(CameraError::NotReady { operation: "retake", .. })
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (ctrl, stats) = controller(SyntheticBackend::new());
        ctrl.open(CaptureRequest::default()).await.unwrap();
        ctrl.close();
        ctrl.close();
        assert_eq!(ctrl.state(), ControllerState::Closed);
        assert_eq!(stats.releases(), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_device() {
        let (ctrl, stats) = controller(SyntheticBackend::new());
        ctrl.open(CaptureRequest::default()).await.unwrap();
        drop(ctrl);
        assert_eq!(stats.live_devices(), 0);
    }
}
