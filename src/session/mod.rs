// SPDX-License-Identifier: GPL-3.0-only

//! Capture sessions
//!
//! A [`CaptureSession`] ties together the [`CaptureController`] (camera
//! lifecycle), the [`TieredSaver`] (persisting the frozen frame) and the
//! [`StatusBoard`] (what the user is told). Hosts drive it through
//! `open → capture → save/publish → close`, with `retake` in between.
//!
//! At most one of `open`, `capture`, `retake` and `save` runs at a time;
//! `close` may be called at any moment and always wins.

pub mod controller;
pub mod status;

pub use controller::{CaptureController, ControllerSnapshot, ControllerState};
pub use status::{SessionStatus, StatusBoard, project};

use crate::backends::camera::{CameraBackend, CaptureRequest};
use crate::config::Config;
use crate::errors::{AppError, AppResult, CameraError, SaveError};
use crate::gallery::{GalleryFeed, GalleryItem, IdentityProvider};
use crate::pipelines::photo::{CapturedFrame, PhotoEncoder};
use crate::storage::{SaveCapabilities, SaveOutcome, TieredSaver};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info};

/// Marks the session busy for the lifetime of one operation
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn try_begin(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct SessionInner {
    controller: CaptureController,
    saver: TieredSaver,
    board: Arc<StatusBoard>,
    busy: AtomicBool,
    request: CaptureRequest,
    default_caption: String,
}

/// One open-to-close capture session
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<SessionInner>,
}

impl CaptureSession {
    /// Build a session from validated settings
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        capabilities: Arc<dyn SaveCapabilities>,
        config: &Config,
    ) -> AppResult<Self> {
        config.validate()?;

        let board = Arc::new(StatusBoard::new());

        let controller_board = Arc::clone(&board);
        let controller = CaptureController::new(
            backend,
            PhotoEncoder::new(config.jpeg_quality),
            config.file_prefix.clone(),
        )
        .with_listener(Arc::new(move |snapshot: &ControllerSnapshot| {
            controller_board.controller_changed(snapshot)
        }));

        let saver_board = Arc::clone(&board);
        let saver = TieredSaver::new(capabilities, config.share_title.clone()).with_listener(
            Arc::new(move |outcome: &SaveOutcome| saver_board.save_changed(outcome)),
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                controller,
                saver,
                board,
                busy: AtomicBool::new(false),
                request: config.capture_request(),
                default_caption: config.default_caption.clone(),
            }),
        })
    }

    /// Current user-visible status
    pub fn status(&self) -> SessionStatus {
        self.inner.board.current()
    }

    /// Status updates, pushed on every controller or save transition
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.board.subscribe()
    }

    pub fn state(&self) -> ControllerState {
        self.inner.controller.state()
    }

    pub fn controller(&self) -> &CaptureController {
        &self.inner.controller
    }

    pub fn save_outcome(&self) -> SaveOutcome {
        self.inner.saver.outcome()
    }

    /// The frozen frame, if one was captured
    pub fn frame(&self) -> Option<Arc<CapturedFrame>> {
        self.inner.controller.frame()
    }

    fn begin(&self) -> Result<InFlight<'_>, CameraError> {
        InFlight::try_begin(&self.inner.busy).ok_or(CameraError::InProgress)
    }

    /// Open the camera with the configured facing and resolution
    pub async fn open(&self) -> AppResult<()> {
        self.open_with(self.inner.request).await
    }

    /// Open the camera with an explicit request
    pub async fn open_with(&self, request: CaptureRequest) -> AppResult<()> {
        let _busy = self.begin()?;
        self.inner.controller.open(request).await?;
        Ok(())
    }

    /// Freeze the current frame; the camera is released afterwards
    pub async fn capture(&self) -> AppResult<Arc<CapturedFrame>> {
        let _busy = self.begin()?;
        Ok(self.inner.controller.capture().await?)
    }

    /// Discard the frame and its save outcome, then go live again
    pub async fn retake(&self) -> AppResult<()> {
        let _busy = self.begin()?;
        if self.inner.controller.state() == ControllerState::Frozen {
            self.inner.saver.reset();
        }
        self.inner.controller.retake().await?;
        Ok(())
    }

    /// Persist the frozen frame through the save tiers
    ///
    /// Returns the terminal outcome. If the session is closed while the
    /// save runs, the save still completes but its outcome is dropped.
    pub async fn save(&self) -> AppResult<SaveOutcome> {
        let _busy = InFlight::try_begin(&self.inner.busy).ok_or(SaveError::InProgress)?;

        let controller = &self.inner.controller;
        let generation = controller.generation();
        let frame = controller.frame().ok_or_else(|| {
            AppError::Camera(CameraError::NotReady {
                operation: "save",
                state: controller.state().name(),
            })
        })?;

        let outcome = self.inner.saver.save(&frame, frame.file_name()).await?;

        if controller.generation() != generation {
            debug!("Session closed while saving, outcome discarded");
            return Err(CameraError::SessionClosed.into());
        }
        Ok(outcome)
    }

    /// Add the frozen frame to `feed`, attributed to the signed-in user
    ///
    /// Uses the saved location as the image URL when the last save
    /// succeeded, otherwise the suggested file name.
    pub fn publish(
        &self,
        caption: Option<&str>,
        identity: &dyn IdentityProvider,
        feed: &dyn GalleryFeed,
    ) -> AppResult<GalleryItem> {
        let author = identity
            .current_user_name()
            .ok_or(AppError::NotAuthenticated)?;

        let controller = &self.inner.controller;
        let frame = controller.frame().ok_or_else(|| {
            AppError::Camera(CameraError::NotReady {
                operation: "publish",
                state: controller.state().name(),
            })
        })?;

        let caption = caption
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.inner.default_caption.as_str());

        let image_url = match self.inner.saver.outcome() {
            SaveOutcome::Success(receipt) => receipt.location,
            _ => frame.file_name().to_string(),
        };

        let item = GalleryItem::new(author, image_url, caption);
        info!(id = %item.id, author = %item.author_name, url = %item.image_url, "Publishing photo");
        feed.append(item.clone());
        Ok(item)
    }

    /// End the session; releases the camera and forgets the frame
    pub fn close(&self) {
        self.inner.controller.close();
        self.inner.saver.reset();
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("controller", &self.inner.controller)
            .field("status", &self.status())
            .finish()
    }
}
