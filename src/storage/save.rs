// SPDX-License-Identifier: GPL-3.0-only

//! Tiered on-device saving
//!
//! A frame is persisted by trying each [`SaveTier`] in order, strictly one
//! after another:
//!
//! ```text
//! FileSave ──unavailable/cancelled──▶ Share ──unavailable/cancelled──▶ Download
//!    │                                  │                                 │
//!    ▼                                  ▼                                 ▼
//! Success                            Success                     Success | Error
//! ```
//!
//! Missing capabilities and dismissed dialogs are not errors; they hand the
//! frame to the next tier. Only a failure of the last tier is reported.

use crate::errors::SaveError;
use crate::pipelines::photo::CapturedFrame;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// One candidate save strategy, in fallback-priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SaveTier {
    /// Save-to-location dialog
    FileSave,
    /// Hand the file to another application
    Share,
    /// Drop the file into the downloads location
    Download,
}

impl SaveTier {
    /// Every tier, most persistent first
    pub const ALL: [SaveTier; 3] = [SaveTier::FileSave, SaveTier::Share, SaveTier::Download];

    pub fn display_name(&self) -> &'static str {
        match self {
            SaveTier::FileSave => "file save",
            SaveTier::Share => "share",
            SaveTier::Download => "download",
        }
    }

    /// The last tier has no further fallback
    pub fn is_final(&self) -> bool {
        matches!(self, SaveTier::Download)
    }
}

impl std::fmt::Display for SaveTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Where a successful save put the frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReceipt {
    pub tier: SaveTier,
    /// Path or reference the bytes landed at
    pub location: String,
}

/// Result of a single tier attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierResult {
    /// The platform does not offer this capability
    Unavailable,
    /// The user dismissed the dialog
    Cancelled,
    /// Saved; carries the location
    Succeeded(String),
    /// The capability exists but persisting failed
    Failed(SaveError),
}

/// A frame packaged as a named file
#[derive(Debug, Clone)]
pub struct SaveFile {
    pub name: String,
    pub mime_type: &'static str,
    pub bytes: Arc<[u8]>,
}

impl SaveFile {
    pub fn from_frame(frame: &CapturedFrame, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: frame.mime_type(),
            bytes: frame.shared_bytes(),
        }
    }
}

/// Platform save capabilities, one method per tier
///
/// Each method is an independent probe-and-attempt: it reports
/// [`TierResult::Unavailable`] when the platform lacks the feature.
pub trait SaveCapabilities: Send + Sync {
    fn try_save_to_file<'a>(&'a self, file: &'a SaveFile) -> BoxFuture<'a, TierResult>;

    fn try_share<'a>(&'a self, file: &'a SaveFile, title: &'a str) -> BoxFuture<'a, TierResult>;

    fn trigger_download<'a>(&'a self, file: &'a SaveFile) -> BoxFuture<'a, TierResult>;
}

/// Save state visible to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveOutcome {
    #[default]
    Idle,
    Saving,
    Success(SaveReceipt),
    Error(SaveError),
}

impl SaveOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaveOutcome::Success(_) | SaveOutcome::Error(_))
    }
}

struct SaverState {
    outcome: SaveOutcome,
    /// Bumped by `reset`; a save that started under an older generation
    /// does not publish its outcome
    generation: u64,
}

/// Callback invoked with every new save outcome
pub type OutcomeListener = Arc<dyn Fn(&SaveOutcome) + Send + Sync>;

/// Drives the save tiers and owns the save outcome
pub struct TieredSaver {
    capabilities: Arc<dyn SaveCapabilities>,
    share_title: String,
    listener: Option<OutcomeListener>,
    state: Mutex<SaverState>,
}

impl TieredSaver {
    pub fn new(capabilities: Arc<dyn SaveCapabilities>, share_title: impl Into<String>) -> Self {
        Self {
            capabilities,
            share_title: share_title.into(),
            listener: None,
            state: Mutex::new(SaverState {
                outcome: SaveOutcome::Idle,
                generation: 0,
            }),
        }
    }

    /// Report outcome changes to `listener`
    pub fn with_listener(mut self, listener: OutcomeListener) -> Self {
        self.listener = Some(listener);
        self
    }

    fn set_outcome(&self, state: &mut SaverState, outcome: SaveOutcome) {
        state.outcome = outcome;
        if let Some(listener) = &self.listener {
            listener(&state.outcome);
        }
    }

    /// Current outcome (read-only view)
    pub fn outcome(&self) -> SaveOutcome {
        self.state
            .lock()
            .map(|state| state.outcome.clone())
            .unwrap_or_default()
    }

    /// Forget the previous outcome; any save still running is orphaned
    pub fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.generation += 1;
            self.set_outcome(&mut state, SaveOutcome::Idle);
        }
    }

    /// Persist `frame` under `suggested_name`
    ///
    /// Returns the terminal outcome (`Success` or `Error`). Fails with
    /// [`SaveError::InProgress`] if a save is already running.
    pub async fn save(
        &self,
        frame: &CapturedFrame,
        suggested_name: &str,
    ) -> Result<SaveOutcome, SaveError> {
        let generation = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| SaveError::Failed("save state poisoned".to_string()))?;
            if state.outcome == SaveOutcome::Saving {
                return Err(SaveError::InProgress);
            }
            self.set_outcome(&mut state, SaveOutcome::Saving);
            state.generation
        };

        let file = SaveFile::from_frame(frame, suggested_name);
        info!(file = %file.name, size = file.bytes.len(), "Saving photo");

        let outcome = self.run_tiers(&file).await;

        if let Ok(mut state) = self.state.lock() {
            if state.generation == generation {
                self.set_outcome(&mut state, outcome.clone());
            } else {
                debug!("Save finished after reset, outcome discarded");
            }
        }

        Ok(outcome)
    }

    async fn run_tiers(&self, file: &SaveFile) -> SaveOutcome {
        let mut final_failure = None;

        for tier in SaveTier::ALL {
            match self.attempt(tier, file).await {
                TierResult::Succeeded(location) => {
                    info!(%tier, %location, "Photo saved");
                    return SaveOutcome::Success(SaveReceipt { tier, location });
                }
                TierResult::Unavailable => {
                    debug!(%tier, "Save tier unavailable, falling through");
                }
                TierResult::Cancelled | TierResult::Failed(SaveError::Cancelled) => {
                    info!(%tier, "Save tier cancelled by user, falling through");
                }
                TierResult::Failed(err) => {
                    if tier.is_final() {
                        warn!(%tier, error = %err, "Final save tier failed");
                        final_failure = Some(err);
                    } else {
                        warn!(%tier, error = %err, "Save tier failed, falling through");
                    }
                }
            }
        }

        SaveOutcome::Error(final_failure.unwrap_or_else(|| {
            SaveError::Failed("no save method available".to_string())
        }))
    }

    async fn attempt(&self, tier: SaveTier, file: &SaveFile) -> TierResult {
        debug!(%tier, file = %file.name, "Trying save tier");
        match tier {
            SaveTier::FileSave => self.capabilities.try_save_to_file(file).await,
            SaveTier::Share => self.capabilities.try_share(file, &self.share_title).await,
            SaveTier::Download => self.capabilities.trigger_download(file).await,
        }
    }
}

impl std::fmt::Debug for TieredSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredSaver")
            .field("share_title", &self.share_title)
            .field("outcome", &self.outcome())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::photo::EncodedImage;
    use chrono::Local;

    /// Scripted capabilities recording which tiers ran
    struct Scripted {
        file_save: TierResult,
        share: TierResult,
        download: TierResult,
        calls: Mutex<Vec<SaveTier>>,
    }

    impl Scripted {
        fn new(file_save: TierResult, share: TierResult, download: TierResult) -> Arc<Self> {
            Arc::new(Self {
                file_save,
                share,
                download,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<SaveTier> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, tier: SaveTier, result: &TierResult) -> BoxFuture<'_, TierResult> {
            self.calls.lock().unwrap().push(tier);
            let result = result.clone();
            Box::pin(async move { result })
        }
    }

    impl SaveCapabilities for Scripted {
        fn try_save_to_file<'a>(&'a self, _file: &'a SaveFile) -> BoxFuture<'a, TierResult> {
            self.record(SaveTier::FileSave, &self.file_save)
        }

        fn try_share<'a>(&'a self, _file: &'a SaveFile, title: &'a str) -> BoxFuture<'a, TierResult> {
            assert_eq!(title, "Event photo");
            self.record(SaveTier::Share, &self.share)
        }

        fn trigger_download<'a>(&'a self, _file: &'a SaveFile) -> BoxFuture<'a, TierResult> {
            self.record(SaveTier::Download, &self.download)
        }
    }

    fn frame() -> CapturedFrame {
        CapturedFrame::new(
            EncodedImage {
                data: vec![0xFF, 0xD8, 0xFF, 0xD9],
                width: 2,
                height: 2,
            },
            Local::now(),
            "event-photo",
        )
    }

    #[tokio::test]
    async fn test_cancelled_file_save_falls_through_to_share() {
        let caps = Scripted::new(
            TierResult::Cancelled,
            TierResult::Succeeded("shared".into()),
            TierResult::Succeeded("downloaded".into()),
        );
        let saver = TieredSaver::new(caps.clone(), "Event photo");
        let frame = frame();

        let outcome = saver.save(&frame, frame.file_name()).await.unwrap();

        assert_eq!(
            outcome,
            SaveOutcome::Success(SaveReceipt {
                tier: SaveTier::Share,
                location: "shared".into()
            })
        );
        assert_eq!(caps.calls(), vec![SaveTier::FileSave, SaveTier::Share]);
        assert_eq!(saver.outcome(), outcome);
    }

    #[tokio::test]
    async fn test_non_final_failure_is_not_an_error() {
        let caps = Scripted::new(
            TierResult::Failed(SaveError::Failed("dialog crashed".into())),
            TierResult::Unavailable,
            TierResult::Succeeded("downloaded".into()),
        );
        let saver = TieredSaver::new(caps, "Event photo");
        let frame = frame();

        let outcome = saver.save(&frame, frame.file_name()).await.unwrap();
        assert!(matches!(
            outcome,
            SaveOutcome::Success(SaveReceipt {
                tier: SaveTier::Download,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_missing_final_tier_is_an_error() {
        let caps = Scripted::new(
            TierResult::Unavailable,
            TierResult::Cancelled,
            TierResult::Unavailable,
        );
        let saver = TieredSaver::new(caps, "Event photo");
        let frame = frame();

        let outcome = saver.save(&frame, frame.file_name()).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Error(SaveError::Failed(_))));
    }

    #[tokio::test]
    async fn test_reset_discards_late_outcome() {
        let caps = Scripted::new(
            TierResult::Succeeded("saved".into()),
            TierResult::Unavailable,
            TierResult::Unavailable,
        );
        let saver = TieredSaver::new(caps, "Event photo");
        let frame = frame();

        saver.save(&frame, frame.file_name()).await.unwrap();
        assert!(saver.outcome().is_terminal());
        saver.reset();
        assert_eq!(saver.outcome(), SaveOutcome::Idle);
    }

    #[tokio::test]
    async fn test_listener_sees_every_outcome() {
        let caps = Scripted::new(
            TierResult::Unavailable,
            TierResult::Unavailable,
            TierResult::Succeeded("downloaded".into()),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let saver = TieredSaver::new(caps, "Event photo").with_listener(Arc::new(
            move |outcome: &SaveOutcome| sink.lock().unwrap().push(outcome.clone()),
        ));
        let frame = frame();

        saver.save(&frame, frame.file_name()).await.unwrap();
        saver.reset();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], SaveOutcome::Saving);
        assert!(matches!(seen[1], SaveOutcome::Success(_)));
        assert_eq!(seen[2], SaveOutcome::Idle);
    }

    #[test]
    fn test_tier_order() {
        assert_eq!(
            SaveTier::ALL,
            [SaveTier::FileSave, SaveTier::Share, SaveTier::Download]
        );
        assert!(SaveTier::Download.is_final());
        assert!(!SaveTier::FileSave.is_final());
    }
}
