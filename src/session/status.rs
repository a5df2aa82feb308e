// SPDX-License-Identifier: GPL-3.0-only

//! User-visible capture status
//!
//! [`project`] maps the controller state and the save outcome to a single
//! [`SessionStatus`]. [`StatusBoard`] keeps the latest inputs and publishes
//! the projection on a watch channel whenever either side changes.

use super::controller::{ControllerSnapshot, ControllerState};
use crate::constants::messages;
use crate::errors::CameraError;
use crate::storage::SaveOutcome;
use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;

/// What the user should be told about the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SessionStatus {
    #[default]
    Idle,
    Initializing,
    PermissionDenied,
    DeviceUnavailable,
    Ready,
    FrameCaptured,
    Saving,
    Saved,
    SaveFailed,
}

impl SessionStatus {
    /// Message shown to the user, empty for `Idle`
    pub fn message(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "",
            SessionStatus::Initializing => messages::INITIALIZING,
            SessionStatus::PermissionDenied => messages::PERMISSION_DENIED,
            SessionStatus::DeviceUnavailable => messages::DEVICE_UNAVAILABLE,
            SessionStatus::Ready => messages::READY,
            SessionStatus::FrameCaptured => messages::FRAME_CAPTURED,
            SessionStatus::Saving => messages::SAVING,
            SessionStatus::Saved => messages::SAVED,
            SessionStatus::SaveFailed => messages::SAVE_FAILED,
        }
    }

    /// Statuses that need the user to act
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SessionStatus::PermissionDenied
                | SessionStatus::DeviceUnavailable
                | SessionStatus::SaveFailed
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Project controller state and save outcome onto one status
///
/// A save outcome other than `Idle` wins over the controller state.
pub fn project(snapshot: &ControllerSnapshot, outcome: &SaveOutcome) -> SessionStatus {
    match outcome {
        SaveOutcome::Saving => return SessionStatus::Saving,
        SaveOutcome::Success(_) => return SessionStatus::Saved,
        SaveOutcome::Error(_) => return SessionStatus::SaveFailed,
        SaveOutcome::Idle => {}
    }

    match snapshot.state {
        ControllerState::Frozen => SessionStatus::FrameCaptured,
        ControllerState::Live => SessionStatus::Ready,
        ControllerState::Requesting => SessionStatus::Initializing,
        ControllerState::Closed => match &snapshot.access_failure {
            Some(CameraError::PermissionDenied) => SessionStatus::PermissionDenied,
            Some(CameraError::DeviceUnavailable(_)) => SessionStatus::DeviceUnavailable,
            _ => SessionStatus::Idle,
        },
    }
}

/// Latest inputs of the projection plus the channel it is published on
pub struct StatusBoard {
    inputs: Mutex<(ControllerSnapshot, SaveOutcome)>,
    sender: watch::Sender<SessionStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(SessionStatus::Idle);
        Self {
            inputs: Mutex::new((ControllerSnapshot::default(), SaveOutcome::Idle)),
            sender,
        }
    }

    pub fn current(&self) -> SessionStatus {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.sender.subscribe()
    }

    pub fn controller_changed(&self, snapshot: &ControllerSnapshot) {
        self.update(|inputs| inputs.0 = snapshot.clone());
    }

    pub fn save_changed(&self, outcome: &SaveOutcome) {
        self.update(|inputs| inputs.1 = outcome.clone());
    }

    fn update(&self, apply: impl FnOnce(&mut (ControllerSnapshot, SaveOutcome))) {
        let mut inputs = self
            .inputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        apply(&mut inputs);
        let status = project(&inputs.0, &inputs.1);

        self.sender.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            debug!(from = %current, to = %status, "Session status changed");
            *current = status;
            true
        });
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SaveError;
    use crate::storage::{SaveReceipt, SaveTier};

    fn snapshot(state: ControllerState) -> ControllerSnapshot {
        ControllerSnapshot {
            state,
            access_failure: None,
        }
    }

    #[test]
    fn test_controller_states() {
        let idle = SaveOutcome::Idle;
        assert_eq!(project(&snapshot(ControllerState::Closed), &idle), SessionStatus::Idle);
        assert_eq!(
            project(&snapshot(ControllerState::Requesting), &idle),
            SessionStatus::Initializing
        );
        assert_eq!(project(&snapshot(ControllerState::Live), &idle), SessionStatus::Ready);
        assert_eq!(
            project(&snapshot(ControllerState::Frozen), &idle),
            SessionStatus::FrameCaptured
        );
    }

    #[test]
    fn test_access_failures() {
        let denied = ControllerSnapshot {
            state: ControllerState::Closed,
            access_failure: Some(CameraError::PermissionDenied),
        };
        let missing = ControllerSnapshot {
            state: ControllerState::Closed,
            access_failure: Some(CameraError::DeviceUnavailable("none".into())),
        };

        let status = project(&denied, &SaveOutcome::Idle);
        assert_eq!(status, SessionStatus::PermissionDenied);
        assert!(status.message().contains("enable camera access"));
        assert_eq!(
            project(&missing, &SaveOutcome::Idle),
            SessionStatus::DeviceUnavailable
        );
        assert_ne!(
            SessionStatus::PermissionDenied.message(),
            SessionStatus::DeviceUnavailable.message()
        );
    }

    #[test]
    fn test_save_outcome_takes_precedence() {
        let frozen = snapshot(ControllerState::Frozen);
        let receipt = SaveReceipt {
            tier: SaveTier::Download,
            location: "a.jpg".into(),
        };

        assert_eq!(project(&frozen, &SaveOutcome::Saving), SessionStatus::Saving);
        assert_eq!(
            project(&frozen, &SaveOutcome::Success(receipt)),
            SessionStatus::Saved
        );
        let failed = project(&frozen, &SaveOutcome::Error(SaveError::Failed("disk".into())));
        assert_eq!(failed, SessionStatus::SaveFailed);
        assert!(failed.is_error());
    }

    #[test]
    fn test_board_publishes_changes_only() {
        let board = StatusBoard::new();
        let mut rx = board.subscribe();

        board.controller_changed(&snapshot(ControllerState::Requesting));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionStatus::Initializing);

        board.controller_changed(&snapshot(ControllerState::Requesting));
        assert!(!rx.has_changed().unwrap());

        board.save_changed(&SaveOutcome::Saving);
        assert_eq!(board.current(), SessionStatus::Saving);
    }
}
