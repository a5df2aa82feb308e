// SPDX-License-Identifier: GPL-3.0-only

//! Error types for capture sessions, saving, and the gallery

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Capture session errors
    Camera(CameraError),
    /// Save errors
    Save(SaveError),
    /// No signed-in user to attribute a capture to
    NotAuthenticated,
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Capture session errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// The user or platform refused access to the camera
    PermissionDenied,
    /// No capture device, or the device is busy
    DeviceUnavailable(String),
    /// Operation invoked out of state-machine order
    NotReady {
        operation: &'static str,
        state: &'static str,
    },
    /// Another open/capture/save is still in flight for this session
    InProgress,
    /// The device is live but has not delivered a frame yet
    NoFrameYet,
    /// The frame could not be encoded
    EncodingFailed(String),
    /// The session was closed while the operation was pending
    SessionClosed,
}

/// Save errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The user dismissed a native dialog (never a user-visible error)
    Cancelled,
    /// I/O or encoding failure while persisting the frame
    Failed(String),
    /// A save is already running for this session
    InProgress,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Save(e) => write!(f, "Save error: {}", e),
            AppError::NotAuthenticated => write!(f, "No signed-in user"),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::PermissionDenied => write!(f, "Camera permission denied"),
            CameraError::DeviceUnavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            CameraError::NotReady { operation, state } => {
                write!(f, "Cannot {} while session is {}", operation, state)
            }
            CameraError::InProgress => write!(f, "Another operation is in progress"),
            CameraError::NoFrameYet => write!(f, "Camera has not delivered a frame yet"),
            CameraError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            CameraError::SessionClosed => write!(f, "Session was closed"),
        }
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Cancelled => write!(f, "Save cancelled"),
            SaveError::Failed(msg) => write!(f, "Save failed: {}", msg),
            SaveError::InProgress => write!(f, "Save already in progress"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for SaveError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<SaveError> for AppError {
    fn from(err: SaveError) -> Self {
        AppError::Save(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for SaveError {
    fn from(err: std::io::Error) -> Self {
        SaveError::Failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_message_names_operation() {
        let err = CameraError::NotReady {
            operation: "capture",
            state: "closed",
        };
        assert_eq!(err.to_string(), "Cannot capture while session is closed");
    }

    #[test]
    fn test_io_error_becomes_save_failure() {
        let io = std::io::Error::other("disk full");
        assert_eq!(SaveError::from(io), SaveError::Failed("disk full".into()));
    }
}
