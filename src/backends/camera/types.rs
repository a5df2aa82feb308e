// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::errors::CameraError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Video4Linux2 capture via the v4l crate
    #[default]
    V4l2,
    /// Generated test pattern, no hardware involved
    Synthetic,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear camera, pointing away from the user
    #[default]
    Environment,
    /// Front camera, pointing at the user
    User,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Environment => "environment",
            Facing::User => "user",
        }
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "environment" | "back" | "rear" => Ok(Facing::Environment),
            "user" | "front" => Ok(Facing::User),
            other => Err(format!("unknown camera facing '{}'", other)),
        }
    }
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        use crate::constants::resolution::{IDEAL_HEIGHT, IDEAL_WIDTH};
        Self::new(IDEAL_WIDTH, IDEAL_HEIGHT)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`, e.g. `1920x1080`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w
            .parse()
            .map_err(|_| format!("invalid width '{}'", w))?;
        let height = h
            .parse()
            .map_err(|_| format!("invalid height '{}'", h))?;
        Ok(Self::new(width, height))
    }
}

/// Parameters of a device acquisition
///
/// Kept by the controller so a retake re-requests exactly what the
/// original open asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub facing: Facing,
    /// Ideal resolution; the device may deliver a different native one
    pub resolution: Resolution,
}

impl CaptureRequest {
    pub fn new(facing: Facing, resolution: Resolution) -> Self {
        Self { facing, resolution }
    }
}

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Device path (e.g., /dev/video0)
    pub path: String,
}

/// Pixel format of raw preview frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    Rgba,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    Rgb24,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    /// Common raw format from webcam sensors
    Yuyv,
    /// Motion JPEG - each buffer is a complete JPEG image
    Mjpeg,
}

impl PixelFormat {
    /// Map a V4L2 FourCC to a supported pixel format
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"YUYV" => Some(Self::Yuyv),
            b"MJPG" => Some(Self::Mjpeg),
            b"RGB3" => Some(Self::Rgb24),
            b"AB24" => Some(Self::Rgba),
            _ => None,
        }
    }
}

/// A single raw frame from the live preview
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes (0 for MJPEG)
    pub stride: u32,
    /// When the frame left the device
    pub captured_at: Instant,
}

impl CameraFrame {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The platform refused access to the device
    PermissionDenied(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Device exists but is held by another process
    Busy(String),
    /// Format not supported
    FormatNotSupported(String),
    /// General I/O error
    IoError(String),
}

impl BackendError {
    /// Classify an I/O error raised while opening or configuring a device
    pub fn from_io(context: &str, err: &std::io::Error) -> Self {
        let msg = format!("{}: {}", context, err);
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(msg),
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(msg),
            std::io::ErrorKind::ResourceBusy => BackendError::Busy(msg),
            _ => BackendError::IoError(msg),
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::Busy(msg) => write!(f, "Device busy: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for CameraError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::PermissionDenied(_) => CameraError::PermissionDenied,
            other => CameraError::DeviceUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_parsing() {
        assert_eq!("environment".parse::<Facing>(), Ok(Facing::Environment));
        assert_eq!("User".parse::<Facing>(), Ok(Facing::User));
        assert!("sideways".parse::<Facing>().is_err());
    }

    #[test]
    fn test_resolution_parsing() {
        assert_eq!(
            "1920x1080".parse::<Resolution>(),
            Ok(Resolution::new(1920, 1080))
        );
        assert!("1920".parse::<Resolution>().is_err());
        assert!("ax1080".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_default_request_is_environment_full_hd() {
        let request = CaptureRequest::default();
        assert_eq!(request.facing, Facing::Environment);
        assert_eq!(request.resolution, Resolution::new(1920, 1080));
    }

    #[test]
    fn test_permission_io_error_maps_to_denial() {
        let io = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let backend = BackendError::from_io("/dev/video0", &io);
        assert_eq!(CameraError::from(backend), CameraError::PermissionDenied);

        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        let backend = BackendError::from_io("/dev/video9", &io);
        assert!(matches!(
            CameraError::from(backend),
            CameraError::DeviceUnavailable(_)
        ));
    }

    #[test]
    fn test_fourcc_mapping() {
        assert_eq!(PixelFormat::from_fourcc(b"YUYV"), Some(PixelFormat::Yuyv));
        assert_eq!(PixelFormat::from_fourcc(b"MJPG"), Some(PixelFormat::Mjpeg));
        assert_eq!(PixelFormat::from_fourcc(b"Y10B"), None);
    }
}
