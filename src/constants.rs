// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// MIME type of every encoded frame
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// File extensions accepted by the native save dialog (first one is used for naming)
pub const JPEG_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

/// JPEG quality (0-100) for captured frames
///
/// Matches a 0.8 quality factor: high compression ratio while keeping
/// event photos sharp enough for the gallery.
pub const JPEG_QUALITY: u8 = 80;

/// Prefix of suggested file names (`event-photo-<timestamp>.jpg`)
pub const FILE_NAME_PREFIX: &str = "event-photo";

/// Timestamp layout used in suggested file names (millisecond precision)
pub const FILE_NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S-%3f";

/// Title offered alongside the file in the native share sheet
pub const SHARE_TITLE: &str = "Event photo";

/// Caption applied when the user publishes without writing one
pub const DEFAULT_CAPTION: &str = "A moment from Saraswati Puja 🙏";

/// Folder inside the system pictures directory holding shared photos, and
/// downloads when no downloads directory exists
pub const FALLBACK_SAVE_FOLDER: &str = "Gallery Camera";

/// Ideal capture resolution requested from the device
pub mod resolution {
    /// Ideal width in pixels
    pub const IDEAL_WIDTH: u32 = 1920;
    /// Ideal height in pixels
    pub const IDEAL_HEIGHT: u32 = 1080;
}

/// Synthetic camera defaults
pub mod synthetic {
    /// Native width reported by the synthetic device
    pub const NATIVE_WIDTH: u32 = 640;
    /// Native height reported by the synthetic device
    pub const NATIVE_HEIGHT: u32 = 480;
}

/// V4L2 capture thread tuning
pub mod v4l2 {
    /// Number of mmap buffers requested from the driver
    pub const BUFFER_COUNT: u32 = 4;
    /// Back-off after a failed dequeue before retrying
    pub const RETRY_DELAY_MS: u64 = 10;
    /// Longest wait for a frame before the capture thread re-checks for a stop
    pub const DEQUEUE_TIMEOUT_MS: u64 = 200;
}

/// User-facing status messages
pub mod messages {
    pub const PERMISSION_DENIED: &str =
        "Camera access denied. Please enable camera access in your system settings.";
    pub const DEVICE_UNAVAILABLE: &str =
        "No camera available. Connect a camera or close other apps using it, then try again.";
    pub const SAVE_FAILED: &str = "Could not save the photo. Please try again.";
    pub const INITIALIZING: &str = "Starting camera…";
    pub const READY: &str = "Camera ready";
    pub const FRAME_CAPTURED: &str = "Photo captured";
    pub const SAVING: &str = "Saving photo…";
    pub const SAVED: &str = "Photo saved";
}
