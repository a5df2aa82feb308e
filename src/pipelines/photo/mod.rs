// SPDX-License-Identifier: GPL-3.0-only

//! Still capture pipeline
//!
//! ```text
//! Live preview frame → RGB conversion → JPEG encoding → CapturedFrame
//! ```
//!
//! A [`CapturedFrame`] is immutable once produced. A retake produces a new
//! one instead of touching the old.

pub mod encoding;

pub use encoding::{EncodedImage, PhotoEncoder};

use crate::constants::{FILE_NAME_TIMESTAMP_FORMAT, JPEG_EXTENSIONS, JPEG_MIME_TYPE};
use chrono::{DateTime, Local};
use std::sync::Arc;
use uuid::Uuid;

/// An encoded still image taken from the live feed
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    id: Uuid,
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
    captured_at: DateTime<Local>,
    file_name: String,
}

impl CapturedFrame {
    /// Wrap encoded bytes, naming the file after the capture time
    pub fn new(encoded: EncodedImage, captured_at: DateTime<Local>, file_prefix: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes: Arc::from(encoded.data),
            width: encoded.width,
            height: encoded.height,
            file_name: suggested_file_name(file_prefix, &captured_at),
            captured_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// JPEG byte stream
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the byte stream
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub fn mime_type(&self) -> &'static str {
        JPEG_MIME_TYPE
    }

    /// Deterministic suggested file name, e.g. `event-photo-20250203-091500-123.jpg`
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Build `<prefix>-<timestamp>.jpg` for a capture time
pub fn suggested_file_name(prefix: &str, captured_at: &DateTime<Local>) -> String {
    format!(
        "{}-{}.{}",
        prefix,
        captured_at.format(FILE_NAME_TIMESTAMP_FORMAT),
        JPEG_EXTENSIONS[0]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_layout() {
        let at = Local
            .with_ymd_and_hms(2025, 2, 3, 9, 15, 0)
            .single()
            .expect("valid local time");
        assert_eq!(
            suggested_file_name("event-photo", &at),
            "event-photo-20250203-091500-000.jpg"
        );
    }

    #[test]
    fn test_file_names_differ_by_millisecond() {
        let at = Local
            .with_ymd_and_hms(2025, 2, 3, 9, 15, 0)
            .single()
            .expect("valid local time");
        let later = at + chrono::Duration::milliseconds(1);
        assert_ne!(
            suggested_file_name("event-photo", &at),
            suggested_file_name("event-photo", &later)
        );
    }

    #[test]
    fn test_captured_frame_accessors() {
        let encoded = EncodedImage {
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width: 4,
            height: 3,
        };
        let frame = CapturedFrame::new(encoded, Local::now(), "event-photo");
        assert_eq!(frame.bytes().len(), 4);
        assert_eq!((frame.width(), frame.height()), (4, 3));
        assert_eq!(frame.mime_type(), "image/jpeg");
        assert!(frame.file_name().starts_with("event-photo-"));
        assert!(frame.file_name().ends_with(".jpg"));
    }
}
