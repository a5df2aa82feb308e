// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CaptureRequest, Facing, Resolution};
use crate::constants::{DEFAULT_CAPTION, FILE_NAME_PREFIX, JPEG_QUALITY, SHARE_TITLE};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Capture session settings
///
/// Built from defaults and command line flags; never written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which camera to prefer (environment/back or user/front)
    pub facing: Facing,
    /// Ideal resolution asked of the device
    pub resolution: Resolution,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Prefix of suggested file names
    pub file_prefix: String,
    /// Title offered with the share tier
    pub share_title: String,
    /// Caption used when publishing without one
    pub default_caption: String,
    /// Where the download tier writes (system downloads dir when unset)
    pub download_dir: Option<PathBuf>,
    /// Explicit capture device (e.g. /dev/video2)
    pub device_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            facing: Facing::default(),
            resolution: Resolution::default(),
            jpeg_quality: JPEG_QUALITY,
            file_prefix: FILE_NAME_PREFIX.to_string(),
            share_title: SHARE_TITLE.to_string(),
            default_caption: DEFAULT_CAPTION.to_string(),
            download_dir: None,
            device_path: None,
        }
    }
}

impl Config {
    /// The request every open and retake of a session uses
    pub fn capture_request(&self) -> CaptureRequest {
        CaptureRequest::new(self.facing, self.resolution)
    }

    /// Reject settings a session cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.resolution.is_empty() {
            return Err(AppError::Config(format!(
                "resolution must be non-zero, got {}",
                self.resolution
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(AppError::Config(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.file_prefix.trim().is_empty() {
            return Err(AppError::Config("file prefix must not be empty".to_string()));
        }
        if self
            .file_prefix
            .contains(|c: char| std::path::is_separator(c) || c.is_control())
        {
            return Err(AppError::Config(format!(
                "file prefix contains invalid characters: {:?}",
                self.file_prefix
            )));
        }
        Ok(())
    }
}
