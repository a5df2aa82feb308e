// SPDX-License-Identifier: GPL-3.0-only

//! Desktop save capabilities
//!
//! - File save: native save dialog via `rfd`
//! - Share: the file is staged in the pictures folder and offered through the
//!   desktop portal's share sheet, titled with the share title
//! - Download: the file is written into the downloads directory
//!
//! Dialog-based tiers need a graphical session; without one they report
//! themselves unavailable and the download tier takes over.

use super::portal::{RESPONSE_CANCELLED, RESPONSE_SUCCESS, SharePortal};
use super::save::{SaveCapabilities, SaveFile, TierResult};
use crate::constants::{FALLBACK_SAVE_FOLDER, JPEG_EXTENSIONS};
use crate::errors::SaveError;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Save capabilities backed by the desktop environment
#[derive(Debug, Clone)]
pub struct DesktopCapabilities {
    download_dir: PathBuf,
    share_dir: PathBuf,
    dialogs: bool,
}

impl DesktopCapabilities {
    /// All three tiers, dialogs enabled when a graphical session exists
    pub fn new(download_dir: Option<PathBuf>) -> Self {
        let dialogs = has_graphical_session();
        debug!(dialogs, "Probed desktop save capabilities");
        Self {
            download_dir: download_dir.unwrap_or_else(get_default_download_dir),
            share_dir: get_default_share_dir(),
            dialogs,
        }
    }

    /// Only the download tier; never opens a dialog
    pub fn download_only(download_dir: Option<PathBuf>) -> Self {
        Self {
            dialogs: false,
            ..Self::new(download_dir)
        }
    }
}

impl SaveCapabilities for DesktopCapabilities {
    fn try_save_to_file<'a>(&'a self, file: &'a SaveFile) -> BoxFuture<'a, TierResult> {
        Box::pin(async move {
            if !self.dialogs {
                return TierResult::Unavailable;
            }

            let handle = rfd::AsyncFileDialog::new()
                .set_title("Save photo")
                .set_file_name(&file.name)
                .add_filter("JPEG image", &JPEG_EXTENSIONS)
                .save_file()
                .await;

            let Some(handle) = handle else {
                return TierResult::Cancelled;
            };

            match handle.write(&file.bytes).await {
                Ok(()) => TierResult::Succeeded(handle.path().display().to_string()),
                Err(e) => TierResult::Failed(SaveError::from(e)),
            }
        })
    }

    fn try_share<'a>(&'a self, file: &'a SaveFile, title: &'a str) -> BoxFuture<'a, TierResult> {
        Box::pin(async move {
            if !self.dialogs {
                return TierResult::Unavailable;
            }

            let Some(portal) = SharePortal::connect().await else {
                return TierResult::Unavailable;
            };

            // The shared copy outlives the share sheet, so it must not live in a temp dir
            let staged = match write_file(&self.share_dir, &file.name, &file.bytes).await {
                Ok(path) => path,
                Err(e) => return TierResult::Failed(e),
            };

            info!(title, path = %staged.display(), mime = file.mime_type, "Sharing photo");
            let result = match portal.share(&staged, title).await {
                Ok(code) => share_response(code, &staged),
                Err(e) => TierResult::Failed(e),
            };

            if !matches!(result, TierResult::Succeeded(_)) {
                let _ = tokio::fs::remove_file(&staged).await;
            }
            result
        })
    }

    fn trigger_download<'a>(&'a self, file: &'a SaveFile) -> BoxFuture<'a, TierResult> {
        Box::pin(async move {
            match write_file(&self.download_dir, &file.name, &file.bytes).await {
                Ok(path) => TierResult::Succeeded(path.display().to_string()),
                Err(e) => TierResult::Failed(e),
            }
        })
    }
}

/// True when a Wayland or X11 display is reachable
fn has_graphical_session() -> bool {
    ["WAYLAND_DISPLAY", "DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}

/// Get default downloads directory
pub fn get_default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| {
        dirs::picture_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(FALLBACK_SAVE_FOLDER)
    })
}

/// Folder shared photos are kept in
pub fn get_default_share_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(FALLBACK_SAVE_FOLDER)
}

/// Map a share portal response to the tier result for the staged file
fn share_response(code: u32, staged: &Path) -> TierResult {
    match code {
        RESPONSE_SUCCESS => TierResult::Succeeded(staged.display().to_string()),
        RESPONSE_CANCELLED => TierResult::Cancelled,
        other => {
            debug!(code = other, "Share sheet ended without sharing");
            TierResult::Failed(SaveError::Failed(format!(
                "share ended with portal response {}",
                other
            )))
        }
    }
}

/// Write `bytes` into `dir`, never overwriting an existing file
async fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, SaveError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = unique_path(dir, name).await;
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// `dir/name`, or `dir/stem-N.ext` for the first free N
async fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| JPEG_EXTENSIONS[0].to_string());

    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}-{}.{}", stem, n, ext));
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("gallery-camera-test-{}", uuid::Uuid::new_v4()))
    }

    fn file(name: &str) -> SaveFile {
        SaveFile {
            name: name.to_string(),
            mime_type: "image/jpeg",
            bytes: Arc::from(vec![0xFFu8, 0xD8, 0xFF, 0xD9]),
        }
    }

    #[tokio::test]
    async fn test_download_only_skips_dialog_tiers() {
        let caps = DesktopCapabilities::download_only(Some(temp_dir()));
        let f = file("event-photo-1.jpg");
        assert_eq!(caps.try_save_to_file(&f).await, TierResult::Unavailable);
        assert_eq!(caps.try_share(&f, "Event photo").await, TierResult::Unavailable);
    }

    #[test]
    fn test_shared_copy_is_staged_outside_temp_dir() {
        let caps = DesktopCapabilities::new(Some(temp_dir()));
        let base = dirs::picture_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        assert_eq!(caps.share_dir, base.join(FALLBACK_SAVE_FOLDER));

        // A home inside the temp dir (some CI sandboxes) says nothing about staging
        if !base.starts_with(std::env::temp_dir()) {
            assert!(!caps.share_dir.starts_with(std::env::temp_dir()));
        }
    }

    #[test]
    fn test_share_response_mapping() {
        let staged = Path::new("/home/asha/Pictures/Gallery Camera/event-photo-1.jpg");
        assert_eq!(
            share_response(RESPONSE_SUCCESS, staged),
            TierResult::Succeeded(staged.display().to_string())
        );
        assert_eq!(share_response(RESPONSE_CANCELLED, staged), TierResult::Cancelled);
        assert!(matches!(
            share_response(2, staged),
            TierResult::Failed(SaveError::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_download_writes_bytes() {
        let dir = temp_dir();
        let caps = DesktopCapabilities::download_only(Some(dir.clone()));

        let TierResult::Succeeded(location) = caps.trigger_download(&file("a.jpg")).await else {
            panic!("download should succeed");
        };
        assert_eq!(PathBuf::from(&location), dir.join("a.jpg"));
        assert_eq!(
            std::fs::read(&location).unwrap(),
            vec![0xFF, 0xD8, 0xFF, 0xD9]
        );

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_download_never_overwrites() {
        let dir = temp_dir();
        let caps = DesktopCapabilities::download_only(Some(dir.clone()));

        caps.trigger_download(&file("a.jpg")).await;
        let TierResult::Succeeded(second) = caps.trigger_download(&file("a.jpg")).await else {
            panic!("download should succeed");
        };
        assert_eq!(PathBuf::from(second), dir.join("a-1.jpg"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_download_into_unwritable_location_fails() {
        // A regular file where the directory should be
        let blocker = temp_dir();
        std::fs::write(&blocker, b"not a dir").unwrap();
        let caps = DesktopCapabilities::download_only(Some(blocker.join("nested")));

        assert!(matches!(
            caps.trigger_download(&file("a.jpg")).await,
            TierResult::Failed(SaveError::Failed(_))
        ));

        let _ = std::fs::remove_file(blocker);
    }
}
