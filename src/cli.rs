// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking a photo through a full capture session

use gallery_camera::backends::camera::{
    CameraBackendType, Facing, Resolution, get_backend_for_type,
};
use gallery_camera::errors::CameraError;
use gallery_camera::storage::{DesktopCapabilities, SaveReceipt};
use gallery_camera::{
    AppError, CaptureSession, Config, GalleryItem, InMemoryFeed, SaveOutcome,
    SessionStatus, StaticIdentity,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Options of the `photo` command
pub struct PhotoOptions {
    pub facing: Facing,
    pub resolution: Resolution,
    pub synthetic: bool,
    pub device: Option<String>,
    pub output: Option<PathBuf>,
    pub no_dialogs: bool,
    pub caption: Option<String>,
    pub user: Option<String>,
    pub json: bool,
}

/// Summary printed after a photo was taken
#[derive(Serialize)]
struct PhotoReport {
    file_name: String,
    width: u32,
    height: u32,
    size: usize,
    status: SessionStatus,
    saved: Option<SaveReceipt>,
    published: Option<GalleryItem>,
}

fn backend_type(synthetic: bool) -> CameraBackendType {
    if synthetic {
        CameraBackendType::Synthetic
    } else {
        CameraBackendType::V4l2
    }
}

/// List all available cameras
pub fn list_cameras(synthetic: bool) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend_for_type(backend_type(synthetic), None);

    if !backend.is_available() {
        println!("{} backend is not available on this system.", backend.backend_type());
        return Ok(());
    }

    let cameras = backend.enumerate_cameras();
    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.card);
        println!("      Driver: {}", camera.driver);
        println!("      Path:   {}", camera.path);
        println!();
    }

    Ok(())
}

/// Open a session, capture one frame, save it and optionally publish it
pub fn take_photo(options: PhotoOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config {
        facing: options.facing,
        resolution: options.resolution,
        download_dir: options.output.clone(),
        device_path: options.device.clone(),
        ..Config::default()
    };

    let backend = get_backend_for_type(backend_type(options.synthetic), config.device_path.clone());
    let capabilities = if options.no_dialogs {
        DesktopCapabilities::download_only(config.download_dir.clone())
    } else {
        DesktopCapabilities::new(config.download_dir.clone())
    };

    let session = CaptureSession::new(backend, Arc::new(capabilities), &config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(run_photo_session(&session, &options));
    session.close();

    let report = result?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Captured {} ({}x{}, {} bytes)", report.file_name, report.width, report.height, report.size);
    if let Some(receipt) = &report.saved {
        println!("{}: {} (via {})", report.status.message(), receipt.location, receipt.tier);
    }
    if let Some(item) = &report.published {
        println!("Published as {} by {}: \"{}\"", item.id, item.author_name, item.caption);
    }
    Ok(())
}

async fn run_photo_session(
    session: &CaptureSession,
    options: &PhotoOptions,
) -> Result<PhotoReport, Box<dyn std::error::Error>> {
    if !options.json {
        println!("Opening camera ({})...", options.facing);
    }
    if let Err(e) = session.open().await {
        let status = session.status();
        if status.is_error() {
            return Err(status.message().into());
        }
        return Err(e.into());
    }

    // Give the device time to deliver (and settle on) frames
    tokio::time::sleep(Duration::from_millis(500)).await;

    let start = Instant::now();
    let timeout = Duration::from_secs(5);
    let frame = loop {
        match session.capture().await {
            Ok(frame) => break frame,
            Err(AppError::Camera(CameraError::NoFrameYet)) if start.elapsed() < timeout => {
                tokio::time::sleep(Duration::from_millis(16)).await;
            }
            Err(e) => return Err(e.into()),
        }
    };

    let saved = match session.save().await? {
        SaveOutcome::Success(receipt) => Some(receipt),
        SaveOutcome::Error(e) => {
            return Err(format!("{} ({})", SessionStatus::SaveFailed.message(), e).into());
        }
        _ => None,
    };

    let published = match &options.user {
        Some(user) => {
            let feed = InMemoryFeed::new();
            let item = session.publish(
                options.caption.as_deref(),
                &StaticIdentity::signed_in(user.clone()),
                &feed,
            )?;
            Some(item)
        }
        None => None,
    };

    Ok(PhotoReport {
        file_name: frame.file_name().to_string(),
        width: frame.width(),
        height: frame.height(),
        size: frame.bytes().len(),
        status: session.status(),
        saved,
        published,
    })
}
