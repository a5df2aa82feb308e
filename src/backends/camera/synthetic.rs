// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! Produces a gradient test pattern instead of reading hardware. Each
//! acquisition follows a scripted [`SyntheticBehavior`] so denial, missing
//! devices and slow warm-up can be exercised without a camera. Counters in
//! [`SyntheticStats`] record every acquire and release.

use super::handle::{DeviceHandle, LiveStream};
use super::types::*;
use super::CameraBackend;
use crate::constants::synthetic::{NATIVE_HEIGHT, NATIVE_WIDTH};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{debug, info};

/// What the next acquisition does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticBehavior {
    /// Grant access and stream frames
    Grant,
    /// Refuse permission
    Deny,
    /// Report that no device exists
    Unavailable,
    /// Grant access but never deliver a frame
    NoFrames,
}

/// Acquisition and release counters shared with the streams
#[derive(Debug, Default)]
pub struct SyntheticStats {
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
    requests: Mutex<Vec<CaptureRequest>>,
}

impl SyntheticStats {
    /// Number of successfully opened devices
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Number of device stops
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Devices currently open
    pub fn live_devices(&self) -> usize {
        self.acquisitions() - self.releases()
    }

    /// Every request passed to `acquire`, in order
    pub fn requests(&self) -> Vec<CaptureRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

/// Test-pattern camera backend
pub struct SyntheticBackend {
    script: Mutex<VecDeque<SyntheticBehavior>>,
    fallback: SyntheticBehavior,
    native: Resolution,
    available: bool,
    gate: Option<Arc<Notify>>,
    stats: Arc<SyntheticStats>,
}

impl SyntheticBackend {
    /// Backend that always grants access
    pub fn new() -> Self {
        Self::with_behavior(SyntheticBehavior::Grant)
    }

    /// Backend that behaves the same way on every acquisition
    pub fn with_behavior(behavior: SyntheticBehavior) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: behavior,
            native: Resolution::new(NATIVE_WIDTH, NATIVE_HEIGHT),
            available: true,
            gate: None,
            stats: Arc::new(SyntheticStats::default()),
        }
    }

    /// Backend that plays `script` in order, then repeats its last entry
    pub fn with_script(script: Vec<SyntheticBehavior>) -> Self {
        let fallback = script.last().copied().unwrap_or(SyntheticBehavior::Grant);
        let backend = Self::with_behavior(fallback);
        if let Ok(mut queue) = backend.script.lock() {
            queue.extend(script);
        }
        backend
    }

    /// Set the resolution the device "natively" streams at
    pub fn with_native_resolution(mut self, native: Resolution) -> Self {
        self.native = native;
        self
    }

    /// Make the capability probe report no camera support
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Hold every acquisition until the returned gate is notified
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn stats(&self) -> Arc<SyntheticStats> {
        Arc::clone(&self.stats)
    }

    fn next_behavior(&self) -> SyntheticBehavior {
        self.script
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or(self.fallback)
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for SyntheticBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Synthetic
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn enumerate_cameras(&self) -> Vec<DeviceInfo> {
        if !self.available {
            return Vec::new();
        }
        vec![DeviceInfo {
            card: "Synthetic Camera".to_string(),
            driver: "synthetic".to_string(),
            path: "synthetic:0".to_string(),
        }]
    }

    fn acquire<'a>(
        &'a self,
        request: &'a CaptureRequest,
    ) -> BoxFuture<'a, BackendResult<DeviceHandle>> {
        Box::pin(async move {
            if let Ok(mut requests) = self.stats.requests.lock() {
                requests.push(*request);
            }

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            let behavior = self.next_behavior();
            debug!(?behavior, facing = %request.facing, "Synthetic acquisition");

            let delivers_frames = match behavior {
                SyntheticBehavior::Deny => {
                    return Err(BackendError::PermissionDenied(
                        "synthetic camera refused access".to_string(),
                    ));
                }
                SyntheticBehavior::Unavailable => {
                    return Err(BackendError::DeviceNotFound(
                        "synthetic camera not present".to_string(),
                    ));
                }
                SyntheticBehavior::Grant => true,
                SyntheticBehavior::NoFrames => false,
            };

            self.stats.acquisitions.fetch_add(1, Ordering::SeqCst);
            info!(
                resolution = %self.native,
                facing = %request.facing,
                "Synthetic camera streaming"
            );

            let stream = SyntheticStream {
                native: self.native,
                delivers_frames,
                sequence: 0,
                stats: Arc::clone(&self.stats),
            };
            Ok(DeviceHandle::new(
                format!("Synthetic Camera ({})", request.facing),
                Box::new(stream),
            ))
        })
    }
}

struct SyntheticStream {
    native: Resolution,
    delivers_frames: bool,
    sequence: u32,
    stats: Arc<SyntheticStats>,
}

impl LiveStream for SyntheticStream {
    fn latest_frame(&mut self) -> BackendResult<Option<CameraFrame>> {
        if !self.delivers_frames {
            return Ok(None);
        }
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(test_pattern(self.native, self.sequence)))
    }

    fn native_resolution(&self) -> Option<Resolution> {
        self.delivers_frames.then_some(self.native)
    }

    fn stop(&mut self) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Diagonal RGB gradient, shifted by `sequence` so consecutive frames differ
fn test_pattern(resolution: Resolution, sequence: u32) -> CameraFrame {
    let Resolution { width, height } = resolution;
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            data.push(((x * 255) / width.max(1)) as u8);
            data.push(((y * 255) / height.max(1)) as u8);
            data.push(x.wrapping_add(y).wrapping_add(sequence) as u8);
        }
    }

    CameraFrame {
        width,
        height,
        data: Arc::from(data),
        format: PixelFormat::Rgb24,
        stride: width * 3,
        captured_at: Instant::now(),
    }
}
