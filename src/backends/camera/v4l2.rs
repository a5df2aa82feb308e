// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 camera capture
//!
//! The device is opened and streamed on a dedicated capture thread using
//! memory-mapped buffers. The thread keeps only the newest frame; the
//! controller reads it when the user presses capture. Stopping the stream
//! joins the thread, which closes the device.

use super::handle::{DeviceHandle, LiveStream};
use super::types::*;
use super::CameraBackend;
use crate::constants::v4l2::{BUFFER_COUNT, DEQUEUE_TIMEOUT_MS, RETRY_DELAY_MS};
use futures::future::BoxFuture;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Formats we can turn into a still, in order of preference
const PREFERRED_FOURCCS: [&[u8; 4]; 4] = [b"MJPG", b"YUYV", b"RGB3", b"AB24"];

/// V4L2 camera backend
pub struct V4l2Backend {
    /// Explicit device path, bypassing facing-based selection
    device_path: Option<String>,
}

impl V4l2Backend {
    pub fn new(device_path: Option<String>) -> Self {
        Self { device_path }
    }

    /// Pick the device for a request
    ///
    /// V4L2 has no facing metadata, so devices whose card name hints at a
    /// direction ("front", "rear", ...) are preferred; otherwise the first
    /// capture device wins.
    fn select_device(&self, facing: Facing) -> BackendResult<DeviceInfo> {
        if let Some(path) = &self.device_path {
            return Ok(query_device_info(path).unwrap_or_else(|| DeviceInfo {
                card: path.clone(),
                driver: String::new(),
                path: path.clone(),
            }));
        }

        let cameras = self.enumerate_cameras();
        if cameras.is_empty() {
            return Err(BackendError::DeviceNotFound(
                "No V4L2 capture devices found".to_string(),
            ));
        }

        let hints: &[&str] = match facing {
            Facing::Environment => &["rear", "back", "world", "environment"],
            Facing::User => &["front", "user", "integrated", "webcam"],
        };

        let chosen = cameras
            .iter()
            .find(|cam| {
                let card = cam.card.to_ascii_lowercase();
                hints.iter().any(|hint| card.contains(hint))
            })
            .unwrap_or(&cameras[0])
            .clone();

        debug!(card = %chosen.card, path = %chosen.path, %facing, "Selected V4L2 device");
        Ok(chosen)
    }
}

impl CameraBackend for V4l2Backend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn is_available(&self) -> bool {
        match &self.device_path {
            Some(path) => Path::new(path).exists(),
            None => !v4l::context::enum_devices().is_empty(),
        }
    }

    fn enumerate_cameras(&self) -> Vec<DeviceInfo> {
        let mut nodes = v4l::context::enum_devices();
        nodes.sort_by_key(|node| node.index());

        nodes
            .iter()
            .filter_map(|node| {
                let path = node.path().to_string_lossy().to_string();
                let info = query_device_info(&path)?;
                supports_capture(&path).then_some(info)
            })
            .collect()
    }

    fn acquire<'a>(
        &'a self,
        request: &'a CaptureRequest,
    ) -> BoxFuture<'a, BackendResult<DeviceHandle>> {
        Box::pin(async move {
            let device = self.select_device(request.facing)?;
            let resolution = request.resolution;

            info!(
                device_path = %device.path,
                target = %resolution,
                "Opening V4L2 camera"
            );

            let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
            let running = Arc::new(AtomicBool::new(true));
            let latest = Arc::new(Mutex::new(None));

            let thread_path = device.path.clone();
            let thread_running = Arc::clone(&running);
            let thread_latest = Arc::clone(&latest);
            let thread_handle = std::thread::Builder::new()
                .name("v4l2-capture".to_string())
                .spawn(move || {
                    capture_loop(
                        &thread_path,
                        resolution,
                        ready_tx,
                        thread_latest,
                        thread_running,
                    )
                })
                .map_err(|e| BackendError::IoError(format!("capture thread: {}", e)))?;

            let negotiated = match ready_rx.await {
                Ok(Ok(negotiated)) => negotiated,
                Ok(Err(e)) => {
                    let _ = thread_handle.join();
                    return Err(e);
                }
                Err(_) => {
                    let _ = thread_handle.join();
                    return Err(BackendError::IoError(
                        "capture thread exited before streaming".to_string(),
                    ));
                }
            };

            let stream = V4l2Stream {
                negotiated,
                running,
                latest,
                thread_handle: Some(thread_handle),
            };
            Ok(DeviceHandle::new(device.card, Box::new(stream)))
        })
    }
}

/// Query card and driver of a device node
fn query_device_info(path: &str) -> Option<DeviceInfo> {
    let dev = Device::with_path(path).ok()?;
    let caps = dev.query_caps().ok()?;
    Some(DeviceInfo {
        card: caps.card,
        driver: caps.driver,
        path: path.to_string(),
    })
}

/// True if the node offers at least one capture format we can encode
fn supports_capture(path: &str) -> bool {
    let Ok(dev) = Device::with_path(path) else {
        return false;
    };
    dev.enum_formats()
        .map(|formats| {
            formats
                .iter()
                .any(|desc| PixelFormat::from_fourcc(&desc.fourcc.repr).is_some())
        })
        .unwrap_or(false)
}

/// Format negotiated with the driver
#[derive(Debug, Clone, Copy)]
struct Negotiated {
    resolution: Resolution,
    format: PixelFormat,
    stride: u32,
}

/// Open and configure the device
fn open_device(path: &str, target: Resolution) -> BackendResult<(Device, Negotiated)> {
    let dev = Device::with_path(path).map_err(|e| BackendError::from_io(path, &e))?;

    let available = dev
        .enum_formats()
        .map_err(|e| BackendError::from_io("enumerate formats", &e))?;

    let fourcc = PREFERRED_FOURCCS
        .iter()
        .map(|code| FourCC::new(code))
        .find(|fourcc| available.iter().any(|desc| desc.fourcc == *fourcc))
        .ok_or_else(|| {
            BackendError::FormatNotSupported(format!(
                "{} offers none of MJPG, YUYV, RGB3, AB24",
                path
            ))
        })?;

    let requested = Format::new(target.width, target.height, fourcc);
    let actual = dev
        .set_format(&requested)
        .map_err(|e| BackendError::from_io("set format", &e))?;

    let format = PixelFormat::from_fourcc(&actual.fourcc.repr).ok_or_else(|| {
        BackendError::FormatNotSupported(format!("driver switched to {}", actual.fourcc))
    })?;

    if actual.width != target.width || actual.height != target.height {
        debug!(
            requested = %target,
            actual_width = actual.width,
            actual_height = actual.height,
            "Driver adjusted resolution"
        );
    }

    Ok((
        dev,
        Negotiated {
            resolution: Resolution::new(actual.width, actual.height),
            format,
            stride: actual.stride,
        },
    ))
}

/// Main capture loop running in a separate thread
fn capture_loop(
    path: &str,
    target: Resolution,
    ready: tokio::sync::oneshot::Sender<BackendResult<Negotiated>>,
    latest: Arc<Mutex<Option<CameraFrame>>>,
    running: Arc<AtomicBool>,
) {
    static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

    let (mut dev, negotiated) = match open_device(path, target) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut stream = match MmapStream::with_buffers(&mut dev, Type::VideoCapture, BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(BackendError::from_io("start stream", &e)));
            return;
        }
    };
    // Bounded waits so a silent device cannot keep the thread from seeing `running`
    stream.set_timeout(Duration::from_millis(DEQUEUE_TIMEOUT_MS));

    if ready.send(Ok(negotiated)).is_err() {
        // Acquisition was abandoned before the device came up
        return;
    }
    info!(
        resolution = %negotiated.resolution,
        format = ?negotiated.format,
        "V4L2 capture stream started"
    );

    // After a timed-out dequeue the last buffer is still queued, so the next
    // frame must be drained with a bare dequeue before `next()` may requeue
    let mut stalled = false;

    while running.load(Ordering::SeqCst) {
        if stalled {
            match CaptureStream::dequeue(&mut stream) {
                Ok(_) => stalled = false,
                Err(e) if is_dequeue_timeout(&e) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to dequeue frame");
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
                }
            }
            continue;
        }

        match stream.next() {
            Ok((buf, meta)) => {
                let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
                let used = (meta.bytesused as usize).min(buf.len());
                let used = if used == 0 { buf.len() } else { used };

                let frame = CameraFrame {
                    width: negotiated.resolution.width,
                    height: negotiated.resolution.height,
                    data: Arc::from(&buf[..used]),
                    format: negotiated.format,
                    stride: negotiated.stride,
                    captured_at: Instant::now(),
                };

                match latest.lock() {
                    Ok(mut slot) => *slot = Some(frame),
                    Err(_) => {
                        error!("Frame slot poisoned, stopping capture");
                        break;
                    }
                }

                if frame_num % 120 == 0 {
                    debug!(frame = frame_num, sequence = meta.sequence, size = used, "Frame captured");
                }
            }
            Err(e) if is_dequeue_timeout(&e) => stalled = true,
            Err(e) => {
                warn!(error = %e, "Failed to dequeue frame");
                std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
            }
        }
    }

    info!("V4L2 capture loop ended");
}

/// A dequeue that found no frame within [`DEQUEUE_TIMEOUT_MS`]
fn is_dequeue_timeout(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::TimedOut
}

struct V4l2Stream {
    negotiated: Negotiated,
    running: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<CameraFrame>>>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl LiveStream for V4l2Stream {
    fn latest_frame(&mut self) -> BackendResult<Option<CameraFrame>> {
        self.latest
            .lock()
            .map(|slot| slot.clone())
            .map_err(|_| BackendError::IoError("frame slot poisoned".to_string()))
    }

    fn native_resolution(&self) -> Option<Resolution> {
        Some(self.negotiated.resolution)
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            match handle.join() {
                Ok(()) => debug!("Capture thread stopped"),
                Err(_) => warn!("Capture thread panicked"),
            }
        }
    }
}
