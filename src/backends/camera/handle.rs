// SPDX-License-Identifier: GPL-3.0-only

//! Scoped ownership of a live camera stream
//!
//! A [`DeviceHandle`] is the only way to reach an open camera. Releasing
//! happens in exactly one place (`release_stream`), reached either through
//! [`DeviceHandle::release`] or through `Drop`, so every exit path of a
//! session (close, capture, retake, error, unwind) stops the device once.

use super::types::{BackendResult, CameraFrame, Resolution};
use tracing::{debug, info};

/// A backend's open, streaming camera
pub trait LiveStream: Send {
    /// Most recent preview frame, `None` until the device delivers one
    fn latest_frame(&mut self) -> BackendResult<Option<CameraFrame>>;

    /// Resolution negotiated with the device, if known yet
    fn native_resolution(&self) -> Option<Resolution>;

    /// Stop streaming and close the device
    fn stop(&mut self);
}

/// Exclusive ownership of one open camera
pub struct DeviceHandle {
    device_name: String,
    stream: Option<Box<dyn LiveStream>>,
}

impl DeviceHandle {
    pub fn new(device_name: impl Into<String>, stream: Box<dyn LiveStream>) -> Self {
        let device_name = device_name.into();
        debug!(device = %device_name, "Device handle acquired");
        Self {
            device_name,
            stream: Some(stream),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_released(&self) -> bool {
        self.stream.is_none()
    }

    pub fn native_resolution(&self) -> Option<Resolution> {
        self.stream.as_ref().and_then(|s| s.native_resolution())
    }

    /// Read the current preview frame
    pub fn latest_frame(&mut self) -> BackendResult<Option<CameraFrame>> {
        match self.stream.as_mut() {
            Some(stream) => stream.latest_frame(),
            None => Ok(None),
        }
    }

    /// Stop the device now
    pub fn release(mut self) {
        self.release_stream();
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            info!(device = %self.device_name, "Camera device released");
        }
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.release_stream();
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("device_name", &self.device_name)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStream {
        stops: Arc<AtomicUsize>,
    }

    impl LiveStream for CountingStream {
        fn latest_frame(&mut self) -> BackendResult<Option<CameraFrame>> {
            Ok(None)
        }

        fn native_resolution(&self) -> Option<Resolution> {
            None
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn handle(stops: &Arc<AtomicUsize>) -> DeviceHandle {
        DeviceHandle::new(
            "test",
            Box::new(CountingStream {
                stops: Arc::clone(stops),
            }),
        )
    }

    #[test]
    fn test_explicit_release_stops_once() {
        let stops = Arc::new(AtomicUsize::new(0));
        handle(&stops).release();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let stops = Arc::new(AtomicUsize::new(0));
        {
            let _handle = handle(&stops);
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
