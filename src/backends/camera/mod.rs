// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ CaptureController   │  ← Session state machine, sole handle owner
//! └──────────┬──────────┘
//!            │ acquire()
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴──────┐
//!       ▼           ▼
//!   ┌──────┐  ┌───────────┐
//!   │ V4L2 │  │ Synthetic │
//!   └──────┘  └───────────┘
//! ```

pub mod format_converters;
pub mod handle;
pub mod synthetic;
pub mod types;
pub mod v4l2;

pub use handle::{DeviceHandle, LiveStream};
pub use synthetic::{SyntheticBackend, SyntheticBehavior, SyntheticStats};
pub use types::*;
pub use v4l2::V4l2Backend;

use futures::future::BoxFuture;
use std::sync::Arc;

/// Camera backend trait
///
/// Backends only know how to find and open devices. Session lifecycle,
/// freezing and releasing belong to the capture controller.
pub trait CameraBackend: Send + Sync {
    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Capability probe: can this system capture from a camera at all?
    fn is_available(&self) -> bool;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<DeviceInfo>;

    /// Open a camera matching the request and start streaming
    ///
    /// May suspend while the platform asks the user for permission.
    fn acquire<'a>(
        &'a self,
        request: &'a CaptureRequest,
    ) -> BoxFuture<'a, BackendResult<DeviceHandle>>;
}

/// Get a backend instance for the given type
pub fn get_backend_for_type(
    backend_type: CameraBackendType,
    device_path: Option<String>,
) -> Arc<dyn CameraBackend> {
    match backend_type {
        CameraBackendType::V4l2 => Arc::new(V4l2Backend::new(device_path)),
        CameraBackendType::Synthetic => Arc::new(SyntheticBackend::new()),
    }
}
