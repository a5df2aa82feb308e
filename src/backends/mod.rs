// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! The backend layer hides how a device is found and streamed from, so the
//! capture controller runs the same way against real hardware and the
//! synthetic test camera:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Capture Session                 │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │    V4L2     │    │    Synthetic     │    │
//! │  └─────────────┘    └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Camera backends, device handles and raw frame types

pub mod camera;
