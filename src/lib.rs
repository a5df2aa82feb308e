// SPDX-License-Identifier: GPL-3.0-only

//! Gallery Camera - device capture and tiered on-device saving for an
//! event photo gallery
//!
//! The library opens a camera, freezes one frame into a JPEG, persists it
//! through the best save method the platform offers, and publishes it to a
//! community feed.
//!
//! # Architecture
//!
//! - [`backends`]: Camera backends (V4L2 and a synthetic test camera)
//! - [`pipelines`]: Frame encoding
//! - [`session`]: Capture session state machine and status projection
//! - [`storage`]: Tiered save strategy and desktop save capabilities
//! - [`gallery`]: Feed and identity collaborators
//! - [`config`]: Session settings
//!
//! # Example
//!
//! ```ignore
//! let session = CaptureSession::new(backend, capabilities, &Config::default())?;
//! session.open().await?;
//! let frame = session.capture().await?;
//! session.save().await?;
//! session.close();
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gallery;
pub mod pipelines;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult, CameraError, SaveError};
pub use gallery::{GalleryFeed, GalleryItem, IdentityProvider, InMemoryFeed, StaticIdentity};
pub use session::{CaptureSession, SessionStatus};
pub use storage::{DesktopCapabilities, SaveOutcome, SaveTier};
