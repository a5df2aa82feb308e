// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines for captured media
//!
//! # Modules
//!
//! - [`photo`]: Single-frame capture encoded to JPEG

pub mod photo;
