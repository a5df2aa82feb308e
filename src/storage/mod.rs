// SPDX-License-Identifier: GPL-3.0-only

//! Persisting captured frames on the user's device
//!
//! - [`save`]: tier ordering, the save driver and its outcome
//! - [`desktop`]: desktop implementations of the save capabilities
//! - [`portal`]: share sheet over the XDG desktop portal

pub mod desktop;
pub mod portal;
pub mod save;

pub use desktop::DesktopCapabilities;
pub use save::{
    OutcomeListener, SaveCapabilities, SaveFile, SaveOutcome, SaveReceipt, SaveTier, TierResult, TieredSaver,
};
