// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use gallery_camera::backends::camera::{Facing, Resolution};
use gallery_camera::{AppError, Config};

#[test]
fn test_config_default() {
    // Back camera at full HD unless told otherwise
    let config = Config::default();
    assert_eq!(config.facing, Facing::Environment);
    assert_eq!(config.resolution, Resolution::new(1920, 1080));
    assert!(config.download_dir.is_none());
    assert!(config.device_path.is_none());
}

#[test]
fn test_config_default_caption() {
    let config = Config::default();
    assert!(
        !config.default_caption.is_empty(),
        "Default caption should not be empty"
    );
}

#[test]
fn test_config_validate_reports_config_error() {
    let config = Config {
        jpeg_quality: 0,
        ..Config::default()
    };
    match config.validate() {
        Err(AppError::Config(msg)) => assert!(msg.contains("quality")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_config_request_matches_settings() {
    let config = Config {
        facing: Facing::User,
        resolution: Resolution::new(1280, 720),
        ..Config::default()
    };
    let request = config.capture_request();
    assert_eq!(request.facing, Facing::User);
    assert_eq!(request.resolution, Resolution::new(1280, 720));
}
