// SPDX-License-Identifier: GPL-3.0-only

//! Async still encoding
//!
//! Turns a raw preview frame into JPEG bytes. Conversion and compression
//! are CPU-bound and run on the blocking pool.

use crate::backends::camera::format_converters::{pack_rgb_rows, rgba_to_rgb, yuyv_to_rgb};
use crate::backends::camera::types::{CameraFrame, PixelFormat};
use image::{ImageFormat, RgbImage};
use tracing::{debug, info};

/// Encoded image data
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// JPEG photo encoder
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    quality: u8,
}

impl PhotoEncoder {
    /// Create an encoder with the given JPEG quality (clamped to 1-100)
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode a frame asynchronously
    ///
    /// Output dimensions are the frame's own (the device's native
    /// resolution), never the requested one.
    pub async fn encode(&self, frame: CameraFrame) -> Result<EncodedImage, String> {
        info!(
            width = frame.width,
            height = frame.height,
            format = ?frame.format,
            quality = self.quality,
            "Starting encoding"
        );

        let quality = self.quality;
        tokio::task::spawn_blocking(move || {
            let image = to_rgb_image(&frame)?;
            let (width, height) = image.dimensions();
            let data = encode_jpeg(&image, quality)?;

            debug!(size = data.len(), "Encoding complete");

            Ok(EncodedImage {
                data,
                width,
                height,
            })
        })
        .await
        .map_err(|e| format!("Encoding task error: {}", e))?
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new(crate::constants::JPEG_QUALITY)
    }
}

/// Convert any supported preview frame into an RGB image
pub fn to_rgb_image(frame: &CameraFrame) -> Result<RgbImage, String> {
    if frame.width == 0 || frame.height == 0 {
        return Err("Frame has zero dimensions".to_string());
    }

    let rgb = match frame.format {
        PixelFormat::Mjpeg => {
            return image::load_from_memory_with_format(&frame.data, ImageFormat::Jpeg)
                .map(|img| img.to_rgb8())
                .map_err(|e| format!("MJPEG decode failed: {}", e));
        }
        PixelFormat::Yuyv => yuyv_to_rgb(&frame.data, frame.width, frame.height, frame.stride),
        PixelFormat::Rgba => rgba_to_rgb(&frame.data, frame.width, frame.height, frame.stride),
        PixelFormat::Rgb24 => pack_rgb_rows(&frame.data, frame.width, frame.height, frame.stride),
    };

    RgbImage::from_raw(frame.width, frame.height, rgb).ok_or_else(|| {
        format!(
            "Frame buffer too small for {}x{} {:?}",
            frame.width, frame.height, frame.format
        )
    })
}

/// Encode image as JPEG
fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);

    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| format!("JPEG encoding failed: {}", e))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn rgb_frame(width: u32, height: u32) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: Arc::from(vec![200u8; (width * height * 3) as usize]),
            format: PixelFormat::Rgb24,
            stride: width * 3,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(PhotoEncoder::new(0).quality(), 1);
        assert_eq!(PhotoEncoder::new(250).quality(), 100);
        assert_eq!(PhotoEncoder::default().quality(), 80);
    }

    #[tokio::test]
    async fn test_encode_produces_jpeg_at_native_size() {
        let encoded = PhotoEncoder::default()
            .encode(rgb_frame(64, 48))
            .await
            .expect("encode");

        assert_eq!((encoded.width, encoded.height), (64, 48));
        // JPEG SOI marker
        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_mjpeg_frames_are_reencoded() {
        let jpeg = PhotoEncoder::default()
            .encode(rgb_frame(32, 16))
            .await
            .expect("encode");
        let frame = CameraFrame {
            width: 32,
            height: 16,
            data: Arc::from(jpeg.data),
            format: PixelFormat::Mjpeg,
            stride: 0,
            captured_at: Instant::now(),
        };

        let image = to_rgb_image(&frame).expect("decode");
        assert_eq!(image.dimensions(), (32, 16));
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let mut frame = rgb_frame(8, 8);
        frame.data = Arc::from(vec![0u8; 10]);
        assert!(to_rgb_image(&frame).is_err());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(to_rgb_image(&rgb_frame(0, 0)).is_err());
    }
}
