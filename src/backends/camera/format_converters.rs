// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion for still capture
//!
//! Converts raw preview frames into tightly packed RGB24 rows, the input
//! the JPEG encoder expects.

/// Convert YUYV (YUV 4:2:2) to RGB24
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients for YUV to RGB conversion. `stride` is the
/// number of bytes per source row (may include padding).
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let row_bytes = w * 2;
    let stride = (stride as usize).max(row_bytes);
    let mut rgb = Vec::with_capacity(w * h * 3);

    for row in data.chunks(stride).take(h) {
        let row = &row[..row_bytes.min(row.len())];
        for chunk in row.chunks_exact(4) {
            let y0 = chunk[0] as f32;
            let u = chunk[1] as f32 - 128.0;
            let y1 = chunk[2] as f32;
            let v = chunk[3] as f32 - 128.0;

            for y in [y0, y1] {
                rgb.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
                rgb.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
                rgb.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
            }
        }
    }

    rgb
}

/// Drop the alpha channel of RGBA rows
pub fn rgba_to_rgb(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    let row_bytes = width as usize * 4;
    let stride = (stride as usize).max(row_bytes);
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);

    for row in data.chunks(stride).take(height as usize) {
        for px in row[..row_bytes.min(row.len())].chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
    }

    rgb
}

/// Remove row padding from RGB24 data
pub fn pack_rgb_rows(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    let row_bytes = width as usize * 3;
    let stride = stride as usize;
    if stride <= row_bytes {
        return data[..(row_bytes * height as usize).min(data.len())].to_vec();
    }

    let mut rgb = Vec::with_capacity(row_bytes * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        rgb.extend_from_slice(&row[..row_bytes.min(row.len())]);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_grey_stays_grey() {
        // Two pixels of mid grey: Y=128, U=V=128 (no chroma)
        let data = [128u8, 128, 128, 128];
        let rgb = yuyv_to_rgb(&data, 2, 1, 4);
        assert_eq!(rgb, vec![128, 128, 128, 128, 128, 128]);
    }

    #[test]
    fn test_yuyv_skips_row_padding() {
        // One row of 2 pixels padded to 8 bytes, two rows
        let data = [
            255u8, 128, 255, 128, 9, 9, 9, 9, //
            0, 128, 0, 128, 9, 9, 9, 9,
        ];
        let rgb = yuyv_to_rgb(&data, 2, 2, 8);
        assert_eq!(rgb.len(), 2 * 2 * 3);
        assert_eq!(&rgb[..3], &[255, 255, 255]);
        assert_eq!(&rgb[6..9], &[0, 0, 0]);
    }

    #[test]
    fn test_rgba_to_rgb() {
        let data = [1u8, 2, 3, 255, 4, 5, 6, 255];
        assert_eq!(rgba_to_rgb(&data, 2, 1, 8), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_pack_rgb_rows_removes_padding() {
        let data = [1u8, 2, 3, 0, 4, 5, 6, 0];
        assert_eq!(pack_rgb_rows(&data, 1, 2, 4), vec![1, 2, 3, 4, 5, 6]);
    }
}
