//! Still-image encoding of `0x00RRGGBB` framebuffers.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};

use crate::error::CaptureError;

/// A borrowed framebuffer, one `u32` per pixel, row-major.
#[derive(Clone, Copy, Debug)]
pub struct FrameRef<'a> {
    pub width:  usize,
    pub height: usize,
    pub pixels: &'a [u32],
}

impl<'a> FrameRef<'a> {
    pub fn new(width: usize, height: usize, pixels: &'a [u32]) -> Self {
        FrameRef { width, height, pixels }
    }

    fn to_rgb(self) -> Result<RgbImage, CaptureError> {
        if self.width * self.height != self.pixels.len() || self.pixels.is_empty() {
            return Err(CaptureError::FrameSize {
                width:  self.width,
                height: self.height,
                len:    self.pixels.len(),
            });
        }
        let mut raw = Vec::with_capacity(self.pixels.len() * 3);
        for &px in self.pixels {
            raw.push((px >> 16) as u8);
            raw.push((px >> 8) as u8);
            raw.push(px as u8);
        }
        RgbImage::from_raw(self.width as u32, self.height as u32, raw).ok_or(
            CaptureError::FrameSize {
                width:  self.width,
                height: self.height,
                len:    self.pixels.len(),
            },
        )
    }
}

pub fn encode_png(frame: FrameRef<'_>) -> Result<Vec<u8>, CaptureError> {
    let img = frame.to_rgb()?;
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// `quality` is clamped to `1..=100`.
pub fn encode_jpeg(frame: FrameRef<'_>, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let img = frame.to_rgb()?;
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode_image(&img)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trips_colour() {
        let pixels = [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0x00FF_FFFF];
        let bytes = encode_png(FrameRef::new(2, 2, &pixels)).unwrap();
        let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(1, 1).0, [255, 255, 255]);
    }

    #[test]
    fn jpeg_starts_with_soi_marker() {
        let pixels = vec![0x0080_8080; 16 * 8];
        let bytes = encode_jpeg(FrameRef::new(16, 8, &pixels), 80).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let pixels = [0u32; 3];
        let err = encode_png(FrameRef::new(2, 2, &pixels)).unwrap_err();
        assert!(matches!(err, CaptureError::FrameSize { len: 3, .. }));
    }
}
