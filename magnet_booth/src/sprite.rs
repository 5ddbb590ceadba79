//! Magnet and logo artwork.

use std::path::Path;

use magnet_space::Size;

use crate::error::BoothError;

/// Badge fill colours, picked by magnet index.
const PALETTE: [u32; 6] = [
    0xFFE6_3946, 0xFFF4_A261, 0xFF2A_9D8F, 0xFFE9_C46A, 0xFF8E_7DBE, 0xFF45_7B9D,
];

/// An ARGB image.  Alpha is straight, not premultiplied.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    width:  usize,
    height: usize,
    pixels: Vec<u32>,
}

impl Sprite {
    /// `pixels` is padded or truncated to `width * height`.
    pub fn from_pixels(width: usize, height: usize, mut pixels: Vec<u32>) -> Self {
        pixels.resize(width * height, 0);
        Sprite { width, height, pixels }
    }

    pub fn solid(width: usize, height: usize, color: u32) -> Self {
        Sprite { width, height, pixels: vec![color; width * height] }
    }

    pub fn load(path: &Path) -> Result<Self, BoothError> {
        let img = image::open(path)
            .map_err(|source| BoothError::Image { path: path.to_path_buf(), source })?
            .to_rgba8();
        let (w, h) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
            })
            .collect();
        Ok(Sprite { width: w as usize, height: h as usize, pixels })
    }

    /// Round badge with a white rim, used when a magnet has no artwork.
    pub fn badge(index: usize) -> Self {
        const SIDE: usize = 128;
        let fill = PALETTE[index % PALETTE.len()];
        let c = SIDE as f32 / 2.0;
        let mut pixels = vec![0u32; SIDE * SIDE];
        for y in 0..SIDE {
            for x in 0..SIDE {
                let d = (x as f32 + 0.5 - c).hypot(y as f32 + 0.5 - c);
                pixels[y * SIDE + x] = if d <= c - 10.0 {
                    fill
                } else if d <= c {
                    0xFFFF_FFFF
                } else {
                    0
                };
            }
        }
        Sprite { width: SIDE, height: SIDE, pixels }
    }

    pub fn width(&self)  -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Intrinsic size.
    pub fn size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }

    /// Nearest pixel at texture coordinates `u, v` in `[0, 1)`.
    pub fn sample(&self, u: f32, v: f32) -> u32 {
        if self.is_empty() {
            return 0;
        }
        let x = ((u * self.width as f32) as usize).min(self.width - 1);
        let y = ((v * self.height as f32) as usize).min(self.height - 1);
        self.pixels[y * self.width + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_is_round_with_clear_corners() {
        let b = Sprite::badge(0);
        assert_eq!(b.sample(0.0, 0.0), 0);
        assert_eq!(b.sample(0.5, 0.5), PALETTE[0]);
        assert_eq!(b.size(), Size::new(128.0, 128.0));
    }

    #[test]
    fn badge_colour_cycles() {
        assert_eq!(Sprite::badge(1).sample(0.5, 0.5), Sprite::badge(7).sample(0.5, 0.5));
    }

    #[test]
    fn loads_png_with_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 255, 0]));
        img.save(&path).unwrap();

        let s = Sprite::load(&path).unwrap();
        assert_eq!(s.sample(0.1, 0.5), 0xFFFF_0000);
        assert_eq!(s.sample(0.9, 0.5) >> 24, 0);
    }

    #[test]
    fn missing_file_is_an_image_error() {
        let err = Sprite::load(Path::new("/no/such/art.png")).unwrap_err();
        assert!(matches!(err, BoothError::Image { .. }));
    }

    #[test]
    fn short_pixel_buffer_is_padded() {
        let s = Sprite::from_pixels(2, 2, vec![1]);
        assert_eq!(s.sample(0.9, 0.9), 0);
    }
}
