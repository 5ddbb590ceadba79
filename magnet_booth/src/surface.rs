//! Software framebuffer and the drawing primitives used by both surfaces.
//!
//! Pixels are `0xAARRGGBB` as `minifb` expects; the alpha byte is ignored on
//! the surface itself and only consulted when blending sprites.

use magnet_capture::FrameRef;
use magnet_space::{reflect_x, Letterbox, Point, Size};

use crate::camera::VideoFrame;
use crate::sprite::Sprite;

pub const BLACK: u32 = 0xFF00_0000;
pub const WHITE: u32 = 0xFFFF_FFFF;

// ════════════════════════════════════════════════════════════════════════════
// Surface
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    width:  usize,
    height: usize,
    buf:    Vec<u32>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Surface { width, height, buf: vec![BLACK; width * height] }
    }

    pub fn width(&self)  -> usize  { self.width }
    pub fn height(&self) -> usize  { self.height }
    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }

    pub fn frame(&self) -> FrameRef<'_> {
        FrameRef::new(self.width, self.height, &self.buf)
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buf[y * self.width + x])
    }

    pub fn fill(&mut self, color: u32) {
        self.buf.fill(color);
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.buf[y * self.width + x] = color;
        }
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    /// Copy `src` with its top-left corner at `(x, y)`, clipped to this
    /// surface.
    pub fn blit(&mut self, src: &Surface, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = src.width.min(self.width - x);
        for row in 0..src.height.min(self.height - y) {
            let from = row * src.width;
            let to = (y + row) * self.width + x;
            self.buf[to..to + w].copy_from_slice(&src.buf[from..from + w]);
        }
    }

    pub fn fill_circle(&mut self, center: Point, radius: f32, color: u32) {
        if !center.is_finite() || radius <= 0.0 {
            return;
        }
        let Some((x0, x1)) = self.span(center.x - radius, center.x + radius, self.width) else { return };
        let Some((y0, y1)) = self.span(center.y - radius, center.y + radius, self.height) else { return };
        let r2 = radius * radius;
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - center.x;
                let dy = y as f32 + 0.5 - center.y;
                if dx * dx + dy * dy <= r2 {
                    self.buf[y * self.width + x] = color;
                }
            }
        }
    }

    /// 3×5 bitmap text, each font pixel drawn as a `scale`×`scale` block.
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale;
            if cx + 4 * scale > self.width { break; }
        }
    }

    /// Aspect-fit `video` into the surface, optionally mirrored about the
    /// vertical centre line.  Areas outside the fitted rectangle are left
    /// untouched.
    pub fn draw_video(&mut self, video: &VideoFrame, mirror: bool) {
        let Some(lb) = Letterbox::fit(video.size(), self.size()) else { return };
        let Some((x0, x1)) = self.span(lb.offset_x, lb.offset_x + lb.draw_w, self.width) else { return };
        let Some((y0, y1)) = self.span(lb.offset_y, lb.offset_y + lb.draw_h, self.height) else { return };
        let (vw, vh) = (video.width(), video.height());
        let sx = vw as f32 / lb.draw_w;
        let sy = vh as f32 / lb.draw_h;
        let src = video.pixels();
        let canvas_w = self.width as f32;

        for y in y0..y1 {
            let vy = (((y as f32 + 0.5 - lb.offset_y) * sy).max(0.0) as usize).min(vh - 1);
            for x in x0..x1 {
                // Mirroring maps canvas x to its reflection before sampling.
                let cx = if mirror { reflect_x(canvas_w, x as f32 + 0.5) } else { x as f32 + 0.5 };
                let vx = ((cx - lb.offset_x) * sx).max(0.0) as usize;
                self.buf[y * self.width + x] = src[vy * vw + vx.min(vw - 1)];
            }
        }
    }

    /// Draw `sprite` scaled to `size`, centred on `center` and rotated by
    /// `angle` radians.  `flip_x` reflects the artwork about its own vertical
    /// axis before rotation.
    pub fn draw_sprite(&mut self, sprite: &Sprite, center: Point, size: Size, angle: f32, flip_x: bool) {
        if sprite.is_empty() || size.aspect().is_none() || !center.is_finite() {
            return;
        }
        let reach = size.w.hypot(size.h) / 2.0;
        let Some((x0, x1)) = self.span(center.x - reach, center.x + reach, self.width) else { return };
        let Some((y0, y1)) = self.span(center.y - reach, center.y + reach, self.height) else { return };
        let (sin, cos) = angle.sin_cos();

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - center.x;
                let dy = y as f32 + 0.5 - center.y;
                // Undo the rotation to land in sprite-local space.
                let mut lx =  dx * cos + dy * sin;
                let ly     = -dx * sin + dy * cos;
                if flip_x {
                    lx = -lx;
                }
                let u = lx / size.w + 0.5;
                let v = ly / size.h + 0.5;
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                let src = sprite.sample(u, v);
                let alpha = (src >> 24) as f32 / 255.0;
                if alpha <= 0.0 {
                    continue;
                }
                let idx = y * self.width + x;
                self.buf[idx] = blend(self.buf[idx], src, alpha);
            }
        }
    }

    /// Clamp the half-open float range `[lo, hi)` to pixel indices `[0, limit)`.
    fn span(&self, lo: f32, hi: f32, limit: usize) -> Option<(usize, usize)> {
        if !lo.is_finite() || !hi.is_finite() {
            return None;
        }
        let a = lo.floor().max(0.0) as usize;
        let b = (hi.ceil().max(0.0) as usize).min(limit);
        (a < b).then_some((a, b))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t).round() as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF00_0000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
