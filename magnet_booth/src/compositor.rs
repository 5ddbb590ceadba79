//! The two render targets.
//!
//! The display surface is what the user sees: a selfie mirror for the front
//! camera, with the logo and the fingertip overlay.  The record surface is
//! what gets saved: the opposite mirroring rule, magnets re-placed at their
//! reflected X plus a per-item offset, artwork flipped back so it reads the
//! right way round, and no overlays.

use magnet_board::{HandPose, MagnetBoard};
use magnet_space::{FacingMode, Point, Size};
use tracing::debug;

use crate::camera::VideoFrame;
use crate::config::LogoConfig;
use crate::sprite::Sprite;
use crate::surface::{Surface, BLACK, WHITE};

pub const FINGERTIP_RADIUS: f32 = 10.0;

pub struct Compositor {
    display: Surface,
    record:  Surface,
    /// Artwork indexed by magnet id.
    sprites: Vec<Sprite>,
    logo:    Option<Sprite>,
    logo_at: LogoConfig,
}

impl Compositor {
    pub fn new(width: usize, height: usize, sprites: Vec<Sprite>, logo: Option<Sprite>, logo_at: LogoConfig) -> Self {
        Compositor {
            display: Surface::new(width, height),
            record: Surface::new(width, height),
            sprites,
            logo,
            logo_at,
        }
    }

    pub fn display(&self) -> &Surface { &self.display }
    pub fn record(&self)  -> &Surface { &self.record }

    /// Video, magnets, logo, then fingertips.
    pub fn render_display(
        &mut self,
        video:  Option<&VideoFrame>,
        facing: FacingMode,
        board:  &MagnetBoard,
        hand:   Option<&HandPose>,
    ) {
        self.display.fill(BLACK);
        if let Some(v) = video {
            self.display.draw_video(v, facing.mirrors_display_video());
        }

        for magnet in board.magnets() {
            let Some(sprite) = self.sprites.get(magnet.id().0) else {
                debug!(magnet = magnet.name(), "no artwork");
                continue;
            };
            self.display.draw_sprite(sprite, magnet.position(), magnet.current_size(), magnet.angle(), false);
        }

        if let Some(logo) = &self.logo {
            let size = Size::new(logo.size().w * self.logo_at.scale, logo.size().h * self.logo_at.scale);
            let o = self.logo_at.origin();
            let center = Point::new(o.x + size.w / 2.0, o.y + size.h / 2.0);
            self.display.draw_sprite(logo, center, size, 0.0, false);
        }

        if let Some(h) = hand {
            self.display.fill_circle(h.thumb, FINGERTIP_RADIUS, WHITE);
            self.display.fill_circle(h.index, FINGERTIP_RADIUS, WHITE);
        }
    }

    /// Record-surface rendering.  Without a video frame the surface is still
    /// painted solid black so the recorder never sees a stale picture.
    pub fn render_record(&mut self, video: Option<&VideoFrame>, facing: FacingMode, board: &MagnetBoard) {
        self.record.fill(BLACK);
        let Some(v) = video else { return };
        self.record.draw_video(v, facing.mirrors_record_video());

        let canvas_w = self.record.width() as f32;
        for magnet in board.magnets() {
            let Some(sprite) = self.sprites.get(magnet.id().0) else { continue };
            let center = Point::new(magnet.record_x(canvas_w), magnet.position().y);
            self.record.draw_sprite(sprite, center, magnet.current_size(), -magnet.angle(), true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magnet_board::{BoardTuning, MagnetSpec};
    use proptest::prelude::*;

    const W: usize = 72;
    const H: usize = 96;
    const RED: u32 = 0xFFFF_0000;
    const GREEN: u32 = 0xFF00_FF00;

    fn compositor(sprites: Vec<Sprite>, logo: Option<Sprite>) -> Compositor {
        Compositor::new(W, H, sprites, logo, LogoConfig { path: None, x: 2.0, y: 2.0, scale: 1.0 })
    }

    fn column_video(col: usize) -> VideoFrame {
        let mut px = vec![BLACK; 16 * 12];
        for y in 0..12 {
            px[y * 16 + col] = RED;
        }
        VideoFrame::new(16, 12, px)
    }

    fn row(s: &Surface, y: usize) -> Vec<u32> {
        (0..s.width()).map(|x| s.pixel(x, y).unwrap()).collect()
    }

    fn spec(offset: f32) -> MagnetSpec {
        MagnetSpec { record_offset_x: offset, ..MagnetSpec::default() }
    }

    proptest! {
        #[test]
        fn record_video_is_display_reflected(col in 0usize..16, rear in any::<bool>()) {
            let facing = if rear { FacingMode::Rear } else { FacingMode::Front };
            let board = MagnetBoard::new(BoardTuning::default());
            let mut c = compositor(vec![], None);
            let video = column_video(col);
            c.render_display(Some(&video), facing, &board, None);
            c.render_record(Some(&video), facing, &board);

            let mut rec = row(c.record(), H / 2);
            rec.reverse();
            prop_assert_eq!(row(c.display(), H / 2), rec);
        }
    }

    #[test]
    fn front_display_is_mirrored() {
        let board = MagnetBoard::new(BoardTuning::default());
        let mut c = compositor(vec![], None);
        c.render_display(Some(&column_video(0)), FacingMode::Front, &board, None);
        assert_eq!(c.display().pixel(W - 1, H / 2), Some(RED));
        assert_eq!(c.display().pixel(0, H / 2), Some(BLACK));
    }

    #[test]
    fn record_without_video_is_solid_black() {
        let mut board = MagnetBoard::new(BoardTuning::default());
        board.add(&spec(0.0), Size::new(20.0, 20.0), Point::new(36.0, 48.0));
        let mut c = compositor(vec![Sprite::solid(2, 2, GREEN)], None);
        c.render_record(Some(&column_video(3)), FacingMode::Front, &board);
        c.render_record(None, FacingMode::Front, &board);
        assert!(c.record().pixels().iter().all(|&p| p == BLACK));
    }

    #[test]
    fn record_magnet_sits_at_reflected_x_plus_offset() {
        let mut board = MagnetBoard::new(BoardTuning::default());
        board.add(&spec(-10.0), Size::new(8.0, 8.0), Point::new(10.0, 48.0));
        let mut c = compositor(vec![Sprite::solid(2, 2, GREEN)], None);
        let video = VideoFrame::new(16, 12, vec![BLACK; 16 * 12]);
        c.render_record(Some(&video), FacingMode::Front, &board);

        // 72 - 10 - 10 = 52
        assert_eq!(c.record().pixel(52, 48), Some(GREEN));
        assert_eq!(c.record().pixel(10, 48), Some(BLACK));
    }

    #[test]
    fn record_artwork_is_flipped() {
        let mut board = MagnetBoard::new(BoardTuning::default());
        board.add(&spec(0.0), Size::new(20.0, 10.0), Point::new(36.0, 48.0));
        let art = Sprite::from_pixels(2, 1, vec![RED, GREEN]);
        let mut c = compositor(vec![art], None);
        let video = VideoFrame::new(16, 12, vec![BLACK; 16 * 12]);
        c.render_display(Some(&video), FacingMode::Front, &board, None);
        c.render_record(Some(&video), FacingMode::Front, &board);

        assert_eq!(c.display().pixel(30, 48), Some(RED));
        assert_eq!(c.display().pixel(42, 48), Some(GREEN));
        assert_eq!(c.record().pixel(30, 48), Some(GREEN));
        assert_eq!(c.record().pixel(42, 48), Some(RED));
    }

    #[test]
    fn logo_and_fingertips_on_display_only() {
        let board = MagnetBoard::new(BoardTuning::default());
        let mut c = compositor(vec![], Some(Sprite::solid(4, 4, GREEN)));
        let video = VideoFrame::new(16, 12, vec![BLACK; 16 * 12]);
        let hand = HandPose::new(Point::new(30.0, 60.0), Point::new(50.0, 60.0));
        c.render_display(Some(&video), FacingMode::Front, &board, Some(&hand));
        c.render_record(Some(&video), FacingMode::Front, &board);

        assert_eq!(c.display().pixel(3, 3), Some(GREEN));
        assert_eq!(c.display().pixel(30, 60), Some(WHITE));
        assert_eq!(c.display().pixel(50, 60), Some(WHITE));
        assert_eq!(c.record().pixel(3, 3), Some(BLACK));
        assert_eq!(c.record().pixel(30, 60), Some(BLACK));
    }

    #[test]
    fn magnets_without_artwork_are_skipped() {
        let mut board = MagnetBoard::new(BoardTuning::default());
        board.add(&spec(0.0), Size::new(20.0, 20.0), Point::new(36.0, 48.0));
        let mut c = compositor(vec![], None);
        c.render_display(None, FacingMode::Front, &board, None);
        assert!(c.display().pixels().iter().all(|&p| p == BLACK));
    }
}
