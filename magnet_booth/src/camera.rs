//! Video frames and the capture device seam.
//!
//! The booth ships with [`SyntheticCamera`], a moving test pattern, so the
//! whole pipeline runs on machines without a webcam.

use magnet_space::{FacingMode, Size};
use tracing::{info, warn};

use crate::config::CameraConfig;
use crate::error::BoothError;

// ════════════════════════════════════════════════════════════════════════════
// VideoFrame
// ════════════════════════════════════════════════════════════════════════════

/// One raw camera frame in intrinsic video pixels, ARGB.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoFrame {
    width:  usize,
    height: usize,
    pixels: Vec<u32>,
}

impl VideoFrame {
    /// `pixels` is padded with black or truncated to `width * height`.
    pub fn new(width: usize, height: usize, mut pixels: Vec<u32>) -> Self {
        pixels.resize(width * height, 0xFF00_0000);
        VideoFrame { width, height, pixels }
    }

    pub fn width(&self)  -> usize  { self.width }
    pub fn height(&self) -> usize  { self.height }
    pub fn pixels(&self) -> &[u32] { &self.pixels }

    pub fn size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }

    /// Nearest-neighbour copy `target_w` pixels wide with the same aspect.
    ///
    /// Frames already narrower than `target_w` are returned unchanged, so
    /// normalized coordinates measured on the copy still describe the
    /// original frame.
    pub fn downscale(&self, target_w: usize) -> VideoFrame {
        if target_w == 0 || self.width <= target_w || self.height == 0 {
            return self.clone();
        }
        let target_h = ((self.height * target_w) as f32 / self.width as f32).round().max(1.0) as usize;
        let mut pixels = Vec::with_capacity(target_w * target_h);
        for y in 0..target_h {
            let sy = y * self.height / target_h;
            for x in 0..target_w {
                let sx = x * self.width / target_w;
                pixels.push(self.pixels[sy * self.width + sx]);
            }
        }
        VideoFrame { width: target_w, height: target_h, pixels }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CaptureDevice
// ════════════════════════════════════════════════════════════════════════════

pub trait CaptureDevice: Send {
    fn facing(&self) -> FacingMode;

    /// Intrinsic size of the frames this device produces.
    fn video_size(&self) -> Size;

    /// Reopen on the other camera.  On error the device keeps its previous
    /// facing.
    fn switch_to(&mut self, facing: FacingMode) -> Result<(), BoothError>;

    /// The next frame, or `None` while the device is still warming up.
    fn next_frame(&mut self) -> Option<VideoFrame>;
}

// ════════════════════════════════════════════════════════════════════════════
// SyntheticCamera
// ════════════════════════════════════════════════════════════════════════════

const FRONT_BARS: [u32; 6] = [
    0xFFC0_4040, 0xFFC0_8040, 0xFFC0_C040, 0xFF40_C040, 0xFF40_80C0, 0xFF80_40C0,
];
const REAR_BARS: [u32; 6] = [
    0xFF30_5070, 0xFF30_7070, 0xFF30_7050, 0xFF50_7030, 0xFF70_5030, 0xFF70_3050,
];
const BAND_ROWS: usize = 12;
const BAND_SPEED: usize = 4;

/// Colour bars with a bright band scrolling downwards.
///
/// The front and rear cameras use different palettes so a switch is visible,
/// and the bars are asymmetric so mirroring is too.
pub struct SyntheticCamera {
    config:      CameraConfig,
    facing:      FacingMode,
    frame_no:    usize,
    warmup_left: u32,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig, facing: FacingMode) -> Result<Self, BoothError> {
        if facing == FacingMode::Rear && !config.rear_available {
            return Err(BoothError::CameraUnavailable(facing));
        }
        let warmup_left = config.warmup_frames;
        info!(facing = facing.name(), w = config.video_width, h = config.video_height, "camera opened");
        Ok(SyntheticCamera { config, facing, frame_no: 0, warmup_left })
    }

    fn render(&self) -> VideoFrame {
        let (w, h) = (self.config.video_width, self.config.video_height);
        let bars = match self.facing {
            FacingMode::Front => &FRONT_BARS,
            FacingMode::Rear  => &REAR_BARS,
        };
        let band_top = (self.frame_no * BAND_SPEED) % h.max(1);
        let mut pixels = Vec::with_capacity(w * h);
        for y in 0..h {
            let in_band = (y + h - band_top) % h < BAND_ROWS;
            for x in 0..w {
                let c = bars[x * bars.len() / w];
                pixels.push(if in_band { crate::surface::blend(c, 0xFFFF_FFFF, 0.5) } else { c });
            }
        }
        VideoFrame::new(w, h, pixels)
    }
}

impl CaptureDevice for SyntheticCamera {
    fn facing(&self) -> FacingMode {
        self.facing
    }

    fn video_size(&self) -> Size {
        Size::new(self.config.video_width as f32, self.config.video_height as f32)
    }

    fn switch_to(&mut self, facing: FacingMode) -> Result<(), BoothError> {
        if facing == FacingMode::Rear && !self.config.rear_available {
            return Err(BoothError::CameraUnavailable(facing));
        }
        self.facing = facing;
        self.warmup_left = self.config.warmup_frames;
        info!(facing = facing.name(), "camera switched");
        Ok(())
    }

    fn next_frame(&mut self) -> Option<VideoFrame> {
        if self.warmup_left > 0 {
            self.warmup_left -= 1;
            return None;
        }
        if self.config.video_width == 0 || self.config.video_height == 0 {
            return None;
        }
        self.frame_no += 1;
        Some(self.render())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FacingController
// ════════════════════════════════════════════════════════════════════════════

/// Owns the facing flag the compositor and transform read.
///
/// A switch flips the flag first and puts it back if the device refuses.
#[derive(Clone, Copy, Debug, Default)]
pub struct FacingController {
    facing: FacingMode,
}

impl FacingController {
    pub fn new(facing: FacingMode) -> Self {
        FacingController { facing }
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn switch(&mut self, device: &mut dyn CaptureDevice) -> Result<FacingMode, BoothError> {
        let previous = self.facing;
        self.facing = previous.toggled();
        match device.switch_to(self.facing) {
            Ok(()) => Ok(self.facing),
            Err(e) => {
                warn!(error = %e, "camera switch refused");
                self.facing = previous;
                Err(e)
            }
        }
    }
}
