//! # magnet_space
//!
//! Geometry shared by every layer of the magnet booth: hand-landmark frames as
//! delivered by a detector, and the mapping from camera space onto canvas
//! pixels.
//!
//! The camera image is aspect-fit (letterboxed) into the canvas: scaled so one
//! axis is filled completely and centred on the other.  A landmark is pushed
//! through the same scale and offset, then mirrored horizontally when the
//! front camera is active so that it lines up with the mirrored selfie view.
//!
//! ```text
//!   video space (0..1)          canvas space (pixels)
//!   ┌──────────────┐            ┌────────────┐
//!   │      ●       │   ──fit──► │░░░░░░░░░░░░│ offset_y
//!   │              │            │     ●      │
//!   └──────────────┘            │░░░░░░░░░░░░│
//!                               └────────────┘
//! ```
//!
//! Landmarks carry an explicit [`CoordSpace`] tag.  Sources that cannot say
//! which space they report in can fall back to [`Landmark::inferred`], which
//! applies the `[0, 1]` range check; genuine pixel coordinates that happen to
//! fall inside `[0, 1]` are misclassified by that heuristic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices
// ════════════════════════════════════════════════════════════════════════════

/// Keypoint indices within a 21-point hand frame.
#[allow(dead_code)]
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;

    /// Number of keypoints in a complete frame.
    pub const COUNT: usize = 21;
}

// ════════════════════════════════════════════════════════════════════════════
// SpaceError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpaceError {
    /// A detector result did not contain a full hand.
    #[error("hand frame needs {expected} landmarks, got {got}")]
    LandmarkCount { expected: usize, got: usize },

    /// A coordinate was NaN or infinite.
    #[error("non-finite coordinate in landmark {index}")]
    NonFinite { index: usize },
}

// ════════════════════════════════════════════════════════════════════════════
// Point / Size
// ════════════════════════════════════════════════════════════════════════════

/// A position on a canvas, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Move `t` of the way from `self` toward `target`.
    pub fn lerp(self, target: Point, t: f32) -> Point {
        Point::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
        )
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}

impl Size {
    pub const fn new(w: f32, h: f32) -> Self {
        Size { w, h }
    }

    /// Width over height, or `None` for a degenerate rectangle.
    pub fn aspect(self) -> Option<f32> {
        if self.w > 0.0 && self.h > 0.0 && self.w.is_finite() && self.h.is_finite() {
            Some(self.w / self.h)
        } else {
            None
        }
    }
}

/// Mirror an X coordinate across the vertical centre line of a canvas.
pub fn reflect_x(canvas_w: f32, x: f32) -> f32 {
    canvas_w - x
}

// ════════════════════════════════════════════════════════════════════════════
// FacingMode
// ════════════════════════════════════════════════════════════════════════════

/// Which camera is feeding the booth.
///
/// The two rendering surfaces mirror the video under opposite rules: the
/// display shows a mirrored selfie view for the front camera, while the record
/// surface mirrors for the rear camera so the saved clip reads the right way
/// round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    Front,
    Rear,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::Front => FacingMode::Rear,
            FacingMode::Rear  => FacingMode::Front,
        }
    }

    /// Whether the display surface draws the video flipped.
    pub fn mirrors_display_video(self) -> bool {
        self == FacingMode::Front
    }

    /// Whether the record surface draws the video flipped.
    pub fn mirrors_record_video(self) -> bool {
        self == FacingMode::Rear
    }

    pub fn name(self) -> &'static str {
        match self {
            FacingMode::Front => "front",
            FacingMode::Rear  => "rear",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark / HandFrame
// ════════════════════════════════════════════════════════════════════════════

/// Coordinate space a landmark was reported in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordSpace {
    /// Each axis in `[0, 1]` relative to the video frame.
    Normalized,
    /// Pixels of the intrinsic video frame.
    VideoPixels,
}

/// One 3-D hand keypoint.  `z` is relative depth and is carried through
/// untouched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub space: CoordSpace,
}

impl Landmark {
    pub fn normalized(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z, space: CoordSpace::Normalized }
    }

    pub fn pixels(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z, space: CoordSpace::VideoPixels }
    }

    /// Classify by range: both axes inside `[0, 1]` means normalized,
    /// anything else is taken as video pixels.
    pub fn inferred(x: f32, y: f32, z: f32) -> Self {
        if (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y) {
            Landmark::normalized(x, y, z)
        } else {
            Landmark::pixels(x, y, z)
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One detection result: 21 keypoints for a single hand.
///
/// Immutable once built; a newer frame replaces an older one wholesale.
#[derive(Clone, Debug, PartialEq)]
pub struct HandFrame {
    points: Vec<Landmark>,
}

impl HandFrame {
    pub fn new(points: Vec<Landmark>) -> Result<Self, SpaceError> {
        if points.len() != landmarks::COUNT {
            return Err(SpaceError::LandmarkCount {
                expected: landmarks::COUNT,
                got:      points.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(SpaceError::NonFinite { index });
        }
        Ok(HandFrame { points })
    }

    /// Build a frame from untagged `(x, y, z)` triples, classifying each with
    /// [`Landmark::inferred`].
    pub fn from_untagged(triples: &[[f32; 3]]) -> Result<Self, SpaceError> {
        HandFrame::new(
            triples.iter().map(|&[x, y, z]| Landmark::inferred(x, y, z)).collect(),
        )
    }

    pub fn points(&self) -> &[Landmark] { &self.points }
    pub fn point(&self, index: usize) -> Option<&Landmark> { self.points.get(index) }

    pub fn wrist(&self)      -> &Landmark { &self.points[landmarks::WRIST] }
    pub fn thumb_tip(&self)  -> &Landmark { &self.points[landmarks::THUMB_TIP] }
    pub fn index_tip(&self)  -> &Landmark { &self.points[landmarks::INDEX_FINGER_TIP] }
    pub fn middle_tip(&self) -> &Landmark { &self.points[landmarks::MIDDLE_FINGER_TIP] }
}

// ════════════════════════════════════════════════════════════════════════════
// Letterbox
// ════════════════════════════════════════════════════════════════════════════

/// Where an aspect-fit video rectangle lands inside a canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub draw_w:   f32,
    pub draw_h:   f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Letterbox {
    /// Fit `video` inside `canvas`.  A video wider than the canvas fills the
    /// width and is centred vertically; otherwise it fills the height and is
    /// centred horizontally.
    pub fn fit(video: Size, canvas: Size) -> Option<Self> {
        let video_aspect  = video.aspect()?;
        let canvas_aspect = canvas.aspect()?;

        if video_aspect > canvas_aspect {
            let draw_h = canvas.w / video_aspect;
            Some(Letterbox {
                draw_w:   canvas.w,
                draw_h,
                offset_x: 0.0,
                offset_y: (canvas.h - draw_h) / 2.0,
            })
        } else {
            let draw_w = canvas.h * video_aspect;
            Some(Letterbox {
                draw_w,
                draw_h:   canvas.h,
                offset_x: (canvas.w - draw_w) / 2.0,
                offset_y: 0.0,
            })
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CanvasTransform
// ════════════════════════════════════════════════════════════════════════════

/// Maps landmarks from video space into display-canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasTransform {
    canvas:    Size,
    video:     Size,
    facing:    FacingMode,
    letterbox: Letterbox,
}

impl CanvasTransform {
    /// Returns `None` when either rectangle is degenerate.
    pub fn new(video: Size, canvas: Size, facing: FacingMode) -> Option<Self> {
        let letterbox = Letterbox::fit(video, canvas)?;
        Some(CanvasTransform { canvas, video, facing, letterbox })
    }

    pub fn canvas(&self)    -> Size       { self.canvas }
    pub fn video(&self)     -> Size       { self.video }
    pub fn facing(&self)    -> FacingMode { self.facing }
    pub fn letterbox(&self) -> Letterbox  { self.letterbox }

    /// Canvas position of a landmark, or `None` if any input is non-finite.
    ///
    /// Points outside the canvas are returned as-is.
    pub fn to_canvas(&self, landmark: &Landmark) -> Option<Point> {
        if !landmark.is_finite() {
            return None;
        }
        let lb = &self.letterbox;
        let (x, y) = match landmark.space {
            CoordSpace::Normalized => (
                lb.offset_x + landmark.x * lb.draw_w,
                lb.offset_y + landmark.y * lb.draw_h,
            ),
            CoordSpace::VideoPixels => (
                lb.offset_x + landmark.x * (lb.draw_w / self.video.w),
                lb.offset_y + landmark.y * (lb.draw_h / self.video.h),
            ),
        };
        let x = if self.facing == FacingMode::Front {
            reflect_x(self.canvas.w, x)
        } else {
            x
        };
        let p = Point::new(x, y);
        p.is_finite().then_some(p)
    }

    /// Inverse of [`to_canvas`](Self::to_canvas): the normalized landmark that
    /// would land on `point`.
    pub fn to_landmark(&self, point: Point) -> Option<Landmark> {
        if !point.is_finite() {
            return None;
        }
        let lb = &self.letterbox;
        let x = if self.facing == FacingMode::Front {
            reflect_x(self.canvas.w, point.x)
        } else {
            point.x
        };
        Some(Landmark::normalized(
            (x - lb.offset_x) / lb.draw_w,
            (point.y - lb.offset_y) / lb.draw_h,
            0.0,
        ))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
