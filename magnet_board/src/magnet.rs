//! A single movable sprite and the configuration it is built from.

use rand::Rng;
use serde::{Deserialize, Serialize};

use magnet_space::{reflect_x, Point, Size};

/// Longest side (px) an artwork is fitted to at `size_multiplier = 1.0`.
pub const BASE_FIT: f32 = 300.0;

/// Identity of a magnet within its board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MagnetId(pub usize);

// ════════════════════════════════════════════════════════════════════════════
// Anchor
// ════════════════════════════════════════════════════════════════════════════

/// Named starting position on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    BottomRight,
    BottomLeft,
    #[default]
    Center,
    LeftCenter,
    RightCenter,
    /// Uniformly random, keeping 8% clear of every edge.
    Random,
}

impl Anchor {
    pub fn resolve<R: Rng>(self, canvas: Size, rng: &mut R) -> Point {
        let (w, h) = (canvas.w, canvas.h);
        let mx = w * 0.1;
        let my = h * 0.1;
        match self {
            Anchor::TopLeft     => Point::new(mx + 150.0,     my + 150.0),
            Anchor::TopCenter   => Point::new(w - mx - 100.0, h / 2.0 - 100.0),
            Anchor::BottomRight => Point::new(w - mx - 80.0,  h - my - 100.0),
            Anchor::BottomLeft  => Point::new(mx + 100.0,     h - my - 200.0),
            Anchor::Center      => Point::new(mx + 100.0,     h / 2.0 - 50.0),
            Anchor::LeftCenter  => Point::new(mx + 100.0,     h / 2.0 + 100.0),
            Anchor::RightCenter => Point::new(w - mx - 200.0, my + 100.0),
            Anchor::Random => {
                let ex = w * 0.08;
                let ey = h * 0.08;
                Point::new(rng.gen_range(ex..=w - ex), rng.gen_range(ey..=h - ey))
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MagnetSpec
// ════════════════════════════════════════════════════════════════════════════

/// Creation-time description of one magnet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnetSpec {
    pub name:            String,
    pub anchor:          Anchor,
    pub size_multiplier: f32,
    /// Horizontal shift (px) applied on the record surface after mirroring.
    pub record_offset_x: f32,
    /// Fixed rotation in radians.
    pub angle:           f32,
}

impl Default for MagnetSpec {
    fn default() -> Self {
        MagnetSpec {
            name:            String::from("magnet"),
            anchor:          Anchor::Center,
            size_multiplier: 1.0,
            record_offset_x: 0.0,
            angle:           0.0,
        }
    }
}

/// The stock six-magnet layout for a canvas `canvas_w` pixels wide.
///
/// Items share one record-surface column offset; the wide `banner` item sits
/// in a second column further right.
pub fn default_specs(canvas_w: f32) -> Vec<MagnetSpec> {
    let column = -canvas_w / 2.0 + 200.0;
    let wide_column = -canvas_w / 2.0 + 360.0;
    let item = |name: &str, anchor, size_multiplier, record_offset_x| MagnetSpec {
        name: name.to_string(),
        anchor,
        size_multiplier,
        record_offset_x,
        angle: 0.0,
    };
    vec![
        item("pony",    Anchor::TopLeft,     1.2, column),
        item("rider",   Anchor::TopCenter,   1.1, column),
        item("banner",  Anchor::BottomRight, 1.1, wide_column),
        item("saddle",  Anchor::BottomLeft,  1.0, column),
        item("star",    Anchor::Center,      1.3, column),
        item("lantern", Anchor::RightCenter, 1.4, column),
    ]
}

// ════════════════════════════════════════════════════════════════════════════
// Magnet
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Magnet {
    id:              MagnetId,
    name:            String,
    pos:             Point,
    angle:           f32,
    base:            Size,
    size_multiplier: f32,
    current:         Size,
    pre_grab:        Size,
    record_offset_x: f32,
    pub(crate) selected: bool,
    pub(crate) grabbed:  bool,
}

impl Magnet {
    /// Build from artwork of intrinsic size `artwork`, fitted into a
    /// [`BASE_FIT`] square.
    pub fn new(id: MagnetId, spec: &MagnetSpec, artwork: Size, pos: Point) -> Self {
        let base = match artwork.aspect() {
            Some(_) => {
                let scale = (BASE_FIT / artwork.w).min(BASE_FIT / artwork.h);
                Size::new(artwork.w * scale, artwork.h * scale)
            }
            None => Size::new(100.0, 100.0),
        };
        Magnet::with_base_size(id, spec, base, pos)
    }

    /// Build with an explicit size at multiplier 1.0.
    pub fn with_base_size(id: MagnetId, spec: &MagnetSpec, base: Size, pos: Point) -> Self {
        let current = Size::new(base.w * spec.size_multiplier, base.h * spec.size_multiplier);
        Magnet {
            id,
            name: spec.name.clone(),
            pos,
            angle: spec.angle,
            base,
            size_multiplier: spec.size_multiplier,
            current,
            pre_grab: current,
            record_offset_x: spec.record_offset_x,
            selected: false,
            grabbed: false,
        }
    }

    pub fn id(&self)              -> MagnetId { self.id }
    pub fn name(&self)            -> &str     { &self.name }
    pub fn position(&self)        -> Point    { self.pos }
    pub fn angle(&self)           -> f32      { self.angle }
    pub fn base_size(&self)       -> Size     { self.base }
    pub fn size_multiplier(&self) -> f32      { self.size_multiplier }
    pub fn current_size(&self)    -> Size     { self.current }
    pub fn pre_grab_size(&self)   -> Size     { self.pre_grab }
    pub fn record_offset_x(&self) -> f32      { self.record_offset_x }
    pub fn is_selected(&self)     -> bool     { self.selected }
    pub fn is_grabbed(&self)      -> bool     { self.grabbed }

    /// Size when not held.
    pub fn resting_size(&self) -> Size {
        Size::new(self.base.w * self.size_multiplier, self.base.h * self.size_multiplier)
    }

    /// Radius of the circle that encloses the current bounding box.
    pub fn radius(&self) -> f32 {
        self.current.w.hypot(self.current.h) / 2.0
    }

    /// Centre X on the record surface.
    pub fn record_x(&self, canvas_w: f32) -> f32 {
        reflect_x(canvas_w, self.pos.x) + self.record_offset_x
    }

    pub(crate) fn grab(&mut self, at: Point, grab_scale: f32) {
        self.pre_grab = self.current;
        self.current = Size::new(self.base.w * grab_scale, self.base.h * grab_scale);
        self.pos = at;
        self.selected = true;
        self.grabbed = true;
    }

    pub(crate) fn hold(&mut self, grab_scale: f32) {
        self.current = Size::new(self.base.w * grab_scale, self.base.h * grab_scale);
    }

    pub(crate) fn move_to(&mut self, pos: Point) {
        self.pos = pos;
    }

    pub(crate) fn release(&mut self) {
        self.current = self.resting_size();
        self.selected = false;
        self.grabbed = false;
    }
}
