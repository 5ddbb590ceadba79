//! The magnet set and its per-tick transition step.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use magnet_space::{Point, Size};

use crate::gesture::{GestureInterpreter, HandPose, PinchReading};
use crate::magnet::{Magnet, MagnetId, MagnetSpec};

// ════════════════════════════════════════════════════════════════════════════
// BoardTuning
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardTuning {
    pub pinch_threshold:     f32,
    pub near_factor:         f32,
    /// Size of a held magnet relative to its base size.
    pub grab_scale:          f32,
    pub smoothing_idle:      f32,
    /// Lower smoothing while recording keeps the captured motion steady.
    pub smoothing_recording: f32,
    /// Weight on the other magnet's radius in the overlap test.
    pub collision_slack:     f32,
    /// Other magnets farther than this (px) from the target are ignored.
    pub collision_cutoff:    f32,
}

impl Default for BoardTuning {
    fn default() -> Self {
        BoardTuning {
            pinch_threshold:     90.0,
            near_factor:         1.0,
            grab_scale:          0.8,
            smoothing_idle:      0.3,
            smoothing_recording: 0.2,
            collision_slack:     0.9,
            collision_cutoff:    200.0,
        }
    }
}

/// Something that happened to a magnet during [`MagnetBoard::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    Grabbed(MagnetId),
    Released(MagnetId),
    /// The held magnet stayed put because another one was in the way.
    Blocked(MagnetId),
}

// ════════════════════════════════════════════════════════════════════════════
// MagnetBoard
// ════════════════════════════════════════════════════════════════════════════

/// All magnets of a session plus the single holder token.
#[derive(Clone, Debug)]
pub struct MagnetBoard {
    magnets:     Vec<Magnet>,
    holder:      Option<MagnetId>,
    interpreter: GestureInterpreter,
    tuning:      BoardTuning,
}

impl MagnetBoard {
    pub fn new(tuning: BoardTuning) -> Self {
        MagnetBoard {
            magnets: Vec::new(),
            holder: None,
            interpreter: GestureInterpreter {
                pinch_threshold: tuning.pinch_threshold,
                near_factor:     tuning.near_factor,
            },
            tuning,
        }
    }

    /// Lay out one magnet per spec.  `artwork[i]` is the intrinsic size of the
    /// i-th item's image; missing entries fall back to the default size.
    pub fn from_specs<R: Rng>(
        specs:   &[MagnetSpec],
        artwork: &[Size],
        canvas:  Size,
        tuning:  BoardTuning,
        rng:     &mut R,
    ) -> Self {
        let mut board = MagnetBoard::new(tuning);
        for (i, spec) in specs.iter().enumerate() {
            let art = artwork.get(i).copied().unwrap_or(Size::new(0.0, 0.0));
            let pos = spec.anchor.resolve(canvas, rng);
            let id = MagnetId(board.magnets.len());
            board.magnets.push(Magnet::new(id, spec, art, pos));
        }
        board
    }

    /// Add a magnet with an explicit base size.
    pub fn add(&mut self, spec: &MagnetSpec, base: Size, pos: Point) -> MagnetId {
        let id = MagnetId(self.magnets.len());
        self.magnets.push(Magnet::with_base_size(id, spec, base, pos));
        id
    }

    pub fn magnets(&self)     -> &[Magnet]               { &self.magnets }
    pub fn magnet(&self, id: MagnetId) -> Option<&Magnet> { self.magnets.get(id.0) }
    pub fn holder(&self)      -> Option<MagnetId>        { self.holder }
    pub fn interpreter(&self) -> &GestureInterpreter     { &self.interpreter }
    pub fn tuning(&self)      -> &BoardTuning            { &self.tuning }

    /// Advance every magnet by one tick of hand data.
    ///
    /// `pose` is the most recent hand; `None` means no hand is visible, which
    /// drops whatever is held.  `recording` lowers the smoothing factor and
    /// skips the collision test.
    pub fn step(&mut self, pose: Option<&HandPose>, recording: bool) -> Vec<BoardEvent> {
        let reading = pose.map(|p| self.interpreter.read(p));
        let mut events = Vec::new();
        for idx in 0..self.magnets.len() {
            if let Some(event) = self.transition(idx, reading.as_ref(), recording) {
                events.push(event);
            }
        }
        events
    }

    /// Drop the held magnet, if any.
    pub fn release_all(&mut self) -> Vec<BoardEvent> {
        self.step(None, false)
    }

    fn transition(
        &mut self,
        idx:       usize,
        reading:   Option<&PinchReading>,
        recording: bool,
    ) -> Option<BoardEvent> {
        let id = self.magnets[idx].id();
        let pinching = reading.map(|r| r.is_pinching).unwrap_or(false);

        if !self.magnets[idx].is_selected() {
            let reading = reading?;
            if pinching
                && self.holder.is_none()
                && self.interpreter.is_near(&self.magnets[idx], reading)
            {
                self.magnets[idx].grab(reading.midpoint, self.tuning.grab_scale);
                self.holder = Some(id);
                debug!(magnet = %self.magnets[idx].name(), "grabbed");
                return Some(BoardEvent::Grabbed(id));
            }
            return None;
        }

        match reading.filter(|r| r.is_pinching) {
            Some(reading) => {
                self.magnets[idx].hold(self.tuning.grab_scale);
                let target = reading.midpoint;
                if !recording && self.move_blocked(idx, target) {
                    return Some(BoardEvent::Blocked(id));
                }
                let factor = if recording {
                    self.tuning.smoothing_recording
                } else {
                    self.tuning.smoothing_idle
                };
                let next = self.magnets[idx].position().lerp(target, factor);
                self.magnets[idx].move_to(next);
                None
            }
            None => {
                self.magnets[idx].release();
                if self.holder == Some(id) {
                    self.holder = None;
                }
                debug!(magnet = %self.magnets[idx].name(), "released");
                Some(BoardEvent::Released(id))
            }
        }
    }

    /// Would moving magnet `idx` toward `target` overlap another magnet?
    fn move_blocked(&self, idx: usize, target: Point) -> bool {
        let me = &self.magnets[idx];
        let my_radius = me.radius();
        self.magnets
            .iter()
            .filter(|other| other.id() != me.id())
            .any(|other| {
                let d = target.distance(other.position());
                d < self.tuning.collision_cutoff
                    && d < my_radius + other.radius() * self.tuning.collision_slack
            })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
