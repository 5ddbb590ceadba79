//! Pinch signals derived from two fingertips.
//!
//! Each tick is read on its own; the interpreter keeps no memory of earlier
//! frames.  Holding the pinch is what keeps a magnet selected.

use magnet_space::{CanvasTransform, HandFrame, Point};

use crate::magnet::Magnet;

/// Fingertips of the most recent hand frame, already in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandPose {
    pub thumb:  Point,
    pub index:  Point,
    pub middle: Option<Point>,
    pub wrist:  Option<Point>,
}

impl HandPose {
    pub fn new(thumb: Point, index: Point) -> Self {
        HandPose { thumb, index, middle: None, wrist: None }
    }

    /// Project a frame onto the canvas.  `None` when the thumb or index tip
    /// cannot be placed; the optional tips are dropped individually.
    pub fn from_frame(frame: &HandFrame, transform: &CanvasTransform) -> Option<Self> {
        Some(HandPose {
            thumb:  transform.to_canvas(frame.thumb_tip())?,
            index:  transform.to_canvas(frame.index_tip())?,
            middle: transform.to_canvas(frame.middle_tip()),
            wrist:  transform.to_canvas(frame.wrist()),
        })
    }
}

/// What one tick of hand data says about the pinch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchReading {
    pub midpoint:       Point,
    pub pinch_distance: f32,
    pub is_pinching:    bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureInterpreter {
    /// Thumb-to-index distance (px) below which the hand counts as pinching.
    pub pinch_threshold: f32,
    /// Multiplier on a magnet's bounding radius for the "near" test.
    pub near_factor: f32,
}

impl Default for GestureInterpreter {
    fn default() -> Self {
        GestureInterpreter { pinch_threshold: 90.0, near_factor: 1.0 }
    }
}

impl GestureInterpreter {
    pub fn read(&self, pose: &HandPose) -> PinchReading {
        let pinch_distance = pose.thumb.distance(pose.index);
        PinchReading {
            midpoint: pose.thumb.midpoint(pose.index),
            pinch_distance,
            is_pinching: pinch_distance < self.pinch_threshold,
        }
    }

    pub fn detection_radius(&self, magnet: &Magnet) -> f32 {
        magnet.radius() * self.near_factor
    }

    pub fn is_near(&self, magnet: &Magnet, reading: &PinchReading) -> bool {
        magnet.position().distance(reading.midpoint) < self.detection_radius(magnet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magnet::{Anchor, MagnetId, MagnetSpec};
    use magnet_space::{landmarks, FacingMode, Landmark, Size};

    fn magnet_at(x: f32, y: f32, side: f32) -> Magnet {
        let spec = MagnetSpec { anchor: Anchor::Center, ..MagnetSpec::default() };
        Magnet::with_base_size(MagnetId(0), &spec, Size::new(side, side), Point::new(x, y))
    }

    #[test]
    fn midpoint_and_distance() {
        let g = GestureInterpreter::default();
        let r = g.read(&HandPose::new(Point::new(0.0, 0.0), Point::new(60.0, 80.0)));
        assert_eq!(r.midpoint, Point::new(30.0, 40.0));
        assert!((r.pinch_distance - 100.0).abs() < 1e-4);
        assert!(!r.is_pinching);
    }

    #[test]
    fn close_fingers_pinch() {
        let g = GestureInterpreter::default();
        let r = g.read(&HandPose::new(Point::new(100.0, 100.0), Point::new(150.0, 100.0)));
        assert!(r.is_pinching);
    }

    #[test]
    fn near_uses_bounding_circle() {
        let g = GestureInterpreter::default();
        // 60×80 box → radius 50
        let spec = MagnetSpec::default();
        let m = Magnet::with_base_size(MagnetId(0), &spec, Size::new(60.0, 80.0), Point::new(0.0, 0.0));
        let inside  = PinchReading { midpoint: Point::new(49.0, 0.0), pinch_distance: 10.0, is_pinching: true };
        let outside = PinchReading { midpoint: Point::new(51.0, 0.0), ..inside };
        assert!(g.is_near(&m, &inside));
        assert!(!g.is_near(&m, &outside));
    }

    #[test]
    fn near_factor_widens_the_radius() {
        let g = GestureInterpreter { near_factor: 2.0, ..GestureInterpreter::default() };
        let m = magnet_at(0.0, 0.0, 100.0);
        let r = PinchReading { midpoint: Point::new(100.0, 0.0), pinch_distance: 0.0, is_pinching: true };
        assert!(g.is_near(&m, &r));
    }

    #[test]
    fn pose_from_frame_uses_tips() {
        let mut points = vec![Landmark::normalized(0.5, 0.5, 0.0); landmarks::COUNT];
        points[landmarks::THUMB_TIP] = Landmark::normalized(0.0, 0.5, 0.0);
        points[landmarks::INDEX_FINGER_TIP] = Landmark::normalized(1.0, 0.5, 0.0);
        let frame = HandFrame::new(points).unwrap();
        let t = CanvasTransform::new(Size::new(640.0, 480.0), Size::new(720.0, 960.0), FacingMode::Rear).unwrap();
        let pose = HandPose::from_frame(&frame, &t).unwrap();
        assert!((pose.thumb.x - 0.0).abs() < 1e-3);
        assert!((pose.index.x - 720.0).abs() < 1e-3);
        assert!(pose.middle.is_some());
    }
}
