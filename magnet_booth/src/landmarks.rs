//! Hand landmark sources, from LeapMotion hardware or pointer simulation.
//!
//! Detection is asynchronous.  The render loop hands a downscaled frame to a
//! [`Detector`], which forwards it to a [`LandmarkSource`] running on its own
//! thread, and picks the answer up on a later tick.  Consumers don't need to
//! know whether landmarks came from real hardware or the simulator.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use magnet_space::{HandFrame, Landmark, Point, SpaceError};
use tracing::{debug, warn};

use crate::camera::VideoFrame;
use crate::config::TrackingConfig;

// ════════════════════════════════════════════════════════════════════════════
// Requests and results
// ════════════════════════════════════════════════════════════════════════════

/// A frame submitted for detection.
#[derive(Clone, Debug)]
pub struct DetectRequest {
    pub frame:  VideoFrame,
    pub issued: Instant,
}

/// The answer to one [`DetectRequest`].  `hand` is `None` when no hand was
/// found.
#[derive(Clone, Debug)]
pub struct Detection {
    pub hand:   Option<HandFrame>,
    pub issued: Instant,
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that answers detection requests over a channel.  One result is
/// sent per request; the source returns when the request channel closes.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, requests: Receiver<DetectRequest>, results: Sender<Detection>);
}

/// Spawn a landmark source on its own thread and return the handle that
/// talks to it.
pub fn spawn_landmark_source<S: LandmarkSource>(source: S, throttle: Duration) -> Detector {
    let (req_tx, req_rx) = mpsc::channel();
    let (res_tx, res_rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(req_rx, res_tx));
    Detector { req_tx, res_rx, in_flight: false, throttle, last_accepted: None, disconnected: false }
}

// ════════════════════════════════════════════════════════════════════════════
// Detector
// ════════════════════════════════════════════════════════════════════════════

/// Render-loop side of a landmark source.
///
/// At most one request is outstanding.  A result arriving within `throttle`
/// of the previously accepted one is dropped.
pub struct Detector {
    req_tx:        Sender<DetectRequest>,
    res_rx:        Receiver<Detection>,
    in_flight:     bool,
    throttle:      Duration,
    last_accepted: Option<Instant>,
    disconnected:  bool,
}

impl Detector {
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Submit `frame` unless a request is already pending.  Returns whether
    /// the frame was sent.
    pub fn request(&mut self, frame: VideoFrame, now: Instant) -> bool {
        if self.in_flight || self.disconnected {
            return false;
        }
        if self.req_tx.send(DetectRequest { frame, issued: now }).is_err() {
            warn!("landmark source stopped");
            self.disconnected = true;
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Pick up a finished detection.
    ///
    /// `None` means nothing new this tick.  `Some(None)` means the source
    /// answered and saw no hand.
    pub fn poll(&mut self, now: Instant) -> Option<Option<HandFrame>> {
        let mut latest = None;
        loop {
            match self.res_rx.try_recv() {
                Ok(detection) => {
                    self.in_flight = false;
                    latest = Some(detection);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        warn!("landmark source disconnected");
                    }
                    self.disconnected = true;
                    self.in_flight = false;
                    break;
                }
            }
        }
        let detection = latest?;
        if let Some(prev) = self.last_accepted {
            if now.duration_since(prev) < self.throttle {
                debug!("detection result throttled");
                return None;
            }
        }
        self.last_accepted = Some(now);
        Some(detection.hand)
    }

    /// Forget the throttle window, e.g. after tracking is re-enabled.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DetectionSchedule
// ════════════════════════════════════════════════════════════════════════════

/// Which render ticks request detection and which update the board.
///
/// Both cadences relax while recording to leave room for the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectionSchedule {
    detect_idle:       u32,
    detect_recording:  u32,
    overlay_idle:      u32,
    overlay_recording: u32,
}

impl DetectionSchedule {
    pub fn from_config(cfg: &TrackingConfig) -> Self {
        DetectionSchedule {
            detect_idle:       cfg.detect_every_idle.max(1),
            detect_recording:  cfg.detect_every_recording.max(1),
            overlay_idle:      cfg.overlay_every_idle.max(1),
            overlay_recording: cfg.overlay_every_recording.max(1),
        }
    }

    pub fn detect_due(&self, tick: u64, recording: bool) -> bool {
        let every = if recording { self.detect_recording } else { self.detect_idle };
        tick % every as u64 == 0
    }

    /// Board update and hand overlay share one cadence.
    pub fn board_due(&self, tick: u64, recording: bool) -> bool {
        let every = if recording { self.overlay_recording } else { self.overlay_idle };
        tick % every as u64 == 0
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource: pointer simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Hand state reported by the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimHand {
    /// Thumb and index fingertips in normalized video space.
    Pose { thumb: Landmark, index: Landmark },
    /// Pointer left the window.
    Lost,
}

/// Landmark source driven by [`SimHand`] updates from the window.
///
/// Each request is answered with a full 21-point hand synthesised around the
/// latest reported fingertips.
pub struct SimLandmarkSource {
    pub rx: Receiver<SimHand>,
}

impl LandmarkSource for SimLandmarkSource {
    fn run(self: Box<Self>, requests: Receiver<DetectRequest>, results: Sender<Detection>) {
        let mut current = SimHand::Lost;
        for request in requests {
            while let Ok(update) = self.rx.try_recv() {
                current = update;
            }
            let hand = match current {
                SimHand::Pose { thumb, index } => match synthetic_hand(thumb, index) {
                    Ok(frame) => Some(frame),
                    Err(e) => {
                        debug!(error = %e, "simulated hand rejected");
                        None
                    }
                },
                SimHand::Lost => None,
            };
            if results.send(Detection { hand, issued: request.issued }).is_err() {
                return;
            }
        }
    }
}

/// Build a plausible 21-point hand whose thumb and index tips sit exactly at
/// the given landmarks.  Only the two tips matter to the board; the rest
/// fills in the wrist and the other fingers so the frame is well-formed.
pub fn synthetic_hand(thumb: Landmark, index: Landmark) -> Result<HandFrame, SpaceError> {
    let t = Point::new(thumb.x, thumb.y);
    let i = Point::new(index.x, index.y);
    let wrist = Point::new(t.midpoint(i).x, t.y.max(i.y) + 0.25);

    let chain = |tip: Point| -> [Landmark; 4] {
        let at = |f: f32| {
            let p = wrist.lerp(tip, f);
            Landmark::normalized(p.x, p.y, 0.0)
        };
        [at(0.3), at(0.55), at(0.8), Landmark::normalized(tip.x, tip.y, 0.0)]
    };

    let mut points = Vec::with_capacity(magnet_space::landmarks::COUNT);
    points.push(Landmark::normalized(wrist.x, wrist.y, 0.0));
    points.extend(chain(t));
    points.extend(chain(i));
    for k in 1..=3 {
        let k = k as f32;
        points.extend(chain(Point::new(i.x + 0.03 * k, i.y + 0.02 * k)));
    }
    HandFrame::new(points)
}

// ════════════════════════════════════════════════════════════════════════════
// LeapLandmarkSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Landmark source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// The controller reports joints in millimetres above the device.  The
/// interaction box below is mapped onto normalized video space, x left to
/// right and y top to bottom, so the hand appears where it hovers.
#[cfg(feature = "leap")]
pub struct LeapLandmarkSource;

#[cfg(feature = "leap")]
impl LandmarkSource for LeapLandmarkSource {
    fn run(self: Box<Self>, requests: Receiver<DetectRequest>, results: Sender<Detection>) {
        use leaprs::*;

        const POLLS_PER_REQUEST: usize = 5;

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = ?e, "cannot create LeapC connection");
                return;
            }
        };
        if let Err(e) = connection.open() {
            tracing::error!(error = ?e, "cannot open LeapMotion device");
            return;
        }

        let mut latest: Option<HandFrame> = None;
        for request in requests {
            for _ in 0..POLLS_PER_REQUEST {
                let msg = match connection.poll(10) {
                    Ok(m)  => m,
                    Err(_) => continue,
                };
                if let Event::Tracking(frame) = msg.event() {
                    latest = frame.hands().next().and_then(|hand| leap_hand(&hand));
                }
            }
            if results.send(Detection { hand: latest.clone(), issued: request.issued }).is_err() {
                return;
            }
        }
    }
}

#[cfg(feature = "leap")]
fn leap_hand(hand: &leaprs::Hand) -> Option<HandFrame> {
    // Interaction box, millimetres.
    const X_MIN: f32 = -200.0;
    const X_SPAN: f32 = 400.0;
    const Y_MIN: f32 = 80.0;
    const Y_SPAN: f32 = 320.0;

    let mut joints: Vec<[f32; 3]> = Vec::with_capacity(magnet_space::landmarks::COUNT);
    let j = hand.arm().next_joint();
    joints.push([j.x, j.y, j.z]);
    for digit in hand.digits() {
        for j in [
            digit.proximal().prev_joint(),
            digit.intermediate().prev_joint(),
            digit.distal().prev_joint(),
            digit.distal().next_joint(),
        ] {
            joints.push([j.x, j.y, j.z]);
        }
    }

    let points = joints
        .into_iter()
        .map(|[x, y, z]| Landmark::normalized((x - X_MIN) / X_SPAN, 1.0 - (y - Y_MIN) / Y_SPAN, z / X_SPAN))
        .collect();
    match HandFrame::new(points) {
        Ok(frame) => Some(frame),
        Err(e) => {
            debug!(error = %e, "leap hand rejected");
            None
        }
    }
}
