//! The recorder seam.
//!
//! A recorder is fed record-surface frames while a session runs and reports
//! back through [`RecorderEvent`]s that the manager drains once per tick.

use std::time::Duration;

use crate::encode::FrameRef;
use crate::error::CaptureError;

/// One buffered segment of encoded output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub data: Vec<u8>,
    /// Container type of this segment, when the recorder tags it.
    pub mime: Option<String>,
}

impl Chunk {
    pub fn new(data: Vec<u8>, mime: Option<String>) -> Self {
        Chunk { data, mime }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecorderEvent {
    Chunk(Chunk),
    /// Stop acknowledgment; no more chunks follow.
    Stopped,
    Error(String),
}

pub trait Recorder: Send {
    /// Whether the recorder can produce `mime`.
    fn supports(&self, mime: &str) -> bool;

    /// Type the recorder is actually producing, once known.
    fn mime_type(&self) -> Option<String>;

    /// Begin a new recording.  `mime` of `None` means the platform default.
    fn start(&mut self, mime: Option<&str>, timeslice: Duration) -> Result<(), CaptureError>;

    /// Offer one record-surface frame.  Ignored when not recording.
    fn push_frame(&mut self, frame: FrameRef<'_>);

    /// Ask the recorder to flush and finish.  Non-blocking; completion is
    /// reported by [`RecorderEvent::Stopped`].
    fn request_stop(&mut self);

    /// Drain pending events without blocking.
    fn poll(&mut self) -> Vec<RecorderEvent>;

    /// Drop any in-progress recording and free held resources.
    fn release(&mut self);
}

/// Stand-in for a missing recording device.  Every start fails, which keeps
/// the booth in photo-only mode.
#[derive(Debug, Default)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn supports(&self, _mime: &str) -> bool { false }
    fn mime_type(&self) -> Option<String> { None }

    fn start(&mut self, _mime: Option<&str>, _timeslice: Duration) -> Result<(), CaptureError> {
        Err(CaptureError::RecorderUnavailable("no recording device".into()))
    }

    fn push_frame(&mut self, _frame: FrameRef<'_>) {}
    fn request_stop(&mut self) {}
    fn poll(&mut self) -> Vec<RecorderEvent> { Vec::new() }
    fn release(&mut self) {}
}
