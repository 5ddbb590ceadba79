//! Error types for capture, recording, and the upload pipeline.

use std::io;
use thiserror::Error;

/// Errors surfaced by a capture session or its collaborators.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No recorder could be opened; the booth is photo-only.
    #[error("recorder unavailable: {0}")]
    RecorderUnavailable(String),

    /// The recorder refused to start.
    #[error("recorder failed to start: {0}")]
    RecorderStart(String),

    /// The recorder reported an error mid-session.
    #[error("recorder error: {0}")]
    Recorder(String),

    /// A session is already running.
    #[error("a capture session is already active")]
    SessionActive,

    /// Stop was requested with no session running.
    #[error("no recording in progress")]
    NotRecording,

    /// The recorder never delivered any data, even after retrying.
    #[error("recording produced no data after {attempts} retries")]
    EmptyRecording { attempts: u32 },

    /// A pipeline job is still in flight.
    #[error("upload pipeline is busy")]
    PipelineBusy,

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("processing failed: {0}")]
    Processing(String),

    /// Frame dimensions do not match the pixel buffer.
    #[error("frame is {width}x{height} but buffer holds {len} pixels")]
    FrameSize { width: usize, height: usize, len: usize },

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
