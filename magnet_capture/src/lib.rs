//! # magnet_capture
//!
//! Everything that turns the booth's record surface into something a user can
//! keep.
//!
//! * [`PressTracker`] tells a tap (photo) from a long press (clip).
//! * [`CaptureManager`] drives one recording session through
//!   `Idle → Recording → Stopping → Completed | Failed`, enforcing the hard
//!   recording cap and retrying when the recorder's buffer is still empty.
//! * [`Pipeline`] hands a finished [`CaptureArtifact`] to an [`Uploader`] and
//!   a [`Processor`] on a worker thread, one job at a time.
//!
//! The press tracker and the capture manager never sleep or read the clock:
//! every time-dependent call takes `now: Instant` (and wall-clock stamps as
//! Unix milliseconds), so the render loop owns time.

pub mod encode;
pub mod error;
pub mod manager;
pub mod mime;
pub mod pipeline;
pub mod press;
pub mod recorder;
pub mod session;

pub use encode::{encode_jpeg, encode_png, FrameRef};
pub use error::CaptureError;
pub use manager::{CaptureConfig, CaptureEvent, CaptureManager};
pub use mime::{extension_for, negotiate, MIME_PRIORITY};
pub use pipeline::{
    DirectoryUploader, PassthroughProcessor, Pipeline, PipelineEvent, Processor,
    ProgressEstimate, UploadReceipt, Uploader,
};
pub use press::{Press, PressTracker};
pub use recorder::{Chunk, NullRecorder, Recorder, RecorderEvent};
pub use session::{ArtifactKind, CaptureArtifact, RecordingSession, SessionState};
