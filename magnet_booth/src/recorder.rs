//! Background Motion-JPEG recorder.
//!
//! Record-surface frames are copied to the encoder thread, JPEG-encoded and
//! concatenated.  Every timeslice the accumulated bytes go back to the
//! capture manager as one chunk; a stop flushes the remainder and then
//! acknowledges.
//!
//! The command queue is bounded.  While the encoder is behind, new frames are
//! dropped rather than queued, so a slow encoder lowers the clip's frame rate
//! instead of growing memory and delaying the stop acknowledgment.  Every
//! command and event carries the session it belongs to; output of an
//! abandoned session is discarded when it finally arrives.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use magnet_capture::{encode_jpeg, CaptureError, Chunk, FrameRef, NullRecorder, Recorder, RecorderEvent};
use tracing::{debug, info, warn};

pub const MJPEG_MIME: &str = "video/x-motion-jpeg";
const JPEG_QUALITY: u8 = 80;
/// Commands (frames included) the encoder may fall behind by.
const QUEUE_DEPTH: usize = 4;

// ════════════════════════════════════════════════════════════════════════════
// RecorderCommand: sent to the encoder thread
// ════════════════════════════════════════════════════════════════════════════

enum RecorderCommand {
    Start { session: u64, timeslice: Duration },
    Frame { session: u64, width: usize, height: usize, pixels: Vec<u32> },
    /// Flush the last chunk, then acknowledge.
    Stop { session: u64 },
    /// Drop the recording without flushing.
    Release,
    Quit,
}

/// An event stamped with the session that produced it.
struct Tagged {
    session: u64,
    event:   RecorderEvent,
}

// ════════════════════════════════════════════════════════════════════════════
// MjpegRecorder
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the encoder thread.
pub struct MjpegRecorder {
    cmd_tx:    SyncSender<RecorderCommand>,
    event_rx:  Receiver<Tagged>,
    /// Current session; bumped on every start and release.
    session:   u64,
    recording: bool,
    /// Frames dropped this session because the encoder was busy.
    dropped:   usize,
    handle:    Option<JoinHandle<()>>,
}

impl MjpegRecorder {
    pub fn spawn(quality: u8) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::sync_channel(QUEUE_DEPTH);
        let (event_tx, event_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("mjpeg-recorder".into())
            .spawn(move || encoder_thread(quality, cmd_rx, event_tx))?;
        Ok(MjpegRecorder {
            cmd_tx,
            event_rx,
            session: 0,
            recording: false,
            dropped: 0,
            handle: Some(handle),
        })
    }
}

impl Recorder for MjpegRecorder {
    fn supports(&self, mime: &str) -> bool {
        mime == MJPEG_MIME
    }

    fn mime_type(&self) -> Option<String> {
        Some(MJPEG_MIME.to_string())
    }

    fn start(&mut self, mime: Option<&str>, timeslice: Duration) -> Result<(), CaptureError> {
        if let Some(m) = mime {
            if !self.supports(m) {
                return Err(CaptureError::RecorderStart(format!("unsupported type {m}")));
            }
        }
        self.session += 1;
        while self.event_rx.try_recv().is_ok() {}
        self.cmd_tx
            .send(RecorderCommand::Start { session: self.session, timeslice })
            .map_err(|_| CaptureError::RecorderUnavailable("encoder thread stopped".into()))?;
        self.recording = true;
        self.dropped = 0;
        Ok(())
    }

    fn push_frame(&mut self, frame: FrameRef<'_>) {
        if !self.recording {
            return;
        }
        let cmd = RecorderCommand::Frame {
            session: self.session,
            width:   frame.width,
            height:  frame.height,
            pixels:  frame.pixels.to_vec(),
        };
        match self.cmd_tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                debug!(dropped = self.dropped, "encoder busy, frame dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.recording = false;
                warn!("encoder thread gone");
            }
        }
    }

    fn request_stop(&mut self) {
        if self.recording {
            self.recording = false;
            debug!(dropped = self.dropped, "stopping encoder");
            // Waits for at most one queued frame to drain.
            let _ = self.cmd_tx.send(RecorderCommand::Stop { session: self.session });
        }
    }

    fn poll(&mut self) -> Vec<RecorderEvent> {
        let mut out = Vec::new();
        while let Ok(tagged) = self.event_rx.try_recv() {
            if tagged.session == self.session {
                out.push(tagged.event);
            } else {
                debug!(session = tagged.session, "discarding output of an abandoned session");
            }
        }
        out
    }

    fn release(&mut self) {
        self.recording = false;
        self.session += 1;
        let _ = self.cmd_tx.send(RecorderCommand::Release);
    }
}

impl Drop for MjpegRecorder {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(RecorderCommand::Quit);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// open_recorder: pick a working backend
// ════════════════════════════════════════════════════════════════════════════

/// The bundled encoder, or [`NullRecorder`] (photo-only) when recording is
/// disabled or the encoder thread cannot be started.
pub fn open_recorder(enabled: bool) -> Box<dyn Recorder> {
    if !enabled {
        info!("recording disabled, photo-only mode");
        return Box::new(NullRecorder);
    }
    match MjpegRecorder::spawn(JPEG_QUALITY) {
        Ok(r) => Box::new(r),
        Err(e) => {
            warn!(error = %e, "cannot start encoder, photo-only mode");
            Box::new(NullRecorder)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// encoder_thread: the actual loop
// ════════════════════════════════════════════════════════════════════════════

fn encoder_thread(quality: u8, cmd_rx: Receiver<RecorderCommand>, event_tx: mpsc::Sender<Tagged>) {
    // Session being recorded, if any.
    let mut current: Option<u64> = None;
    let mut timeslice   = Duration::from_secs(1);
    let mut slice_start = Instant::now();
    let mut buf: Vec<u8> = Vec::new();
    let mut frames      = 0usize;

    let emit = |session: u64, event: RecorderEvent| event_tx.send(Tagged { session, event }).is_ok();
    let chunk = |data: Vec<u8>| RecorderEvent::Chunk(Chunk::new(data, Some(MJPEG_MIME.to_string())));

    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(10)) {
            Ok(RecorderCommand::Start { session, timeslice: t }) => {
                current = Some(session);
                timeslice = t;
                slice_start = Instant::now();
                buf.clear();
                frames = 0;
                debug!(session, ?timeslice, "encoder started");
            }
            Ok(RecorderCommand::Frame { session, width, height, pixels }) => {
                if current != Some(session) {
                    continue;
                }
                match encode_jpeg(FrameRef::new(width, height, &pixels), quality) {
                    Ok(jpeg) => {
                        buf.extend_from_slice(&jpeg);
                        frames += 1;
                    }
                    Err(e) => {
                        current = None;
                        buf.clear();
                        emit(session, RecorderEvent::Error(e.to_string()));
                        continue;
                    }
                }
            }
            Ok(RecorderCommand::Stop { session }) => {
                if current == Some(session) {
                    current = None;
                    if !buf.is_empty() {
                        emit(session, chunk(std::mem::take(&mut buf)));
                    }
                    debug!(session, frames, "encoder stopped");
                    emit(session, RecorderEvent::Stopped);
                }
            }
            Ok(RecorderCommand::Release) => {
                current = None;
                buf.clear();
            }
            Ok(RecorderCommand::Quit) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(session) = current {
            if !buf.is_empty() && slice_start.elapsed() >= timeslice {
                if !emit(session, chunk(std::mem::take(&mut buf))) {
                    return;
                }
                slice_start = Instant::now();
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
