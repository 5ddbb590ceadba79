//! Photo and clip lifecycle.
//!
//! ```text
//!   Idle ──start──► Recording ──release / cap──► Stopping ──chunks──► Completed
//!                       │                           │
//!                       └──────recorder error───────┴──still empty──► Failed
//! ```
//!
//! Stopping waits for the recorder's stop acknowledgment (or a timeout), lets
//! the buffer settle, and then checks for data, retrying a bounded number of
//! times before giving up.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::encode::{encode_png, FrameRef};
use crate::error::CaptureError;
use crate::mime::negotiate;
use crate::recorder::{Recorder, RecorderEvent};
use crate::session::{CaptureArtifact, RecordingSession, SessionState};

// ════════════════════════════════════════════════════════════════════════════
// CaptureConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Hard recording cap, enforced here rather than by the recorder.
    pub max_secs:            u32,
    pub long_press_ms:       u64,
    /// Wait after the stop acknowledgment before inspecting the buffer.
    pub settle_ms:           u64,
    pub retry_attempts:      u32,
    pub retry_interval_ms:   u64,
    /// Proceed without a stop acknowledgment after this long.
    pub stop_ack_timeout_ms: u64,
    /// How often the recorder emits a chunk.
    pub timeslice_ms:        u64,
    pub fps:                 u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            max_secs:            10,
            long_press_ms:       400,
            settle_ms:           300,
            retry_attempts:      5,
            retry_interval_ms:   500,
            stop_ack_timeout_ms: 2000,
            timeslice_ms:        1000,
            fps:                 30,
        }
    }
}

impl CaptureConfig {
    pub fn long_press(&self)       -> Duration { Duration::from_millis(self.long_press_ms) }
    pub fn settle(&self)           -> Duration { Duration::from_millis(self.settle_ms) }
    pub fn retry_interval(&self)   -> Duration { Duration::from_millis(self.retry_interval_ms) }
    pub fn stop_ack_timeout(&self) -> Duration { Duration::from_millis(self.stop_ack_timeout_ms) }
    pub fn timeslice(&self)        -> Duration { Duration::from_millis(self.timeslice_ms) }

    /// Interval between recorded frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CaptureEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum CaptureEvent {
    /// The whole-second counter advanced.
    Elapsed(u32),
    /// The recording cap was reached without a release.
    AutoStopped,
    /// The buffer was still empty; another check is scheduled.
    Retrying { attempt: u32 },
    Completed(CaptureArtifact),
    Failed(CaptureError),
}

// ════════════════════════════════════════════════════════════════════════════
// CaptureManager
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
struct StopProgress {
    requested_at: Instant,
    next_check:   Option<Instant>,
    retries:      u32,
}

pub struct CaptureManager {
    config:   CaptureConfig,
    recorder: Box<dyn Recorder>,
    session:  Option<RecordingSession>,
    stop:     Option<StopProgress>,
    /// Outcome of the most recent session once it has ended.
    last:     SessionState,
}

impl CaptureManager {
    pub fn new(recorder: Box<dyn Recorder>, config: CaptureConfig) -> Self {
        CaptureManager { config, recorder, session: None, stop: None, last: SessionState::Idle }
    }

    pub fn config(&self) -> &CaptureConfig { &self.config }

    pub fn state(&self) -> SessionState {
        self.session.as_ref().map(|s| s.state).unwrap_or(self.last)
    }

    pub fn is_recording(&self) -> bool {
        self.state() == SessionState::Recording
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.session.as_ref().map(|s| s.elapsed_seconds).unwrap_or(0)
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// Snapshot a surface as a PNG photo.  Refused while a clip is running.
    pub fn snapshot(&self, frame: FrameRef<'_>, taken_at_millis: i64) -> Result<CaptureArtifact, CaptureError> {
        if self.state().is_active() {
            return Err(CaptureError::SessionActive);
        }
        let png = encode_png(frame)?;
        info!(bytes = png.len(), "photo captured");
        Ok(CaptureArtifact::photo(png, taken_at_millis))
    }

    /// Start a clip.  `started_at_millis` is the wall-clock start used to name
    /// the artifact.
    pub fn start_recording(&mut self, now: Instant, started_at_millis: i64) -> Result<Option<String>, CaptureError> {
        if self.state().is_active() {
            return Err(CaptureError::SessionActive);
        }
        let recorder = &self.recorder;
        let mime = negotiate(|m| recorder.supports(m));
        if mime.is_none() {
            debug!("no preferred container supported, using recorder default");
        }
        self.recorder.start(mime, self.config.timeslice())?;
        let mime = mime.map(str::to_string);
        self.session = Some(RecordingSession::new(mime.clone(), now, started_at_millis));
        self.stop = None;
        info!(mime = ?mime, "recording started");
        Ok(mime)
    }

    /// Forward a record-surface frame to the recorder while recording.
    pub fn push_frame(&mut self, frame: FrameRef<'_>) {
        if self.is_recording() {
            self.recorder.push_frame(frame);
        }
    }

    /// User released the shutter.
    pub fn stop_recording(&mut self, now: Instant) -> Result<(), CaptureError> {
        if !self.is_recording() {
            return Err(CaptureError::NotRecording);
        }
        self.begin_stop(now);
        Ok(())
    }

    /// Abandon the session, discarding anything buffered.
    pub fn cancel(&mut self) -> bool {
        let had_session = self.session.take().is_some();
        self.stop = None;
        self.recorder.release();
        if had_session {
            info!("recording cancelled");
        }
        self.last = SessionState::Idle;
        had_session
    }

    /// Advance timers and drain the recorder.  Call once per render tick.
    pub fn tick(&mut self, now: Instant) -> Vec<CaptureEvent> {
        let mut events = Vec::new();
        if self.session.is_none() {
            return events;
        }

        for event in self.recorder.poll() {
            match event {
                RecorderEvent::Chunk(chunk) => {
                    if let Some(session) = self.session.as_mut() {
                        if session.push_chunk(chunk) {
                            debug!(chunks = session.chunks.len(), "chunk received");
                        }
                    }
                }
                RecorderEvent::Stopped => {
                    if self.is_recording() {
                        self.begin_stop(now);
                    }
                    if let Some(stop) = self.stop.as_mut() {
                        if stop.next_check.is_none() {
                            stop.next_check = Some(now + self.config.settle());
                        }
                    }
                }
                RecorderEvent::Error(msg) => {
                    warn!(error = %msg, "recorder error");
                    events.push(self.fail(CaptureError::Recorder(msg)));
                    return events;
                }
            }
        }

        match self.state() {
            SessionState::Recording => self.tick_recording(now, &mut events),
            SessionState::Stopping  => self.tick_stopping(now, &mut events),
            _ => {}
        }
        events
    }

    fn tick_recording(&mut self, now: Instant, events: &mut Vec<CaptureEvent>) {
        let Some(session) = self.session.as_mut() else { return };
        let secs = now.duration_since(session.started_at).as_secs() as u32;
        if secs > session.elapsed_seconds {
            session.elapsed_seconds = secs.min(self.config.max_secs);
            events.push(CaptureEvent::Elapsed(session.elapsed_seconds));
        }
        if secs >= self.config.max_secs {
            info!(secs, "recording cap reached");
            self.begin_stop(now);
            events.push(CaptureEvent::AutoStopped);
        }
    }

    fn tick_stopping(&mut self, now: Instant, events: &mut Vec<CaptureEvent>) {
        let Some(mut stop) = self.stop else { return };
        if stop.next_check.is_none()
            && now.duration_since(stop.requested_at) >= self.config.stop_ack_timeout()
        {
            warn!("no stop acknowledgment, inspecting buffer anyway");
            stop.next_check = Some(now);
        }
        let Some(due) = stop.next_check else {
            self.stop = Some(stop);
            return;
        };
        if now < due {
            self.stop = Some(stop);
            return;
        }

        let has_data = self.session.as_ref().map(|s| !s.chunks.is_empty()).unwrap_or(false);
        if has_data {
            events.push(self.complete());
        } else if stop.retries < self.config.retry_attempts {
            stop.retries += 1;
            stop.next_check = Some(now + self.config.retry_interval());
            warn!(attempt = stop.retries, of = self.config.retry_attempts, "buffer empty, waiting");
            events.push(CaptureEvent::Retrying { attempt: stop.retries });
            self.stop = Some(stop);
        } else {
            events.push(self.fail(CaptureError::EmptyRecording { attempts: stop.retries }));
        }
    }

    fn begin_stop(&mut self, now: Instant) {
        if let Some(session) = self.session.as_mut() {
            session.state = SessionState::Stopping;
        }
        self.stop = Some(StopProgress { requested_at: now, next_check: None, retries: 0 });
        self.recorder.request_stop();
        debug!("stop requested");
    }

    fn complete(&mut self) -> CaptureEvent {
        self.stop = None;
        let Some(session) = self.session.take() else {
            return self.fail(CaptureError::NotRecording);
        };
        let mime = self.recorder.mime_type().or_else(|| session.mime_type.clone());
        let artifact = session.assemble(mime, session.started_at_millis);
        self.recorder.release();
        self.last = SessionState::Completed;
        info!(
            chunks = session.chunks.len(),
            bytes = artifact.data.len(),
            mime = %artifact.mime,
            "recording completed"
        );
        CaptureEvent::Completed(artifact)
    }

    fn fail(&mut self, error: CaptureError) -> CaptureEvent {
        self.session = None;
        self.stop = None;
        self.recorder.release();
        self.last = SessionState::Failed;
        warn!(%error, "recording failed");
        CaptureEvent::Failed(error)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Chunk, NullRecorder};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Script {
        pending:   Vec<RecorderEvent>,
        frames:    usize,
        stops:     usize,
        releases:  usize,
        started:   Option<Option<String>>,
    }

    /// Recorder whose events are queued by the test.
    struct ScriptedRecorder(Arc<Mutex<Script>>);

    impl Recorder for ScriptedRecorder {
        fn supports(&self, mime: &str) -> bool { mime == "video/mp4" }
        fn mime_type(&self) -> Option<String> { None }
        fn start(&mut self, mime: Option<&str>, _timeslice: Duration) -> Result<(), CaptureError> {
            self.0.lock().unwrap().started = Some(mime.map(str::to_string));
            Ok(())
        }
        fn push_frame(&mut self, _frame: FrameRef<'_>) { self.0.lock().unwrap().frames += 1; }
        fn request_stop(&mut self) { self.0.lock().unwrap().stops += 1; }
        fn poll(&mut self) -> Vec<RecorderEvent> { std::mem::take(&mut self.0.lock().unwrap().pending) }
        fn release(&mut self) { self.0.lock().unwrap().releases += 1; }
    }

    fn setup() -> (CaptureManager, Arc<Mutex<Script>>, Instant) {
        let script = Arc::new(Mutex::new(Script::default()));
        let mgr = CaptureManager::new(Box::new(ScriptedRecorder(script.clone())), CaptureConfig::default());
        (mgr, script, Instant::now())
    }

    fn ms(n: u64) -> Duration { Duration::from_millis(n) }

    fn emit(script: &Arc<Mutex<Script>>, event: RecorderEvent) {
        script.lock().unwrap().pending.push(event);
    }

    fn chunk(bytes: &[u8]) -> RecorderEvent {
        RecorderEvent::Chunk(Chunk::new(bytes.to_vec(), None))
    }

    #[test]
    fn start_negotiates_the_preferred_type() {
        let (mut mgr, script, t0) = setup();
        assert_eq!(mgr.start_recording(t0, 1_000).unwrap().as_deref(), Some("video/mp4"));
        assert_eq!(script.lock().unwrap().started, Some(Some("video/mp4".into())));
        assert_eq!(mgr.state(), SessionState::Recording);
    }

    #[test]
    fn cap_stops_at_ten_seconds_without_release() {
        let (mut mgr, script, t0) = setup();
        mgr.start_recording(t0, 1_000).unwrap();
        for i in 1..=299u64 {
            mgr.tick(t0 + ms(i * 33));
        }
        assert_eq!(mgr.state(), SessionState::Recording);
        assert_eq!(mgr.elapsed_seconds(), 9);
        let events = mgr.tick(t0 + ms(10_000));
        assert!(events.iter().any(|e| matches!(e, CaptureEvent::AutoStopped)));
        assert_eq!(mgr.state(), SessionState::Stopping);
        assert_eq!(mgr.elapsed_seconds(), 10);
        assert_eq!(script.lock().unwrap().stops, 1);
    }

    #[test]
    fn release_then_ack_completes_after_settle() {
        let (mut mgr, script, t0) = setup();
        mgr.start_recording(t0, 1_000).unwrap();
        emit(&script, chunk(&[1, 2, 3]));
        mgr.tick(t0 + ms(1000));
        mgr.stop_recording(t0 + ms(1500)).unwrap();
        emit(&script, chunk(&[4]));
        emit(&script, RecorderEvent::Stopped);
        assert!(mgr.tick(t0 + ms(1600)).is_empty());
        let events = mgr.tick(t0 + ms(1900));
        match events.as_slice() {
            [CaptureEvent::Completed(a)] => {
                assert_eq!(a.data, vec![1, 2, 3, 4]);
                assert_eq!(a.mime, "video/mp4");
                assert_eq!(a.suggested_name(), "videos/recording-1000.mp4");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(mgr.state(), SessionState::Completed);
    }

    #[test]
    fn empty_buffer_retries_five_times_then_fails() {
        let (mut mgr, script, t0) = setup();
        mgr.start_recording(t0, 1_000).unwrap();
        mgr.stop_recording(t0).unwrap();
        emit(&script, RecorderEvent::Stopped);
        mgr.tick(t0);

        let mut retries = 0;
        let mut failed = None;
        for step in 0..=5u64 {
            for e in mgr.tick(t0 + ms(300 + step * 500)) {
                match e {
                    CaptureEvent::Retrying { .. } => retries += 1,
                    CaptureEvent::Failed(err) => failed = Some(err),
                    _ => {}
                }
            }
        }
        assert_eq!(retries, 5);
        assert!(matches!(failed, Some(CaptureError::EmptyRecording { attempts: 5 })));
        assert_eq!(mgr.state(), SessionState::Failed);
    }

    #[test]
    fn late_chunk_during_retry_completes() {
        let (mut mgr, script, t0) = setup();
        mgr.start_recording(t0, 1_000).unwrap();
        mgr.stop_recording(t0).unwrap();
        emit(&script, RecorderEvent::Stopped);
        mgr.tick(t0);
        mgr.tick(t0 + ms(300));
        mgr.tick(t0 + ms(800));
        emit(&script, chunk(&[9]));
        let events = mgr.tick(t0 + ms(1300));
        assert!(matches!(events.as_slice(), [CaptureEvent::Completed(_)]));
    }

    #[test]
    fn missing_ack_is_tolerated_after_timeout() {
        let (mut mgr, script, t0) = setup();
        mgr.start_recording(t0, 1_000).unwrap();
        emit(&script, chunk(&[1]));
        mgr.tick(t0 + ms(100));
        mgr.stop_recording(t0 + ms(200)).unwrap();
        assert!(mgr.tick(t0 + ms(2100)).is_empty());
        assert!(matches!(mgr.tick(t0 + ms(2200)).as_slice(), [CaptureEvent::Completed(_)]));
    }

    #[test]
    fn recorder_error_fails_the_session() {
        let (mut mgr, script, t0) = setup();
        mgr.start_recording(t0, 1_000).unwrap();
        emit(&script, RecorderEvent::Error("codec".into()));
        let events = mgr.tick(t0 + ms(10));
        assert!(matches!(events.as_slice(), [CaptureEvent::Failed(CaptureError::Recorder(_))]));
        assert_eq!(mgr.state(), SessionState::Failed);
        assert!(script.lock().unwrap().releases >= 1);
    }

    #[test]
    fn one_session_at_a_time() {
        let (mut mgr, _script, t0) = setup();
        mgr.start_recording(t0, 1_000).unwrap();
        assert!(matches!(mgr.start_recording(t0, 1_000), Err(CaptureError::SessionActive)));
        let px = [0u32; 4];
        assert!(matches!(mgr.snapshot(FrameRef::new(2, 2, &px), 0), Err(CaptureError::SessionActive)));
    }

    #[test]
    fn stop_without_recording_is_an_error() {
        let (mut mgr, _script, t0) = setup();
        assert!(matches!(mgr.stop_recording(t0), Err(CaptureError::NotRecording)));
    }

    #[test]
    fn frames_only_reach_the_recorder_while_recording() {
        let (mut mgr, script, t0) = setup();
        let px = [0u32; 4];
        mgr.push_frame(FrameRef::new(2, 2, &px));
        mgr.start_recording(t0, 1_000).unwrap();
        mgr.push_frame(FrameRef::new(2, 2, &px));
        mgr.stop_recording(t0).unwrap();
        mgr.push_frame(FrameRef::new(2, 2, &px));
        assert_eq!(script.lock().unwrap().frames, 1);
    }

    #[test]
    fn cancel_discards_and_releases() {
        let (mut mgr, script, t0) = setup();
        mgr.start_recording(t0, 1_000).unwrap();
        emit(&script, chunk(&[1]));
        mgr.tick(t0);
        assert!(mgr.cancel());
        assert_eq!(mgr.state(), SessionState::Idle);
        assert!(mgr.session().is_none());
        assert_eq!(script.lock().unwrap().releases, 1);
    }

    #[test]
    fn missing_device_keeps_photos_working() {
        let mut mgr = CaptureManager::new(Box::new(NullRecorder), CaptureConfig::default());
        assert!(matches!(
            mgr.start_recording(Instant::now(), 0),
            Err(CaptureError::RecorderUnavailable(_))
        ));
        assert_eq!(mgr.state(), SessionState::Idle);
        let px = [0x00FF_FFFFu32; 4];
        let photo = mgr.snapshot(FrameRef::new(2, 2, &px), 5).unwrap();
        assert_eq!(photo.suggested_name(), "photos/photo-5.png");
    }
}
