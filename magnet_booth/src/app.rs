//! Top-level application state machine.
//!
//! `AppState` owns the camera, the magnet board, both render surfaces, the
//! capture manager and the upload pipeline.  It processes [`InputEvent`]s and
//! advances everything once per render tick.

use std::sync::mpsc;
use std::time::Instant;

use rand::Rng;
use tracing::{debug, info, warn};

use magnet_board::{BoardEvent, HandPose, MagnetBoard};
use magnet_capture::{
    CaptureArtifact, CaptureError, CaptureEvent, CaptureManager, DirectoryUploader,
    PassthroughProcessor, Pipeline, PipelineEvent, Press, PressTracker, Recorder,
};
use magnet_space::{CanvasTransform, FacingMode, HandFrame};

use crate::camera::{CaptureDevice, FacingController, SyntheticCamera, VideoFrame};
use crate::compositor::Compositor;
use crate::config::AppConfig;
use crate::error::BoothError;
use crate::landmarks::{DetectionSchedule, Detector};
use crate::recorder::open_recorder;
use crate::sprite::Sprite;
use crate::surface::Surface;
use crate::window::BoothWindow;

// ════════════════════════════════════════════════════════════════════════════
// Inputs and outputs
// ════════════════════════════════════════════════════════════════════════════

/// User input, already translated from window keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    ShutterDown,
    ShutterUp,
    SwitchCamera,
    ToggleTracking,
    ClosePreview,
    Quit,
}

/// The post-capture preview panel.
#[derive(Clone, Debug, PartialEq)]
pub enum PreviewState {
    Hidden,
    /// Uploading and processing `name`.
    Processing { name: String },
    Ready { url: String },
    Failed(String),
}

/// Everything the window shows outside the display surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Hud {
    pub status:         String,
    pub recording_secs: Option<u32>,
    pub progress:       Option<f32>,
    pub tracking:       bool,
    pub facing:         FacingMode,
    pub preview:        PreviewState,
}

// ════════════════════════════════════════════════════════════════════════════
// Construction parts
// ════════════════════════════════════════════════════════════════════════════

/// External collaborators, built by [`run`] or by tests.
pub struct Devices {
    pub camera:   Box<dyn CaptureDevice>,
    pub recorder: Box<dyn Recorder>,
    /// `None` runs without hand tracking.
    pub detector: Option<Detector>,
    pub pipeline: Pipeline,
}

/// Sprites for each configured magnet, plus the optional logo.
pub struct Artwork {
    pub magnets: Vec<Sprite>,
    pub logo:    Option<Sprite>,
}

impl Artwork {
    /// Load configured images.  A file that fails to load is replaced by a
    /// badge (magnets) or dropped (logo); neither stops the booth.
    pub fn load(config: &AppConfig) -> Self {
        let magnets = config
            .magnet_entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| match &entry.image {
                Some(path) => Sprite::load(path).unwrap_or_else(|e| {
                    warn!(error = %e, magnet = %entry.spec.name, "using badge");
                    Sprite::badge(i)
                }),
                None => Sprite::badge(i),
            })
            .collect();
        let logo = config.logo.path.as_ref().and_then(|path| match Sprite::load(path) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "logo skipped");
                None
            }
        });
        Artwork { magnets, logo }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    config: AppConfig,

    // ── camera ───────────────────────────────────────────────────────────
    camera:       Box<dyn CaptureDevice>,
    facing:       FacingController,
    transform:    Option<CanvasTransform>,
    latest_video: Option<VideoFrame>,

    // ── tracking ─────────────────────────────────────────────────────────
    detector:    Option<Detector>,
    schedule:    DetectionSchedule,
    tracking:    bool,
    latest_hand: Option<HandFrame>,
    hand_pose:   Option<HandPose>,

    // ── scene ────────────────────────────────────────────────────────────
    board:      MagnetBoard,
    compositor: Compositor,

    // ── capture ──────────────────────────────────────────────────────────
    press:             PressTracker,
    capture:           CaptureManager,
    last_record_frame: Option<Instant>,
    pipeline:          Pipeline,
    preview:           PreviewState,

    status:  String,
    tick_no: u64,
}

impl AppState {
    pub fn new<R: Rng>(config: AppConfig, devices: Devices, artwork: Artwork, rng: &mut R) -> Self {
        let canvas = config.canvas();
        let specs: Vec<_> = config.magnet_entries().into_iter().map(|e| e.spec).collect();
        let sizes: Vec<_> = artwork.magnets.iter().map(Sprite::size).collect();
        let board = MagnetBoard::from_specs(&specs, &sizes, canvas, config.board, rng);
        let compositor = Compositor::new(
            canvas.w as usize,
            canvas.h as usize,
            artwork.magnets,
            artwork.logo,
            config.logo.clone(),
        );

        let facing = FacingController::new(devices.camera.facing());
        let transform = CanvasTransform::new(devices.camera.video_size(), canvas, facing.facing());
        let tracking = config.tracking.enabled && devices.detector.is_some();

        AppState {
            schedule: DetectionSchedule::from_config(&config.tracking),
            press: PressTracker::new(config.capture.long_press()),
            capture: CaptureManager::new(devices.recorder, config.capture.clone()),
            camera: devices.camera,
            facing,
            transform,
            latest_video: None,
            detector: devices.detector,
            tracking,
            latest_hand: None,
            hand_pose: None,
            board,
            compositor,
            last_record_frame: None,
            pipeline: devices.pipeline,
            preview: PreviewState::Hidden,
            status: String::from("Ready: tap Space for a photo, hold to record"),
            tick_no: 0,
            config,
        }
    }

    // ── process one InputEvent ───────────────────────────────────────────

    /// Returns `false` when the app should quit.
    pub fn handle_input(&mut self, event: InputEvent, now: Instant) -> bool {
        match event {
            InputEvent::ShutterDown => {
                if self.preview != PreviewState::Hidden {
                    self.status = "Close the preview first (Esc)".to_string();
                } else {
                    self.press.press(now);
                }
            }

            InputEvent::ShutterUp => match self.press.release() {
                Some(Press::Tap) => self.take_photo(now),
                Some(Press::LongEnd) => {
                    if let Err(e) = self.capture.stop_recording(now) {
                        debug!(error = %e, "release without a running clip");
                    }
                }
                _ => {}
            },

            InputEvent::SwitchCamera => self.switch_camera(),

            InputEvent::ToggleTracking => self.set_tracking(!self.tracking),

            InputEvent::ClosePreview => {
                self.pipeline.cancel();
                self.capture.cancel();
                self.press.cancel();
                self.preview = PreviewState::Hidden;
                self.status = "Preview closed".to_string();
            }

            InputEvent::Quit => return false,
        }
        true
    }

    fn switch_camera(&mut self) {
        if self.capture.state().is_active() {
            self.status = "Cannot switch camera while recording".to_string();
            return;
        }
        match self.facing.switch(self.camera.as_mut()) {
            Ok(facing) => {
                self.transform = CanvasTransform::new(self.camera.video_size(), self.config.canvas(), facing);
                self.latest_video = None;
                self.latest_hand = None;
                self.hand_pose = None;
                self.status = format!("Switched to {} camera", facing.name());
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    /// Turning tracking off forgets the hand, which also drops any held
    /// magnet.
    pub fn set_tracking(&mut self, enabled: bool) {
        if enabled && self.detector.is_none() {
            self.status = "Hand tracking unavailable".to_string();
            return;
        }
        self.tracking = enabled;
        if enabled {
            if let Some(d) = self.detector.as_mut() {
                d.reset();
            }
        } else {
            self.latest_hand = None;
            self.hand_pose = None;
            for event in self.board.release_all() {
                debug!(?event, "released on tracking off");
            }
        }
        info!(enabled, "hand tracking toggled");
        self.status = format!("Hand tracking {}", if enabled { "on" } else { "off" });
    }

    fn take_photo(&mut self, now: Instant) {
        let millis = chrono::Utc::now().timestamp_millis();
        match self.capture.snapshot(self.compositor.display().frame(), millis) {
            Ok(artifact) => self.submit(artifact, now),
            Err(e) => self.status = format!("Photo failed: {e}"),
        }
    }

    fn start_recording(&mut self, now: Instant) {
        let millis = chrono::Utc::now().timestamp_millis();
        match self.capture.start_recording(now, millis) {
            Ok(_) => {
                self.last_record_frame = None;
                self.status = "Recording".to_string();
            }
            Err(e @ CaptureError::RecorderUnavailable(_)) => {
                self.status = format!("Photo-only mode: {e}");
            }
            Err(e) => self.status = format!("Recording failed: {e}"),
        }
    }

    fn submit(&mut self, artifact: CaptureArtifact, now: Instant) {
        let name = artifact.suggested_name();
        match self.pipeline.submit(artifact, now) {
            Ok(()) => {
                self.status = format!("Uploading {name}");
                self.preview = PreviewState::Processing { name };
            }
            Err(e) => {
                self.status = e.to_string();
                self.preview = PreviewState::Failed(e.to_string());
            }
        }
    }

    // ── Per-frame tick ───────────────────────────────────────────────────

    pub fn tick(&mut self, now: Instant) {
        self.tick_no += 1;
        let tick = self.tick_no;

        if let Some(frame) = self.camera.next_frame() {
            self.latest_video = Some(frame);
        }
        let recording = self.capture.is_recording();

        // Detection: collect what finished, then maybe ask again.
        if self.tracking {
            if let Some(detector) = self.detector.as_mut() {
                if let Some(result) = detector.poll(now) {
                    self.latest_hand = result;
                }
                if self.schedule.detect_due(tick, recording) {
                    if let Some(video) = &self.latest_video {
                        detector.request(video.downscale(self.config.tracking.detect_width), now);
                    }
                }
            }
        }

        if self.schedule.board_due(tick, recording) {
            self.hand_pose = match (&self.latest_hand, &self.transform) {
                (Some(hand), Some(t)) if self.tracking => HandPose::from_frame(hand, t),
                _ => None,
            };
            for event in self.board.step(self.hand_pose.as_ref(), recording) {
                self.log_board_event(event);
            }
        }

        if let Some(Press::LongStart) = self.press.poll(now) {
            self.start_recording(now);
        }

        for event in self.capture.tick(now) {
            self.handle_capture_event(event, now);
        }

        let facing = self.facing.facing();
        let overlay = if self.tracking { self.hand_pose.as_ref() } else { None };
        self.compositor.render_display(self.latest_video.as_ref(), facing, &self.board, overlay);

        if self.capture.is_recording() {
            self.compositor.render_record(self.latest_video.as_ref(), facing, &self.board);
            let due = self
                .last_record_frame
                .map_or(true, |t| now.duration_since(t) >= self.config.capture.frame_interval());
            if due {
                self.capture.push_frame(self.compositor.record().frame());
                self.last_record_frame = Some(now);
            }
        }

        for event in self.pipeline.drain_events() {
            self.handle_pipeline_event(event);
        }
    }

    fn log_board_event(&self, event: BoardEvent) {
        let name = |id| self.board.magnet(id).map(|m| m.name().to_string()).unwrap_or_default();
        match event {
            BoardEvent::Grabbed(id)  => debug!(magnet = %name(id), "grabbed"),
            BoardEvent::Released(id) => debug!(magnet = %name(id), "released"),
            BoardEvent::Blocked(id)  => debug!(magnet = %name(id), "move blocked"),
        }
    }

    fn handle_capture_event(&mut self, event: CaptureEvent, now: Instant) {
        match event {
            CaptureEvent::Elapsed(secs) => {
                self.status = format!("Recording {secs}s / {}s", self.config.capture.max_secs);
            }
            CaptureEvent::AutoStopped => {
                // The shutter may still be held; its release must not stop
                // the next clip.
                self.press.cancel();
                self.status = "Time limit reached".to_string();
            }
            CaptureEvent::Retrying { attempt } => {
                self.status = format!("Finishing clip (attempt {attempt})");
            }
            CaptureEvent::Completed(artifact) => self.submit(artifact, now),
            CaptureEvent::Failed(e) => {
                self.status = format!("Recording failed: {e}");
                self.preview = PreviewState::Failed(e.to_string());
            }
        }
    }

    fn handle_pipeline_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Uploaded(receipt) => {
                self.status = format!("Uploaded {}, processing", receipt.key);
            }
            PipelineEvent::Processed(url) => {
                info!(%url, "artifact ready");
                self.status = "Ready".to_string();
                self.preview = PreviewState::Ready { url };
            }
            PipelineEvent::Failed(msg) => {
                self.status = format!("Upload failed: {msg}");
                self.preview = PreviewState::Failed(msg);
            }
            PipelineEvent::Cancelled => self.preview = PreviewState::Hidden,
        }
    }

    // ── Accessors for the render loop ────────────────────────────────────

    pub fn display(&self)        -> &Surface                 { self.compositor.display() }
    pub fn record(&self)         -> &Surface                 { self.compositor.record() }
    pub fn board(&self)          -> &MagnetBoard             { &self.board }
    pub fn status(&self)         -> &str                     { &self.status }
    pub fn preview(&self)        -> &PreviewState            { &self.preview }
    pub fn facing(&self)         -> FacingMode               { self.facing.facing() }
    pub fn transform(&self)      -> Option<&CanvasTransform> { self.transform.as_ref() }
    pub fn tracking_enabled(&self) -> bool                   { self.tracking }
    pub fn is_recording(&self)   -> bool                     { self.capture.is_recording() }
    pub fn capture(&self)        -> &CaptureManager          { &self.capture }

    pub fn hud(&self, now: Instant) -> Hud {
        Hud {
            status:         self.status.clone(),
            recording_secs: self.is_recording().then(|| self.capture.elapsed_seconds()),
            progress:       self.pipeline.progress(now),
            tracking:       self.tracking,
            facing:         self.facing.facing(),
            preview:        self.preview.clone(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the booth.
///
/// This is the entry point called from `main.rs`.  It opens the camera, the
/// recorder and the upload worker, picks a landmark source (pointer
/// simulation by default, hardware with `--features leap`), and drives the
/// input/tick/render loop until the window closes.
pub fn run(config: AppConfig) -> Result<(), BoothError> {
    let (sim_tx, sim_rx) = mpsc::channel();

    let detector = if config.tracking.enabled {
        #[cfg(feature = "leap")]
        let source = {
            drop(sim_rx);
            crate::landmarks::LeapLandmarkSource
        };
        #[cfg(not(feature = "leap"))]
        let source = crate::landmarks::SimLandmarkSource { rx: sim_rx };
        Some(crate::landmarks::spawn_landmark_source(source, config.tracking.throttle()))
    } else {
        None
    };

    let camera = match SyntheticCamera::new(config.camera.clone(), config.facing) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "falling back to the front camera");
            SyntheticCamera::new(config.camera.clone(), FacingMode::Front)?
        }
    };

    let devices = Devices {
        camera:   Box::new(camera),
        recorder: open_recorder(config.recording_enabled),
        detector,
        pipeline: Pipeline::spawn(
            Box::new(DirectoryUploader::new(config.output_dir.clone())),
            Box::new(PassthroughProcessor),
            config.processing_estimate(),
        ),
    };

    let artwork = Artwork::load(&config);
    let (w, h) = config.resolution.canvas();
    let mut app = AppState::new(config, devices, artwork, &mut rand::thread_rng());
    let mut window = BoothWindow::new(w, h, sim_tx)?;

    info!(width = w, height = h, "booth running");
    while window.is_open() {
        let now = Instant::now();
        for event in window.poll_input(app.transform()) {
            if !app.handle_input(event, now) {
                return Ok(());
            }
        }
        app.tick(now);
        window.present(app.display(), &app.hud(now));
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    use magnet_capture::{Chunk, FrameRef, NullRecorder, RecorderEvent};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::CameraConfig;
    use crate::landmarks::{spawn_landmark_source, SimHand, SimLandmarkSource};

    /// Synchronous recorder: one chunk per stop, acknowledged immediately.
    #[derive(Default)]
    struct Loopback {
        recording: bool,
        frames:    usize,
        pending:   Vec<RecorderEvent>,
    }

    impl Recorder for Loopback {
        fn supports(&self, _mime: &str) -> bool { false }
        fn mime_type(&self) -> Option<String> { Some("video/x-motion-jpeg".into()) }

        fn start(&mut self, _mime: Option<&str>, _timeslice: Duration) -> Result<(), CaptureError> {
            self.recording = true;
            self.frames = 0;
            Ok(())
        }

        fn push_frame(&mut self, _frame: FrameRef<'_>) {
            if self.recording {
                self.frames += 1;
            }
        }

        fn request_stop(&mut self) {
            if self.recording {
                self.recording = false;
                if self.frames > 0 {
                    self.pending.push(RecorderEvent::Chunk(Chunk::new(vec![7; self.frames], None)));
                }
                self.pending.push(RecorderEvent::Stopped);
            }
        }

        fn poll(&mut self) -> Vec<RecorderEvent> { std::mem::take(&mut self.pending) }

        fn release(&mut self) {
            self.recording = false;
            self.pending.clear();
        }
    }

    fn config(out: &std::path::Path, rear: bool) -> AppConfig {
        AppConfig {
            camera: CameraConfig { video_width: 32, video_height: 24, rear_available: rear, warmup_frames: 0 },
            output_dir: out.to_path_buf(),
            ..AppConfig::default()
        }
    }

    fn app_with(
        cfg: AppConfig,
        recorder: Box<dyn Recorder>,
        detector: Option<Detector>,
    ) -> AppState {
        let devices = Devices {
            camera: Box::new(SyntheticCamera::new(cfg.camera.clone(), cfg.facing).unwrap()),
            recorder,
            detector,
            pipeline: Pipeline::spawn(
                Box::new(DirectoryUploader::new(cfg.output_dir.clone())),
                Box::new(PassthroughProcessor),
                cfg.processing_estimate(),
            ),
        };
        let artwork = Artwork::load(&cfg);
        AppState::new(cfg, devices, artwork, &mut StdRng::seed_from_u64(7))
    }

    /// Tick with real time until `done` holds or two seconds pass.
    fn tick_until(app: &mut AppState, done: impl Fn(&AppState) -> bool) -> bool {
        for _ in 0..400 {
            app.tick(Instant::now());
            if done(app) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn tap_takes_a_photo_and_uploads_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), true), Box::new(Loopback::default()), None);
        let t0 = Instant::now();
        app.tick(t0);

        app.handle_input(InputEvent::ShutterDown, t0);
        app.handle_input(InputEvent::ShutterUp, t0 + Duration::from_millis(100));
        assert!(matches!(app.preview(), PreviewState::Processing { name } if name.starts_with("photos/photo-")));

        assert!(tick_until(&mut app, |a| matches!(a.preview(), PreviewState::Ready { .. })));
        assert_eq!(app.hud(Instant::now()).progress, Some(1.0));
        let photos: Vec<_> = std::fs::read_dir(dir.path().join("photos")).unwrap().collect();
        assert_eq!(photos.len(), 1);
    }

    #[test]
    fn hold_records_and_release_completes() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), true), Box::new(Loopback::default()), None);
        let t0 = Instant::now();
        let ms = |n| t0 + Duration::from_millis(n);

        app.handle_input(InputEvent::ShutterDown, t0);
        app.tick(ms(100));
        assert!(!app.is_recording());
        app.tick(ms(450));
        assert!(app.is_recording());
        assert!(app.hud(ms(450)).recording_secs.is_some());
        app.tick(ms(600));

        app.handle_input(InputEvent::ShutterUp, ms(1500));
        app.tick(ms(1500));
        assert!(!app.is_recording());
        app.tick(ms(1900));
        // The upload worker may already have finished within the same tick.
        let clip = match app.preview() {
            PreviewState::Processing { name } => name.clone(),
            PreviewState::Ready { url } => url.clone(),
            other => panic!("unexpected preview {other:?}"),
        };
        assert!(clip.ends_with(".mjpeg"), "{clip}");

        assert!(tick_until(&mut app, |a| matches!(a.preview(), PreviewState::Ready { .. })));
    }

    #[test]
    fn held_shutter_auto_stops_at_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), true), Box::new(Loopback::default()), None);
        let t0 = Instant::now();
        let ms = |n| t0 + Duration::from_millis(n);

        app.handle_input(InputEvent::ShutterDown, t0);
        app.tick(ms(400));
        assert!(app.is_recording());
        app.tick(ms(5_400));
        assert!(app.is_recording());
        app.tick(ms(10_400));
        assert!(!app.is_recording());
        assert_eq!(app.status(), "Time limit reached");

        // The late release is not a second stop or a photo.
        app.handle_input(InputEvent::ShutterUp, ms(11_000));
        assert!(app.capture().state().is_active());
    }

    #[test]
    fn photo_only_mode_refuses_to_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), true), Box::new(NullRecorder), None);
        let t0 = Instant::now();
        app.handle_input(InputEvent::ShutterDown, t0);
        app.tick(t0 + Duration::from_millis(500));
        assert!(!app.is_recording());
        assert!(app.status().starts_with("Photo-only mode"));
        app.handle_input(InputEvent::ShutterUp, t0 + Duration::from_millis(600));
        assert_eq!(*app.preview(), PreviewState::Hidden);
    }

    #[test]
    fn refused_camera_switch_keeps_facing() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), false), Box::new(NullRecorder), None);
        app.handle_input(InputEvent::SwitchCamera, Instant::now());
        assert_eq!(app.facing(), FacingMode::Front);
        assert!(app.status().contains("unavailable"));
    }

    #[test]
    fn camera_switch_updates_transform() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), true), Box::new(NullRecorder), None);
        app.handle_input(InputEvent::SwitchCamera, Instant::now());
        assert_eq!(app.facing(), FacingMode::Rear);
        assert_eq!(app.transform().map(|t| t.facing()), Some(FacingMode::Rear));
    }

    #[test]
    fn close_preview_discards_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), true), Box::new(Loopback::default()), None);
        let t0 = Instant::now();
        app.tick(t0);
        app.handle_input(InputEvent::ShutterDown, t0);
        app.handle_input(InputEvent::ShutterUp, t0);
        app.handle_input(InputEvent::ClosePreview, t0);
        assert_eq!(*app.preview(), PreviewState::Hidden);
        assert_eq!(app.hud(t0).progress, None);
    }

    #[test]
    fn shutter_ignored_while_preview_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), true), Box::new(Loopback::default()), None);
        let t0 = Instant::now();
        app.tick(t0);
        app.handle_input(InputEvent::ShutterDown, t0);
        app.handle_input(InputEvent::ShutterUp, t0);
        app.handle_input(InputEvent::ShutterDown, t0);
        app.tick(t0 + Duration::from_secs(1));
        assert!(!app.is_recording());
    }

    #[test]
    fn quit_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), true), Box::new(NullRecorder), None);
        assert!(!app.handle_input(InputEvent::Quit, Instant::now()));
    }

    #[test]
    fn simulated_pinch_grabs_and_tracking_off_releases() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), true);
        let (tx, rx) = mpsc::channel();
        let detector = spawn_landmark_source(SimLandmarkSource { rx }, cfg.tracking.throttle());
        let mut app = app_with(cfg, Box::new(NullRecorder), Some(detector));

        let target = app.board().magnets()[0].position();
        let lm = app.transform().unwrap().to_landmark(target).unwrap();
        tx.send(SimHand::Pose { thumb: lm, index: lm }).unwrap();

        assert!(tick_until(&mut app, |a| a.board().holder().is_some()));

        app.handle_input(InputEvent::ToggleTracking, Instant::now());
        assert!(!app.tracking_enabled());
        assert!(app.board().holder().is_none());
    }

    #[test]
    fn no_detector_means_no_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), true), Box::new(NullRecorder), None);
        assert!(!app.tracking_enabled());
        app.handle_input(InputEvent::ToggleTracking, Instant::now());
        assert!(!app.tracking_enabled());
    }

    #[test]
    fn record_surface_idle_until_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(config(dir.path(), true), Box::new(NullRecorder), None);
        app.tick(Instant::now());
        assert_eq!(app.display().width(), 720);
        assert_eq!(app.display().height(), 960);
        assert_eq!(app.record().pixel(0, 0), Some(crate::surface::BLACK));
    }
}
