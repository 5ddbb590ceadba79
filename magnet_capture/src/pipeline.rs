//! Upload and remote processing of finished artifacts.
//!
//! A single worker thread takes one job at a time: upload the artifact, then
//! ask the processor for the final URL.  Closing the preview cancels the job;
//! the token is checked between the two steps and any late result of a
//! cancelled job is dropped.

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::session::CaptureArtifact;

// ════════════════════════════════════════════════════════════════════════════
// Collaborators
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Remote object key.
    pub key: String,
    pub url: String,
}

pub trait Uploader: Send {
    fn upload(&mut self, data: &[u8], name: &str, mime: &str) -> Result<UploadReceipt, CaptureError>;
}

/// Turns an uploaded object into its final, shareable form.
pub trait Processor: Send {
    fn process(&mut self, receipt: &UploadReceipt) -> Result<String, CaptureError>;
}

/// Stores artifacts under a local directory, keyed by their suggested name.
#[derive(Clone, Debug)]
pub struct DirectoryUploader {
    root: PathBuf,
}

impl DirectoryUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryUploader { root: root.into() }
    }
}

impl Uploader for DirectoryUploader {
    fn upload(&mut self, data: &[u8], name: &str, mime: &str) -> Result<UploadReceipt, CaptureError> {
        if name.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(CaptureError::Upload(format!("invalid object key {name:?}")));
        }
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        debug!(path = %path.display(), mime, bytes = data.len(), "artifact stored");
        Ok(UploadReceipt {
            key: name.to_string(),
            url: format!("file://{}", path.display()),
        })
    }
}

/// Hands the uploaded object back unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughProcessor;

impl Processor for PassthroughProcessor {
    fn process(&mut self, receipt: &UploadReceipt) -> Result<String, CaptureError> {
        Ok(receipt.url.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ProgressEstimate
// ════════════════════════════════════════════════════════════════════════════

/// Time-based progress for a job whose real progress is unknown.
#[derive(Clone, Copy, Debug)]
pub struct ProgressEstimate {
    started:  Instant,
    expected: Duration,
    done:     bool,
}

impl ProgressEstimate {
    pub fn new(started: Instant, expected: Duration) -> Self {
        ProgressEstimate { started, expected, done: false }
    }

    pub fn finish(&mut self) {
        self.done = true;
    }

    /// `min(elapsed / expected, 1.0)`, or 1.0 once finished.
    pub fn fraction(&self, now: Instant) -> f32 {
        if self.done || self.expected.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started).as_secs_f32();
        (elapsed / self.expected.as_secs_f32()).min(1.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Pipeline
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    Uploaded(UploadReceipt),
    /// Final URL of the processed artifact.
    Processed(String),
    Failed(String),
    Cancelled,
}

impl PipelineEvent {
    fn is_terminal(&self) -> bool {
        !matches!(self, PipelineEvent::Uploaded(_))
    }
}

enum PipelineCommand {
    Run { job: u64, artifact: CaptureArtifact, cancel: CancellationToken },
    Quit,
}

struct Envelope {
    job:   u64,
    event: PipelineEvent,
}

struct InFlight {
    job:      u64,
    cancel:   CancellationToken,
    progress: ProgressEstimate,
}

/// Handle to the upload worker.
pub struct Pipeline {
    cmd_tx:    Sender<PipelineCommand>,
    event_rx:  Receiver<Envelope>,
    worker:    Option<JoinHandle<()>>,
    in_flight: Option<InFlight>,
    /// Estimate of the last processed job, pinned at 1.0 until the next
    /// submit or cancel.
    finished:  Option<ProgressEstimate>,
    next_job:  u64,
    estimate:  Duration,
}

impl Pipeline {
    /// Spawn the worker.  `estimate` is the expected processing time used for
    /// progress feedback.
    pub fn spawn(uploader: Box<dyn Uploader>, processor: Box<dyn Processor>, estimate: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PipelineCommand>();
        let (event_tx, event_rx) = mpsc::channel::<Envelope>();
        let worker = thread::spawn(move || pipeline_thread(uploader, processor, cmd_rx, event_tx));
        Pipeline {
            cmd_tx,
            event_rx,
            worker: Some(worker),
            in_flight: None,
            finished: None,
            next_job: 0,
            estimate,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Queue an artifact.  Only one job may be in flight.
    pub fn submit(&mut self, artifact: CaptureArtifact, now: Instant) -> Result<(), CaptureError> {
        if self.in_flight.is_some() {
            return Err(CaptureError::PipelineBusy);
        }
        self.next_job += 1;
        let job = self.next_job;
        let cancel = CancellationToken::new();
        self.cmd_tx
            .send(PipelineCommand::Run { job, artifact, cancel: cancel.clone() })
            .map_err(|_| CaptureError::Upload("upload worker is gone".into()))?;
        self.finished = None;
        self.in_flight = Some(InFlight {
            job,
            cancel,
            progress: ProgressEstimate::new(now, self.estimate),
        });
        Ok(())
    }

    /// Abandon the current job.  Its late results are discarded.
    pub fn cancel(&mut self) -> bool {
        self.finished = None;
        match self.in_flight.take() {
            Some(flight) => {
                flight.cancel.cancel();
                info!(job = flight.job, "upload cancelled");
                true
            }
            None => false,
        }
    }

    /// Estimated progress of the current job, or 1.0 once it has been
    /// processed.
    pub fn progress(&self, now: Instant) -> Option<f32> {
        self.in_flight
            .as_ref()
            .map(|f| f.progress)
            .or(self.finished)
            .map(|p| p.fraction(now))
    }

    /// Drain pending events (non-blocking).
    pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
        let mut out = Vec::new();
        while let Ok(envelope) = self.event_rx.try_recv() {
            if let Some(event) = self.accept(envelope) {
                out.push(event);
            }
        }
        out
    }

    /// Block up to `timeout` for the next event of the current job.
    pub fn next_event(&mut self, timeout: Duration) -> Option<PipelineEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.event_rx.recv_timeout(left) {
                Ok(envelope) => {
                    if let Some(event) = self.accept(envelope) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn accept(&mut self, envelope: Envelope) -> Option<PipelineEvent> {
        let current = self.in_flight.as_ref().map(|f| f.job);
        if current != Some(envelope.job) {
            debug!(job = envelope.job, "dropping result of abandoned job");
            return None;
        }
        if envelope.event.is_terminal() {
            if let Some(flight) = self.in_flight.take() {
                if matches!(envelope.event, PipelineEvent::Processed(_)) {
                    let mut progress = flight.progress;
                    progress.finish();
                    self.finished = Some(progress);
                }
            }
        }
        Some(envelope.event)
    }

    /// Stop the worker and wait for it.
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        self.cancel();
        let _ = self.cmd_tx.send(PipelineCommand::Quit);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn pipeline_thread(
    mut uploader:  Box<dyn Uploader>,
    mut processor: Box<dyn Processor>,
    cmd_rx:        Receiver<PipelineCommand>,
    event_tx:      Sender<Envelope>,
) {
    while let Ok(cmd) = cmd_rx.recv() {
        let (job, artifact, cancel) = match cmd {
            PipelineCommand::Run { job, artifact, cancel } => (job, artifact, cancel),
            PipelineCommand::Quit => return,
        };
        let send = |event: PipelineEvent| {
            let _ = event_tx.send(Envelope { job, event });
        };

        if cancel.is_cancelled() {
            send(PipelineEvent::Cancelled);
            continue;
        }

        let name = artifact.suggested_name();
        let receipt = match uploader.upload(&artifact.data, &name, &artifact.mime) {
            Ok(r) => r,
            Err(e) => {
                warn!(job, error = %e, "upload failed");
                send(PipelineEvent::Failed(e.to_string()));
                continue;
            }
        };
        info!(job, key = %receipt.key, "uploaded");
        send(PipelineEvent::Uploaded(receipt.clone()));

        if cancel.is_cancelled() {
            send(PipelineEvent::Cancelled);
            continue;
        }

        let processed = processor.process(&receipt).and_then(|url| {
            if url.trim().is_empty() {
                Err(CaptureError::Processing(format!("no URL returned for {}", receipt.key)))
            } else {
                Ok(url)
            }
        });
        match processed {
            Ok(url) => {
                info!(job, %url, "processed");
                send(PipelineEvent::Processed(url));
            }
            Err(e) => {
                warn!(job, error = %e, "processing failed");
                send(PipelineEvent::Failed(e.to_string()));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    const WAIT: Duration = Duration::from_secs(5);

    struct FailingUploader;
    impl Uploader for FailingUploader {
        fn upload(&mut self, _: &[u8], _: &str, _: &str) -> Result<UploadReceipt, CaptureError> {
            Err(CaptureError::Upload("offline".into()))
        }
    }

    /// Blocks each upload until the test opens the gate.
    struct GatedUploader(Arc<Mutex<Receiver<()>>>);
    impl Uploader for GatedUploader {
        fn upload(&mut self, _: &[u8], name: &str, _: &str) -> Result<UploadReceipt, CaptureError> {
            let _ = self.0.lock().unwrap().recv();
            Ok(UploadReceipt { key: name.into(), url: format!("mem://{name}") })
        }
    }

    struct FlagProcessor(Arc<AtomicBool>);
    impl Processor for FlagProcessor {
        fn process(&mut self, r: &UploadReceipt) -> Result<String, CaptureError> {
            self.0.store(true, Ordering::SeqCst);
            Ok(r.url.clone())
        }
    }

    #[test]
    fn directory_upload_then_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Pipeline::spawn(
            Box::new(DirectoryUploader::new(dir.path())),
            Box::new(PassthroughProcessor),
            Duration::from_secs(15),
        );
        p.submit(CaptureArtifact::photo(vec![1, 2, 3], 77), Instant::now()).unwrap();

        let uploaded = p.next_event(WAIT).unwrap();
        match uploaded {
            PipelineEvent::Uploaded(r) => assert_eq!(r.key, "photos/photo-77.png"),
            other => panic!("unexpected {other:?}"),
        }
        let processed = p.next_event(WAIT).unwrap();
        assert!(matches!(processed, PipelineEvent::Processed(ref url) if url.starts_with("file://")));
        assert_eq!(fs::read(dir.path().join("photos/photo-77.png")).unwrap(), vec![1, 2, 3]);
        assert!(!p.is_busy());
        p.shutdown();
    }

    #[test]
    fn progress_reads_full_once_processed() {
        let (gate_tx, gate_rx) = mpsc::channel();
        let mut p = Pipeline::spawn(
            Box::new(GatedUploader(Arc::new(Mutex::new(gate_rx)))),
            Box::new(PassthroughProcessor),
            Duration::from_secs(15),
        );
        let t0 = Instant::now();
        assert_eq!(p.progress(t0), None);
        p.submit(CaptureArtifact::photo(vec![1], 1), t0).unwrap();
        let early = p.progress(t0 + Duration::from_secs(3)).unwrap();
        assert!(early > 0.0 && early < 1.0);

        gate_tx.send(()).unwrap();
        assert!(matches!(p.next_event(WAIT), Some(PipelineEvent::Uploaded(_))));
        assert!(matches!(p.next_event(WAIT), Some(PipelineEvent::Processed(_))));
        assert_eq!(p.progress(t0 + Duration::from_secs(3)), Some(1.0));

        assert!(!p.cancel());
        assert_eq!(p.progress(t0), None);
    }

    struct BlankProcessor;
    impl Processor for BlankProcessor {
        fn process(&mut self, _: &UploadReceipt) -> Result<String, CaptureError> {
            Ok(String::new())
        }
    }

    #[test]
    fn processor_without_url_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Pipeline::spawn(
            Box::new(DirectoryUploader::new(dir.path())),
            Box::new(BlankProcessor),
            Duration::from_secs(15),
        );
        p.submit(CaptureArtifact::photo(vec![1], 3), Instant::now()).unwrap();
        assert!(matches!(p.next_event(WAIT), Some(PipelineEvent::Uploaded(_))));
        assert!(matches!(
            p.next_event(WAIT),
            Some(PipelineEvent::Failed(msg)) if msg.starts_with("processing failed")
        ));
        assert_eq!(p.progress(Instant::now()), None);
    }

    #[test]
    fn upload_failure_is_reported() {
        let mut p = Pipeline::spawn(Box::new(FailingUploader), Box::new(PassthroughProcessor), Duration::from_secs(15));
        p.submit(CaptureArtifact::photo(vec![1], 1), Instant::now()).unwrap();
        assert!(matches!(p.next_event(WAIT), Some(PipelineEvent::Failed(msg)) if msg.contains("offline")));
        assert!(!p.is_busy());
        assert_eq!(p.progress(Instant::now()), None);
    }

    #[test]
    fn second_submit_while_busy_is_refused() {
        let (gate_tx, gate_rx) = mpsc::channel();
        let mut p = Pipeline::spawn(
            Box::new(GatedUploader(Arc::new(Mutex::new(gate_rx)))),
            Box::new(PassthroughProcessor),
            Duration::from_secs(15),
        );
        let now = Instant::now();
        p.submit(CaptureArtifact::photo(vec![1], 1), now).unwrap();
        assert!(matches!(p.submit(CaptureArtifact::photo(vec![2], 2), now), Err(CaptureError::PipelineBusy)));
        gate_tx.send(()).unwrap();
        assert!(matches!(p.next_event(WAIT), Some(PipelineEvent::Uploaded(_))));
        assert!(matches!(p.next_event(WAIT), Some(PipelineEvent::Processed(_))));
    }

    #[test]
    fn cancel_between_upload_and_processing_skips_processing() {
        let (gate_tx, gate_rx) = mpsc::channel();
        let processed = Arc::new(AtomicBool::new(false));
        let mut p = Pipeline::spawn(
            Box::new(GatedUploader(Arc::new(Mutex::new(gate_rx)))),
            Box::new(FlagProcessor(processed.clone())),
            Duration::from_secs(15),
        );
        p.submit(CaptureArtifact::photo(vec![1], 1), Instant::now()).unwrap();
        assert!(p.cancel());
        gate_tx.send(()).unwrap();
        assert_eq!(p.next_event(Duration::from_millis(300)), None);
        p.shutdown();
        assert!(!processed.load(Ordering::SeqCst));
    }

    #[test]
    fn progress_is_time_based_and_capped() {
        let t0 = Instant::now();
        let mut est = ProgressEstimate::new(t0, Duration::from_secs(15));
        assert!((est.fraction(t0 + Duration::from_millis(7500)) - 0.5).abs() < 1e-3);
        assert_eq!(est.fraction(t0 + Duration::from_secs(40)), 1.0);
        est = ProgressEstimate::new(t0, Duration::from_secs(15));
        est.finish();
        assert_eq!(est.fraction(t0), 1.0);
    }

    #[test]
    fn directory_uploader_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut up = DirectoryUploader::new(dir.path());
        assert!(up.upload(&[1], "../evil", "image/png").is_err());
    }
}
