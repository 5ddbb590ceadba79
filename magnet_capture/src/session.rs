//! Session records and the artifacts they produce.

use std::time::Instant;

use crate::mime::{extension_for, FALLBACK_MIME};
use crate::recorder::Chunk;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Recording,
    Stopping,
    Completed,
    Failed,
}

impl SessionState {
    /// Recording or stopping.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Recording | SessionState::Stopping)
    }
}

/// Buffer and bookkeeping for one clip in progress.
#[derive(Clone, Debug)]
pub struct RecordingSession {
    pub chunks:          Vec<Chunk>,
    /// Negotiated type requested at start, if any.
    pub mime_type:       Option<String>,
    pub elapsed_seconds: u32,
    pub state:           SessionState,
    pub started_at:      Instant,
    /// Wall-clock start, Unix milliseconds; names the finished clip.
    pub started_at_millis: i64,
}

impl RecordingSession {
    pub fn new(mime_type: Option<String>, now: Instant, started_at_millis: i64) -> Self {
        RecordingSession {
            chunks: Vec::new(),
            mime_type,
            elapsed_seconds: 0,
            state: SessionState::Recording,
            started_at: now,
            started_at_millis,
        }
    }

    /// Empty segments are dropped.
    pub fn push_chunk(&mut self, chunk: Chunk) -> bool {
        if chunk.data.is_empty() {
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(|c| c.data.len()).sum()
    }

    /// Concatenate all chunks into one clip.
    ///
    /// The type is the recorder-reported one, else the first chunk's, else
    /// [`FALLBACK_MIME`].
    pub fn assemble(&self, recorder_mime: Option<String>, taken_at_millis: i64) -> CaptureArtifact {
        let mime = recorder_mime
            .or_else(|| self.chunks.first().and_then(|c| c.mime.clone()))
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        let mut data = Vec::with_capacity(self.total_bytes());
        for chunk in &self.chunks {
            data.extend_from_slice(&chunk.data);
        }
        CaptureArtifact { kind: ArtifactKind::Video, mime, data, taken_at_millis }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Photo,
    Video,
}

/// A finished photo or clip, ready for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureArtifact {
    pub kind:            ArtifactKind,
    pub mime:            String,
    pub data:            Vec<u8>,
    /// Unix time in milliseconds of the shutter (photo) or clip start.
    pub taken_at_millis: i64,
}

impl CaptureArtifact {
    pub fn photo(png: Vec<u8>, taken_at_millis: i64) -> Self {
        CaptureArtifact {
            kind: ArtifactKind::Photo,
            mime: "image/png".to_string(),
            data: png,
            taken_at_millis,
        }
    }

    /// Object key suggested to the uploader.
    pub fn suggested_name(&self) -> String {
        match self.kind {
            ArtifactKind::Photo => format!("photos/photo-{}.png", self.taken_at_millis),
            ArtifactKind::Video => format!(
                "videos/recording-{}.{}",
                self.taken_at_millis,
                extension_for(&self.mime)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(bytes: &[u8], mime: Option<&str>) -> Chunk {
        Chunk::new(bytes.to_vec(), mime.map(str::to_string))
    }

    #[test]
    fn empty_chunks_are_dropped() {
        let mut s = RecordingSession::new(None, Instant::now(), 0);
        assert!(!s.push_chunk(chunk(&[], None)));
        assert!(s.push_chunk(chunk(&[1, 2], None)));
        assert_eq!(s.chunks.len(), 1);
    }

    #[test]
    fn assemble_concatenates_in_order() {
        let mut s = RecordingSession::new(None, Instant::now(), 0);
        s.push_chunk(chunk(&[1, 2], None));
        s.push_chunk(chunk(&[3], None));
        let a = s.assemble(Some("video/mp4".into()), 42);
        assert_eq!(a.data, vec![1, 2, 3]);
        assert_eq!(a.mime, "video/mp4");
        assert_eq!(a.suggested_name(), "videos/recording-42.mp4");
    }

    #[test]
    fn mime_falls_back_to_chunk_then_default() {
        let mut s = RecordingSession::new(None, Instant::now(), 0);
        s.push_chunk(chunk(&[1], Some("video/x-motion-jpeg")));
        assert_eq!(s.assemble(None, 0).mime, "video/x-motion-jpeg");

        let mut s = RecordingSession::new(None, Instant::now(), 0);
        s.push_chunk(chunk(&[1], None));
        assert_eq!(s.assemble(None, 7).suggested_name(), "videos/recording-7.webm");
    }

    #[test]
    fn photo_name() {
        let a = CaptureArtifact::photo(vec![0], 1000);
        assert_eq!(a.suggested_name(), "photos/photo-1000.png");
    }
}
