//! Application configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields a working
//! booth.
//!
//! ```toml
//! resolution = "high"
//! facing     = "rear"
//! output_dir = "captures"
//!
//! [tracking]
//! detect_every_idle = 3
//!
//! [[magnets]]
//! name            = "pony"
//! anchor          = "top-left"
//! size_multiplier = 1.2
//! image           = "art/pony.png"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use magnet_board::{default_specs, BoardTuning, MagnetSpec};
use magnet_capture::CaptureConfig;
use magnet_space::{FacingMode, Point, Size};

use crate::error::BoothError;

// ════════════════════════════════════════════════════════════════════════════
// Resolution
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[default]
    Low,
    High,
}

impl Resolution {
    /// Canvas size in pixels.
    pub fn canvas(self) -> (usize, usize) {
        match self {
            Resolution::Low  => (720, 960),
            Resolution::High => (1080, 1440),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Sections
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Intrinsic size of the synthetic video feed.
    pub video_width:    usize,
    pub video_height:   usize,
    pub rear_available: bool,
    /// Frames before the feed produces a picture.
    pub warmup_frames:  u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            video_width:    640,
            video_height:   480,
            rear_available: true,
            warmup_frames:  3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled:                 bool,
    pub detect_every_idle:       u32,
    pub detect_every_recording:  u32,
    /// Board update and hand overlay cadence, in render ticks.
    pub overlay_every_idle:      u32,
    pub overlay_every_recording: u32,
    /// Results arriving sooner than this after the previous one are dropped.
    pub throttle_ms:             u64,
    /// Width of the downscaled frame handed to the detector.
    pub detect_width:            usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            enabled:                 true,
            detect_every_idle:       4,
            detect_every_recording:  5,
            overlay_every_idle:      2,
            overlay_every_recording: 3,
            throttle_ms:             50,
            detect_width:            180,
        }
    }
}

impl TrackingConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoConfig {
    pub path:  Option<PathBuf>,
    /// Top-left corner on the display surface.
    pub x:     f32,
    pub y:     f32,
    pub scale: f32,
}

impl Default for LogoConfig {
    fn default() -> Self {
        LogoConfig { path: None, x: 80.0, y: 80.0, scale: 0.2 }
    }
}

impl LogoConfig {
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// One configured magnet: its layout plus optional artwork.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MagnetEntry {
    #[serde(flatten)]
    pub spec:  MagnetSpec,
    /// Without an image the magnet is drawn as a generated badge.
    #[serde(default)]
    pub image: Option<PathBuf>,
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub resolution:               Resolution,
    pub facing:                   FacingMode,
    pub camera:                   CameraConfig,
    pub tracking:                 TrackingConfig,
    pub board:                    BoardTuning,
    pub capture:                  CaptureConfig,
    pub logo:                     LogoConfig,
    /// `None` uses the stock six-item layout.
    pub magnets:                  Option<Vec<MagnetEntry>>,
    /// Where the directory uploader stores artifacts.
    pub output_dir:               PathBuf,
    pub processing_estimate_secs: u64,
    /// `false` runs photo-only.
    pub recording_enabled:        bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            resolution:               Resolution::default(),
            facing:                   FacingMode::Front,
            camera:                   CameraConfig::default(),
            tracking:                 TrackingConfig::default(),
            board:                    BoardTuning::default(),
            capture:                  CaptureConfig::default(),
            logo:                     LogoConfig::default(),
            magnets:                  None,
            output_dir:               PathBuf::from("captures"),
            processing_estimate_secs: 15,
            recording_enabled:        true,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, BoothError> {
        let text = fs::read_to_string(path).map_err(|source| BoothError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, BoothError> {
        Ok(toml::from_str(text)?)
    }

    pub fn canvas(&self) -> Size {
        let (w, h) = self.resolution.canvas();
        Size::new(w as f32, h as f32)
    }

    pub fn video_size(&self) -> Size {
        Size::new(self.camera.video_width as f32, self.camera.video_height as f32)
    }

    pub fn processing_estimate(&self) -> Duration {
        Duration::from_secs(self.processing_estimate_secs)
    }

    /// Configured magnets, or the stock layout for this canvas.
    pub fn magnet_entries(&self) -> Vec<MagnetEntry> {
        match &self.magnets {
            Some(list) => list.clone(),
            None => default_specs(self.canvas().w)
                .into_iter()
                .map(|spec| MagnetEntry { spec, image: None })
                .collect(),
        }
    }
}
