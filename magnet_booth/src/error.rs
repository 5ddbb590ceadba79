//! Error types for the booth application.

use std::io;
use std::path::PathBuf;

use magnet_capture::CaptureError;
use magnet_space::FacingMode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoothError {
    /// The config file could not be read.
    #[error("cannot read config {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    /// The config file is not valid TOML for [`AppConfig`](crate::config::AppConfig).
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("window error: {0}")]
    Window(String),

    /// An artwork or logo image failed to load.
    #[error("cannot load image {path}: {source}")]
    Image { path: PathBuf, source: image::ImageError },

    /// The requested camera does not exist on this device.
    #[error("{} camera unavailable", .0.name())]
    CameraUnavailable(FacingMode),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}
