//! # magnet_booth
//!
//! A camera booth with virtual magnets: pinch a sticker with your fingers to
//! pick it up, drag it around the live picture, let go to drop it.  Tap the
//! shutter for a photo, hold it for a clip of up to ten seconds.
//!
//! ## Surfaces
//!
//! Two canvases are drawn every tick from the same scene.  The *display*
//! surface is the selfie mirror the user interacts with; the *record* surface
//! is the shareable orientation that gets encoded.  They mirror the video
//! under opposite rules, so the record surface re-places every magnet at its
//! reflected X plus a per-item offset and flips the artwork back.
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: the mouse pointer is the index
//!   fingertip and the left button pinches.
//! * `leap`: **Hardware mode**: hand landmarks from a LeapMotion controller
//!   via LeapC.
//!
//! ### Keys
//!
//! | Key | Action |
//! |---|---|
//! | `Space` tap | Photo |
//! | `Space` hold | Record until released (10 s cap) |
//! | `C` | Switch front / rear camera |
//! | `H` | Toggle hand tracking |
//! | `Escape` | Close the preview, cancelling any upload |
//! | `Q` | Quit |

pub mod app;
pub mod camera;
pub mod compositor;
pub mod config;
pub mod error;
pub mod landmarks;
pub mod recorder;
pub mod sprite;
pub mod surface;
pub mod window;

pub use config::AppConfig;
pub use error::BoothError;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` selects what is shown; without it everything at `info` and
/// above is printed.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_names(true))
        .try_init()?;
    Ok(())
}
