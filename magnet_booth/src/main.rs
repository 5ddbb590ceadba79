//! magnet_booth: interactive entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use magnet_booth::app::run;
use magnet_booth::config::Resolution;
use magnet_booth::{init_logging, AppConfig};
use magnet_space::FacingMode;

/// Camera booth with hand-dragged magnets.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file.  Every setting has a default.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    resolution: Option<ResolutionArg>,

    #[arg(long, value_enum)]
    facing: Option<FacingArg>,

    /// Where photos and clips are stored.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Start without hand tracking.
    #[arg(long)]
    no_tracking: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ResolutionArg {
    Low,
    High,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FacingArg {
    Front,
    Rear,
}

impl Cli {
    /// File values first, then flags on top.
    fn into_config(self) -> anyhow::Result<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => AppConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AppConfig::default(),
        };
        if let Some(r) = self.resolution {
            cfg.resolution = match r {
                ResolutionArg::Low  => Resolution::Low,
                ResolutionArg::High => Resolution::High,
            };
        }
        if let Some(f) = self.facing {
            cfg.facing = match f {
                FacingArg::Front => FacingMode::Front,
                FacingArg::Rear  => FacingMode::Rear,
            };
        }
        if let Some(dir) = self.output_dir {
            cfg.output_dir = dir;
        }
        if self.no_tracking {
            cfg.tracking.enabled = false;
        }
        Ok(cfg)
    }
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cfg = Cli::parse().into_config()?;

    #[cfg(feature = "leap")]
    info!("hand landmarks: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    info!("hand landmarks: pointer simulation (build with --features leap for hardware)");

    info!(
        resolution = ?cfg.resolution,
        facing = cfg.facing.name(),
        output = %cfg.output_dir.display(),
        "starting booth"
    );
    run(cfg).context("booth stopped with an error")
}
