//! Command-line argument parsing for the headless driver.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Cosmos Journeyer command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "cosmos-journeyer", about = "Procedural planet terrain flight")]
pub struct CliArgs {
    /// Planet seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Planet radius in meters.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Derive terrain settings from the seed.
    #[arg(long)]
    pub procedural: Option<bool>,

    /// Maximum chunk tree depth.
    #[arg(long)]
    pub max_depth: Option<u8>,

    /// Number of worker threads (0 = automatic).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Starting altitude in meters.
    #[arg(long)]
    pub altitude: Option<f64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.planet.seed = seed;
        }
        if let Some(radius) = args.radius {
            self.planet.radius_m = radius;
        }
        if let Some(procedural) = args.procedural {
            self.planet.procedural_terrain = procedural;
        }
        if let Some(depth) = args.max_depth {
            self.lod.max_depth = depth;
        }
        if let Some(workers) = args.workers {
            self.forge.workers = workers;
        }
        if let Some(frames) = args.frames {
            self.flight.frames = frames;
        }
        if let Some(altitude) = args.altitude {
            self.flight.start_altitude_m = altitude;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        self.lod = self.lod.validated();
    }
}
