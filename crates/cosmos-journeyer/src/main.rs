//! Cosmos Journeyer headless flight driver.
//!
//! Generates one planet, flies an observer from orbit down to the surface
//! and streams chunk meshes through the forge into a headless backend, then
//! reports tree, forge and backend statistics.
//!
//! Run with: `cargo run -p cosmos-journeyer -- --frames 900`

mod flight;

use std::process::ExitCode;

use clap::Parser;
use cosmos_config::{CliArgs, Config, default_config_dir};
use cosmos_forge::{ChunkForge, ForgeError, PlanetId};
use cosmos_planet::{
    FrameInput, HeadlessBackend, HeadlessMaterial, PlanetModel, PlanetTransform, StarSystem,
};
use glam::DVec3;
use tracing::{debug, error, info, warn};

use crate::flight::Descent;

const PLANET_ID: PlanetId = PlanetId(1);

/// Sun placed one astronomical unit away along +X.
const SUN_POSITION: DVec3 = DVec3::new(1.496e11, 0.0, 0.0);

/// Frames between progress reports and height probes.
const REPORT_INTERVAL: u32 = 60;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    let (mut config, load_error) = match Config::load_or_create(&config_dir) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    config.apply_cli_overrides(&args);
    let invalid = config.validate().err();

    let log_dir = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    cosmos_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Some(e) = load_error {
        warn!("using default config: {e}");
    }
    if let Some(e) = invalid {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    info!("Cosmos Journeyer");
    info!(
        "Planet: {} seed={} radius={:.0}km",
        config.planet.name,
        config.planet.seed,
        config.planet.radius_m / 1000.0
    );

    match fly(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("flight aborted: {e}");
            ExitCode::FAILURE
        }
    }
}

fn frame_input(observer: DVec3, dt: f64) -> FrameInput {
    FrameInput {
        sun_position: SUN_POSITION,
        ..FrameInput::at(observer, dt)
    }
}

fn fly(config: &Config) -> Result<(), ForgeError> {
    let forge = if config.forge.workers == 0 {
        ChunkForge::with_defaults()?
    } else {
        ChunkForge::new(config.forge.workers)?
    };
    let mut system = StarSystem::new(forge, HeadlessBackend::new());

    let model = PlanetModel::new(
        PLANET_ID,
        config.planet.name.clone(),
        config.planet.seed,
        config.planet.radius_m,
    )
    .with_terrain(config.planet.effective_terrain())
    .with_lod(config.lod);
    let transform = PlanetTransform::default();
    system.add_planet(model, transform, Box::new(HeadlessMaterial::default()))?;

    let descent = Descent::from_config(&config.flight);
    let dt = config.flight.frame_dt;
    let probe = transform.position + descent.direction;

    for frame in 0..config.flight.frames {
        let t = f64::from(frame) * dt;
        let Some(planet) = system.planet(PLANET_ID) else {
            break;
        };
        let surface = planet.sample_height(probe);
        let observer = transform.position + descent.position_at(t, surface);

        let report = system.update(&frame_input(observer, dt));
        if report.errors > 0 {
            warn!(frame, errors = report.errors, "frame finished with errors");
        }

        for sample in system.take_height_samples() {
            debug!(task = %sample.task_id, surface = sample.height, "height probe");
        }

        if frame % REPORT_INTERVAL == 0 {
            system.request_height_sample(PLANET_ID, probe)?;
            let stats = system.tree_stats();
            info!(
                frame,
                altitude = descent.altitude_at(t),
                leaves = stats.leaves,
                pending = stats.pending,
                deepest = stats.deepest,
                visible = report.visible_chunks,
                meshes = system.backend().live_meshes(),
                "flight progress"
            );
        }
    }

    let surface = system
        .planet(PLANET_ID)
        .map_or(config.planet.radius_m, |p| p.sample_height(probe));
    let end = f64::from(config.flight.frames) * dt;
    let last = frame_input(transform.position + descent.position_at(end, surface), dt);
    let settle_frames = system.settle(&last, 10_000);
    if system.forge().has_pending_work() {
        warn!(settle_frames, "forge still busy after settling");
    }

    let stats = system.tree_stats();
    let forge = system.forge_stats();
    let backend = system.backend();
    info!(
        leaves = stats.leaves,
        built = stats.built,
        orphaned = stats.orphaned,
        deepest = stats.deepest,
        "trees"
    );
    info!(
        builds = forge.builds_submitted,
        deletes = forge.deletes_submitted,
        cancelled = forge.cancelled,
        faulted = forge.faulted,
        "forge"
    );
    info!(
        meshes = backend.live_meshes(),
        shapes = backend.live_shapes(),
        vertices = backend.live_vertices(),
        bytes = backend.live_bytes(),
        chunks_created = backend.chunks_created(),
        "backend"
    );

    system.dispose();
    let backend = system.backend();
    if backend.live_meshes() > 0 || backend.live_shapes() > 0 {
        warn!(
            meshes = backend.live_meshes(),
            shapes = backend.live_shapes(),
            "resources leaked after dispose"
        );
    }
    Ok(())
}
