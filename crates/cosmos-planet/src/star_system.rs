//! The per-frame driver: owns the forge, the planets and the backend.

use cosmos_forge::{ChunkForge, ForgeError, ForgeStats, HeightResult, PlanetId, TaskId};
use glam::DVec3;

use crate::{
    AppliedUpdate, CameraView, ChunkBackend, LodChanges, PlanetModel, PlanetTransform,
    SurfaceMaterial, TelluricPlanet, TreeStats,
};

/// What the driver needs to know about the current frame.
#[derive(Clone, Debug)]
pub struct FrameInput {
    /// Observer position in world space, used for LOD.
    pub observer: DVec3,
    /// Camera used for culling. Usually sits at the observer.
    pub camera: CameraView,
    /// Sun position in world space.
    pub sun_position: DVec3,
    /// Frame time in seconds.
    pub dt: f64,
}

impl FrameInput {
    /// Observer and camera at the same spot, sun at the origin.
    #[must_use]
    pub fn at(observer: DVec3, dt: f64) -> Self {
        Self {
            observer,
            camera: CameraView::omnidirectional(observer),
            sun_position: DVec3::ZERO,
            dt,
        }
    }
}

/// Summary of one [`StarSystem::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub lod: LodChanges,
    pub applied: AppliedUpdate,
    /// Visible chunks across all planets after culling.
    pub visible_chunks: usize,
    /// Errors logged during the frame.
    pub errors: usize,
}

struct PlanetEntry {
    planet: TelluricPlanet,
    material: Box<dyn SurfaceMaterial>,
}

/// Owns a [`ChunkForge`], a set of planets with their materials and the
/// backend that holds chunk resources.
pub struct StarSystem<B: ChunkBackend> {
    forge: ChunkForge,
    planets: Vec<PlanetEntry>,
    backend: B,
    frame: u64,
}

impl<B: ChunkBackend> StarSystem<B> {
    #[must_use]
    pub fn new(forge: ChunkForge, backend: B) -> Self {
        Self {
            forge,
            planets: Vec::new(),
            backend,
            frame: 0,
        }
    }

    /// Create a planet and submit its six root builds.
    pub fn add_planet(
        &mut self,
        model: PlanetModel,
        transform: PlanetTransform,
        material: Box<dyn SurfaceMaterial>,
    ) -> Result<PlanetId, ForgeError> {
        let id = model.id;
        if self.planet(id).is_some() {
            tracing::warn!(planet = id.0, "planet id already in use");
        }
        let planet = TelluricPlanet::new(model, transform, &mut self.forge)?;
        self.planets.push(PlanetEntry { planet, material });
        Ok(id)
    }

    /// Dispose a planet. Its chunk resources are released by later updates.
    pub fn remove_planet(&mut self, id: PlanetId) -> Result<bool, ForgeError> {
        let Some(index) = self.planets.iter().position(|e| e.planet.model().id == id) else {
            return Ok(false);
        };
        let entry = self.planets.remove(index);
        entry.planet.dispose(&mut self.forge)?;
        Ok(true)
    }

    #[must_use]
    pub fn planet(&self, id: PlanetId) -> Option<&TelluricPlanet> {
        self.planets
            .iter()
            .map(|e| &e.planet)
            .find(|p| p.model().id == id)
    }

    pub fn planet_mut(&mut self, id: PlanetId) -> Option<&mut TelluricPlanet> {
        self.planets
            .iter_mut()
            .map(|e| &mut e.planet)
            .find(|p| p.model().id == id)
    }

    pub fn planets(&self) -> impl Iterator<Item = &TelluricPlanet> {
        self.planets.iter().map(|e| &e.planet)
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn forge(&self) -> &ChunkForge {
        &self.forge
    }

    #[must_use]
    pub fn forge_stats(&self) -> ForgeStats {
        self.forge.stats()
    }

    /// Frames run so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Tree stats summed over every planet.
    #[must_use]
    pub fn tree_stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for planet in self.planets() {
            stats += planet.stats();
        }
        stats
    }

    /// Ask the forge for the surface radius of a planet under a world-space
    /// position. Returns `None` for an unknown planet.
    pub fn request_height_sample(&mut self, id: PlanetId, world: DVec3) -> Result<Option<TaskId>, ForgeError> {
        let Some(entry) = self.planets.iter_mut().find(|e| e.planet.model().id == id) else {
            return Ok(None);
        };
        entry
            .planet
            .request_height_sample(world, &mut self.forge)
            .map(Some)
    }

    /// Height samples received by all planets since the last call.
    pub fn take_height_samples(&mut self) -> Vec<HeightResult> {
        self.planets
            .iter_mut()
            .flat_map(|e| e.planet.take_height_samples())
            .collect()
    }

    /// Resubmit the builds of orphaned chunks on every planet.
    pub fn recover_orphans(&mut self) -> usize {
        let mut recovered = 0;
        for entry in &mut self.planets {
            match entry.planet.recover_orphans(&mut self.forge) {
                Ok(n) => recovered += n,
                Err(e) => tracing::error!(planet = entry.planet.model().id.0, "orphan recovery failed: {e}"),
            }
        }
        recovered
    }

    /// Run one frame: LOD, forge drain, materials, culling.
    pub fn update(&mut self, input: &FrameInput) -> FrameReport {
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };

        for entry in &mut self.planets {
            match entry.planet.update_lod(input.observer, &mut self.forge) {
                Ok(changes) => report.lod += changes,
                Err(e) => {
                    tracing::error!(planet = entry.planet.model().id.0, "LOD update failed: {e}");
                    report.errors += 1;
                }
            }
        }

        let update = self.forge.update();
        for entry in &mut self.planets {
            report.applied += entry.planet.apply_forge_update(&update, &mut self.backend);
        }
        self.release_unclaimed(&update.released);

        for entry in &mut self.planets {
            entry
                .planet
                .update_material(entry.material.as_mut(), input.sun_position, input.dt);
        }

        for entry in &mut self.planets {
            report.visible_chunks += entry.planet.compute_culling(&input.camera, &mut self.backend);
        }

        if !report.lod.is_empty() {
            tracing::debug!(frame = self.frame, lod = ?report.lod, applied = ?report.applied, "frame");
        }
        report
    }

    /// Run frames with the same input until the forge has nothing left to do
    /// or `max_frames` have passed. Returns the number of frames run.
    pub fn settle(&mut self, input: &FrameInput, max_frames: usize) -> usize {
        for frame in 0..max_frames {
            self.update(input);
            if !self.forge.has_pending_work() {
                return frame + 1;
            }
            std::thread::yield_now();
        }
        max_frames
    }

    /// Dispose every planet and stop the workers, releasing the resources of
    /// every deletion the forge still held.
    pub fn dispose(&mut self) {
        for entry in self.planets.drain(..) {
            let id = entry.planet.model().id;
            if let Err(e) = entry.planet.dispose(&mut self.forge) {
                tracing::error!(planet = id.0, "planet dispose failed: {e}");
            }
        }
        let held = self.forge.dispose();
        self.release_unclaimed(&held);
    }

    /// Release deletions of planets that are no longer in the system.
    fn release_unclaimed(&mut self, released: &[cosmos_forge::DeleteTask]) {
        for delete in released {
            if self.planets.iter().any(|e| e.planet.model().id == delete.planet_id) {
                continue;
            }
            if let Some(mesh) = delete.mesh {
                self.backend.release_mesh(mesh);
            }
            if let Some(shape) = delete.shape {
                self.backend.release_shape(shape);
            }
        }
    }
}
