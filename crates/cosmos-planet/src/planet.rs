//! A rocky planet: six chunk trees plus its transform and terrain function.

use cosmos_cubesphere::Direction;
use cosmos_forge::{
    CollisionTask, ForgeError, ForgeUpdate, HeightResult, Task, TaskId, TaskQueue, TaskResult,
};
use cosmos_terrain::{TerrainFunction, TerrainSettings};
use glam::{DAffine3, DQuat, DVec3};
use rustc_hash::FxHashSet;

use crate::{
    CameraView, ChunkBackend, ChunkCuller, ChunkTree, LodChanges, PlanetModel, PlanetUniforms,
    SurfaceMaterial, TreeStats,
};

/// Placement of a planet in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanetTransform {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Default for PlanetTransform {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
        }
    }
}

impl PlanetTransform {
    #[must_use]
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// World-space point to planet-local space.
    #[must_use]
    pub fn to_local(&self, world: DVec3) -> DVec3 {
        self.rotation.inverse() * (world - self.position)
    }

    /// Planet-local point to world space.
    #[must_use]
    pub fn to_world(&self, local: DVec3) -> DVec3 {
        self.rotation * local + self.position
    }

    #[must_use]
    pub fn affine(&self) -> DAffine3 {
        DAffine3::from_rotation_translation(self.rotation, self.position)
    }
}

/// What a planet did with one [`ForgeUpdate`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppliedUpdate {
    /// Builds turned into chunk geometry.
    pub applied: usize,
    /// Results nobody was waiting for.
    pub stale: usize,
    /// Deletions whose resources were released.
    pub released: usize,
    /// Chunks orphaned by a faulted build.
    pub orphaned: usize,
}

impl std::ops::AddAssign for AppliedUpdate {
    fn add_assign(&mut self, rhs: Self) {
        self.applied += rhs.applied;
        self.stale += rhs.stale;
        self.released += rhs.released;
        self.orphaned += rhs.orphaned;
    }
}

/// A planet with a solid, procedurally displaced surface.
pub struct TelluricPlanet {
    model: PlanetModel,
    transform: PlanetTransform,
    trees: Vec<ChunkTree>,
    terrain: TerrainFunction,
    elapsed: f64,
    pending_samples: FxHashSet<TaskId>,
    samples: Vec<HeightResult>,
}

impl TelluricPlanet {
    /// Create the six face trees and submit their root builds.
    pub fn new(
        model: PlanetModel,
        transform: PlanetTransform,
        queue: &mut dyn TaskQueue,
    ) -> Result<Self, ForgeError> {
        let trees = Direction::ALL
            .iter()
            .map(|&direction| ChunkTree::new(direction, &model, queue))
            .collect::<Result<Vec<_>, _>>()?;
        let terrain = TerrainFunction::new(model.seed, model.terrain);
        tracing::info!(
            planet = model.id.0,
            name = %model.name,
            seed = model.seed,
            radius = model.radius,
            "planet created"
        );
        Ok(Self {
            model,
            transform,
            trees,
            terrain,
            elapsed: 0.0,
            pending_samples: FxHashSet::default(),
            samples: Vec::new(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &PlanetModel {
        &self.model
    }

    #[must_use]
    pub fn transform(&self) -> &PlanetTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: PlanetTransform) {
        self.transform = transform;
    }

    #[must_use]
    pub fn tree(&self, direction: Direction) -> &ChunkTree {
        &self.trees[direction.index()]
    }

    #[must_use]
    pub fn trees(&self) -> &[ChunkTree] {
        &self.trees
    }

    /// Seconds accumulated by [`Self::update_material`].
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Run the LOD pass of all six trees for an observer in world space.
    pub fn update_lod(&mut self, observer: DVec3, queue: &mut dyn TaskQueue) -> Result<LodChanges, ForgeError> {
        let local = self.transform.to_local(observer);
        let mut changes = LodChanges::default();
        for tree in &mut self.trees {
            changes += tree.update(local, &self.model, queue)?;
        }
        Ok(changes)
    }

    /// Apply the part of a forge update that belongs to this planet.
    ///
    /// Results are applied before deletions are released, so a replaced
    /// chunk's mesh goes away in the same frame its replacement appears.
    pub fn apply_forge_update(&mut self, update: &ForgeUpdate, backend: &mut dyn ChunkBackend) -> AppliedUpdate {
        let mut applied = AppliedUpdate::default();

        for result in update.results.iter().filter(|r| r.planet_id() == self.model.id) {
            let used = match result {
                TaskResult::Build(build) => {
                    self.trees[build.direction.index()].apply_build_result(build, backend)
                }
                TaskResult::Height(height) => {
                    let expected = self.pending_samples.remove(&height.task_id);
                    if expected {
                        self.samples.push(*height);
                    }
                    expected
                }
            };
            if used {
                applied.applied += 1;
            } else {
                applied.stale += 1;
            }
        }

        for delete in update.released.iter().filter(|d| d.planet_id == self.model.id) {
            if let Some(mesh) = delete.mesh {
                backend.release_mesh(mesh);
            }
            if let Some(shape) = delete.shape {
                backend.release_shape(shape);
            }
            applied.released += 1;
        }

        for &task in &update.faulted {
            if self.pending_samples.remove(&task) {
                continue;
            }
            if self.trees.iter_mut().any(|tree| tree.mark_faulted(task)) {
                applied.orphaned += 1;
            }
        }

        applied
    }

    /// Push this frame's shading inputs. `sun` is the sun position in world
    /// space and `dt` the frame time in seconds.
    pub fn update_material(&mut self, material: &mut dyn SurfaceMaterial, sun: DVec3, dt: f64) {
        self.elapsed += dt;
        let sun_direction = (self.transform.rotation.inverse() * (sun - self.transform.position))
            .normalize_or_zero();
        material.update_uniforms(&PlanetUniforms {
            planet_position: self.transform.position,
            planet_rotation: self.transform.rotation,
            planet_radius: self.model.radius,
            max_elevation: self.model.terrain.max_elevation(),
            sun_direction,
            time: self.elapsed,
            seed: self.model.seed,
        });
    }

    /// Recompute chunk visibility for a camera. Returns the number of
    /// visible chunks.
    pub fn compute_culling(&mut self, camera: &CameraView, backend: &mut dyn ChunkBackend) -> usize {
        let culler = ChunkCuller::new(camera, self.transform.position, self.model.radius);
        let to_world = self.transform.affine();
        self.trees
            .iter_mut()
            .map(|tree| tree.compute_culling(&culler, &to_world, backend))
            .sum()
    }

    /// Throw away all geometry and rebuild from six root chunks.
    pub fn reset(&mut self, queue: &mut dyn TaskQueue) -> Result<LodChanges, ForgeError> {
        let mut changes = LodChanges::default();
        for tree in &mut self.trees {
            changes += tree.reset(&self.model, queue)?;
        }
        tracing::info!(planet = self.model.id.0, deleted = changes.deleted, "planet reset");
        Ok(changes)
    }

    /// Switch to another seed or terrain settings and regenerate.
    pub fn set_terrain(
        &mut self,
        seed: u64,
        settings: TerrainSettings,
        queue: &mut dyn TaskQueue,
    ) -> Result<LodChanges, ForgeError> {
        self.model.seed = seed;
        self.model.terrain = settings;
        self.terrain = TerrainFunction::new(seed, settings);
        self.pending_samples.clear();
        self.reset(queue)
    }

    /// Resubmit the builds of chunks orphaned by worker faults.
    pub fn recover_orphans(&mut self, queue: &mut dyn TaskQueue) -> Result<usize, ForgeError> {
        let mut recovered = 0;
        for tree in &mut self.trees {
            recovered += tree.recover_orphans(&self.model, queue)?;
        }
        Ok(recovered)
    }

    /// Retire every chunk. Returns the number of deletions submitted.
    pub fn dispose(self, queue: &mut dyn TaskQueue) -> Result<usize, ForgeError> {
        let mut deleted = 0;
        for tree in self.trees {
            deleted += tree.dispose(queue)?;
        }
        Ok(deleted)
    }

    /// Ask the forge for the surface radius under a world-space position.
    /// The answer arrives through [`Self::take_height_samples`].
    pub fn request_height_sample(&mut self, world: DVec3, queue: &mut dyn TaskQueue) -> Result<TaskId, ForgeError> {
        let id = queue.submit(Task::Collision(CollisionTask {
            planet_id: self.model.id,
            seed: self.model.seed,
            settings: self.model.terrain,
            planet_radius: self.model.radius,
            position: self.transform.to_local(world),
        }))?;
        self.pending_samples.insert(id);
        Ok(id)
    }

    /// Height samples received since the last call.
    pub fn take_height_samples(&mut self) -> Vec<HeightResult> {
        std::mem::take(&mut self.samples)
    }

    /// Distance from the planet center to the surface under a world-space
    /// position, computed on the calling thread.
    #[must_use]
    pub fn sample_height(&self, world: DVec3) -> f64 {
        self.terrain
            .surface_radius(self.transform.to_local(world), self.model.radius)
    }

    /// Height of a world-space position above the displaced surface.
    #[must_use]
    pub fn altitude(&self, world: DVec3) -> f64 {
        self.transform.to_local(world).length() - self.sample_height(world)
    }

    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for tree in &self.trees {
            stats += tree.stats();
        }
        stats
    }
}
